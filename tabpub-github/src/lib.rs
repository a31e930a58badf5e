//! # tabpub-github
//!
//! [`PullRequestHost`](tabpub_publish::PullRequestHost) backed by the GitHub
//! REST API, plus the event-payload reader that identifies the pull request a
//! workflow run belongs to.

pub mod client;
pub mod error;
pub mod event;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use error::EventError;
pub use event::read_pull_request_id;
