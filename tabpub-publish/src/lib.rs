//! # tabpub-publish
//!
//! Change-set reconciliation and the publish loop.
//!
//! Call [`pipeline::run`] with a [`PullRequestHost`], a [`PublishGateway`] and
//! a [`ReportSink`] to process one pull request. The collaborators are traits
//! so the whole flow runs against in-memory doubles in tests.

pub mod changeset;
pub mod error;
pub mod gateway;
pub mod host;
pub mod orchestrator;
pub mod pipeline;
pub mod report;

pub use changeset::{resolve_candidates, Candidate, ChangeSet};
pub use error::{
    DestinationResolutionError, HostError, PipelineError, PublishFailure, PublishGatewayError,
    ReportDeliveryError,
};
pub use gateway::{DestinationId, PublishGateway, PublishRequest, PublishedWorkbook};
pub use host::{PullRequestComment, PullRequestHost, PullRequestId};
pub use orchestrator::Orchestrator;
pub use pipeline::{RunConfig, RunOutcome};
pub use report::{ItemOutcome, OutcomeReport, ReportSink};
