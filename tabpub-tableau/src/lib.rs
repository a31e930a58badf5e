//! # tabpub-tableau
//!
//! [`PublishGateway`](tabpub_publish::PublishGateway) for Tableau Server and
//! Tableau Cloud, speaking the REST API with JSON payloads.
//!
//! Destination paths resolve against the site's project hierarchy
//! ([`projects`]); uploads go out as `multipart/mixed` ([`multipart`]), in
//! chunks above [`CHUNKED_UPLOAD_THRESHOLD`].

pub mod api;
pub mod client;
pub mod config;
pub mod multipart;
pub mod projects;

pub use client::{
    workbook_payload, TableauGateway, CHUNKED_UPLOAD_THRESHOLD, UPLOAD_CHUNK_SIZE,
};
pub use config::TableauConfig;
pub use projects::{ProjectEntry, ProjectTree, Resolution};
