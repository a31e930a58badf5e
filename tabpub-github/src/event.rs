//! Pull request number from the workflow event payload.

use std::path::Path;

use serde::Deserialize;
use tabpub_publish::PullRequestId;

use crate::error::{io_err, EventError};

#[derive(Debug, Deserialize)]
struct EventPayload {
    number: Option<u64>,
    pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: Option<u64>,
}

impl EventPayload {
    fn pull_request_number(&self) -> Option<u64> {
        self.number
            .or_else(|| self.pull_request.as_ref().and_then(|pr| pr.number))
    }
}

/// Read the event file at `path` and return the pull request it refers to.
///
/// The top-level `number` wins; `pull_request.number` is the fallback for
/// event types that do not carry one.
pub fn read_pull_request_id(path: &Path) -> Result<PullRequestId, EventError> {
    let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let payload: EventPayload = serde_json::from_str(&raw).map_err(|source| EventError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let number = payload
        .pull_request_number()
        .ok_or_else(|| EventError::NotAPullRequest {
            path: path.to_path_buf(),
        })?;
    tracing::debug!(path = %path.display(), number, "read pull request event");
    Ok(PullRequestId(number))
}
