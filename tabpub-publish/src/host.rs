//! Boundary to the source-control host that owns the pull request.

use std::fmt;

use crate::changeset::ChangeSet;
use crate::error::{HostError, ReportDeliveryError};
use crate::report::ReportSink;

/// Pull request number within the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PullRequestId(pub u64);

impl fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability interface over the hosting platform's pull request API.
pub trait PullRequestHost {
    /// Files added or modified by `pr`, in the host's order.
    fn list_changed_files(&self, pr: PullRequestId) -> Result<ChangeSet, HostError>;

    fn post_comment(&self, pr: PullRequestId, text: &str) -> Result<(), HostError>;
}

/// [`ReportSink`] that posts the report as one comment on a pull request.
pub struct PullRequestComment<'a, H: ?Sized> {
    host: &'a H,
    pr: PullRequestId,
}

impl<'a, H: PullRequestHost + ?Sized> PullRequestComment<'a, H> {
    pub fn new(host: &'a H, pr: PullRequestId) -> Self {
        Self { host, pr }
    }
}

impl<H: PullRequestHost + ?Sized> ReportSink for PullRequestComment<'_, H> {
    fn publish(&mut self, report_text: &str) -> Result<(), ReportDeliveryError> {
        if report_text.trim().is_empty() {
            return Err(ReportDeliveryError::Rejected("empty comment body".to_owned()));
        }
        self.host.post_comment(self.pr, report_text)?;
        tracing::info!(pull_request = %self.pr, "report posted as pull request comment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        comments: RefCell<Vec<(PullRequestId, String)>>,
    }

    impl PullRequestHost for Recorder {
        fn list_changed_files(&self, _pr: PullRequestId) -> Result<ChangeSet, HostError> {
            Ok(ChangeSet::default())
        }

        fn post_comment(&self, pr: PullRequestId, text: &str) -> Result<(), HostError> {
            self.comments.borrow_mut().push((pr, text.to_owned()));
            Ok(())
        }
    }

    #[test]
    fn comment_goes_to_the_configured_pull_request() {
        let host = Recorder::default();
        let mut sink = PullRequestComment::new(&host, PullRequestId(42));
        sink.publish("Workbook : A published to Sales :heavy_check_mark:")
            .expect("publish");
        let comments = host.comments.borrow();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, PullRequestId(42));
    }

    #[test]
    fn blank_report_is_rejected_without_calling_host() {
        let host = Recorder::default();
        let mut sink = PullRequestComment::new(&host, PullRequestId(1));
        let err = sink.publish("  \n").unwrap_err();
        assert!(matches!(err, ReportDeliveryError::Rejected(_)));
        assert!(host.comments.borrow().is_empty());
    }

    #[test]
    fn pull_request_display() {
        assert_eq!(PullRequestId(7).to_string(), "#7");
    }
}
