//! Sequential, fault-isolated publish loop.
//!
//! Each candidate ends in exactly one state:
//!
//! | state     | when                                             | success |
//! |-----------|--------------------------------------------------|---------|
//! | Skipped   | file name not in the registry                    | kept    |
//! | Published | destination resolved and the upload succeeded    | kept    |
//! | Failed    | destination unresolved or any gateway error      | false   |
//!
//! A failed candidate never stops the loop.

use std::path::PathBuf;

use tabpub_core::{Registry, WorkbookSpec};

use crate::changeset::Candidate;
use crate::error::{DestinationResolutionError, PublishFailure, PublishGatewayError};
use crate::gateway::{DestinationId, PublishGateway, PublishRequest, PublishedWorkbook};
use crate::report::{ItemOutcome, OutcomeReport};

/// Drives one [`PublishGateway`] over a list of candidates.
pub struct Orchestrator<'g, G: ?Sized> {
    gateway: &'g mut G,
    checkout_root: PathBuf,
}

impl<'g, G: PublishGateway + ?Sized> Orchestrator<'g, G> {
    /// Candidate source paths are resolved against `checkout_root`.
    pub fn new(gateway: &'g mut G, checkout_root: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            checkout_root: checkout_root.into(),
        }
    }

    /// Process every candidate in order and collect the outcomes.
    pub fn run(&mut self, registry: &Registry, candidates: &[Candidate]) -> OutcomeReport {
        let mut report = OutcomeReport::new();
        for candidate in candidates {
            report.push(self.process(registry, candidate));
        }
        tracing::info!(
            published = report.published(),
            failed = report.failed(),
            skipped = report.skipped(),
            "publish loop finished"
        );
        report
    }

    fn process(&mut self, registry: &Registry, candidate: &Candidate) -> ItemOutcome {
        let Some(spec) = registry.get(&candidate.file_name) else {
            tracing::info!(
                workbook = %candidate.file_name,
                "skip publishing workbook not listed in config files"
            );
            return ItemOutcome::Skipped {
                file_name: candidate.file_name.clone(),
            };
        };

        tracing::info!(
            workbook = %spec.display_name,
            destination = %spec.destination_path,
            "publishing workbook"
        );
        match self.publish_one(spec, candidate) {
            Ok(published) => {
                tracing::info!(
                    workbook = %spec.display_name,
                    destination = %spec.destination_path,
                    id = %published.id,
                    "workbook published"
                );
                ItemOutcome::Published {
                    display_name: spec.display_name.clone(),
                    destination_path: spec.destination_path.clone(),
                    url: published.url,
                }
            }
            Err(cause) => {
                tracing::error!(
                    workbook = %spec.display_name,
                    destination = %spec.destination_path,
                    error = %cause,
                    "error publishing workbook"
                );
                ItemOutcome::Failed {
                    display_name: spec.display_name.clone(),
                    destination_path: spec.destination_path.clone(),
                    cause,
                }
            }
        }
    }

    fn publish_one(
        &mut self,
        spec: &WorkbookSpec,
        candidate: &Candidate,
    ) -> Result<PublishedWorkbook, PublishFailure> {
        let destination = self.resolve(&spec.destination_path)?;
        let local_path = self.checkout_root.join(&candidate.source_path);
        let request = PublishRequest {
            spec,
            destination: &destination,
            local_path: &local_path,
        };
        Ok(self.gateway.publish(&request)?)
    }

    fn resolve(&mut self, query: &str) -> Result<DestinationId, PublishFailure> {
        match self.gateway.resolve_destination(query) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(DestinationResolutionError::NotFound {
                query: query.to_owned(),
            }
            .into()),
            Err(PublishGatewayError::AmbiguousDestination { query, matches }) => {
                Err(DestinationResolutionError::Ambiguous { query, matches }.into())
            }
            Err(other) => Err(other.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    use tabpub_core::{WorkbookFile, WorkbookOptions};

    /// Gateway double: destinations by query, uploads fail for listed names.
    #[derive(Default)]
    struct FakeGateway {
        destinations: HashMap<String, Vec<String>>,
        reject: Vec<String>,
        uploads: Vec<(String, String, PathBuf)>,
    }

    impl FakeGateway {
        fn with_destination(mut self, query: &str, ids: &[&str]) -> Self {
            self.destinations
                .insert(query.to_owned(), ids.iter().map(|s| s.to_string()).collect());
            self
        }
    }

    impl PublishGateway for FakeGateway {
        fn resolve_destination(
            &mut self,
            path_query: &str,
        ) -> Result<Option<DestinationId>, PublishGatewayError> {
            match self.destinations.get(path_query).map(Vec::as_slice) {
                None | Some([]) => Ok(None),
                Some([one]) => Ok(Some(DestinationId(one.clone()))),
                Some(many) => Err(PublishGatewayError::AmbiguousDestination {
                    query: path_query.to_owned(),
                    matches: many.to_vec(),
                }),
            }
        }

        fn publish(
            &mut self,
            request: &PublishRequest<'_>,
        ) -> Result<PublishedWorkbook, PublishGatewayError> {
            let name = request.spec.display_name.clone();
            if self.reject.contains(&name) {
                return Err(PublishGatewayError::Rejected {
                    operation: "publish workbook",
                    status: 500,
                    message: "internal error".into(),
                });
            }
            self.uploads.push((
                name.clone(),
                request.destination.0.clone(),
                request.local_path.to_path_buf(),
            ));
            Ok(PublishedWorkbook {
                id: format!("wb-{name}"),
                name,
                url: None,
            })
        }
    }

    fn spec(file: &str, name: &str, dest: &str) -> WorkbookSpec {
        WorkbookSpec {
            file_name: WorkbookFile::from(file),
            display_name: name.into(),
            destination_path: dest.into(),
            options: WorkbookOptions::default(),
        }
    }

    fn candidate(path: &str) -> Candidate {
        Candidate {
            file_name: WorkbookFile::from_path(path).unwrap(),
            source_path: path.into(),
        }
    }

    #[test]
    fn unknown_candidate_is_skipped_and_run_succeeds() {
        let registry = Registry::new();
        let mut gateway = FakeGateway::default();
        let report =
            Orchestrator::new(&mut gateway, "/repo").run(&registry, &[candidate("wb/X.twb")]);
        assert!(report.success());
        assert_eq!(report.skipped(), 1);
        assert!(gateway.uploads.is_empty());
    }

    #[test]
    fn zero_destinations_fails_item_but_later_items_still_run() {
        let registry: Registry = [spec("A.twb", "A", "Missing"), spec("B.twb", "B", "Ops")]
            .into_iter()
            .collect();
        let mut gateway = FakeGateway::default().with_destination("Ops", &["p-ops"]);

        let report = Orchestrator::new(&mut gateway, "/repo")
            .run(&registry, &[candidate("wb/A.twb"), candidate("wb/B.twb")]);

        assert!(!report.success());
        assert_eq!((report.failed(), report.published()), (1, 1));
        assert!(matches!(
            &report.items()[0],
            ItemOutcome::Failed {
                cause: PublishFailure::Destination(DestinationResolutionError::NotFound { .. }),
                ..
            }
        ));
        assert_eq!(gateway.uploads.len(), 1);
        assert_eq!(gateway.uploads[0].1, "p-ops");
    }

    #[test]
    fn ambiguous_destination_is_a_resolution_failure() {
        let registry: Registry = [spec("A.twb", "A", "Sales")].into_iter().collect();
        let mut gateway = FakeGateway::default().with_destination("Sales", &["p1", "p2"]);

        let report =
            Orchestrator::new(&mut gateway, "/repo").run(&registry, &[candidate("wb/A.twb")]);
        assert!(matches!(
            &report.items()[0],
            ItemOutcome::Failed {
                cause: PublishFailure::Destination(DestinationResolutionError::Ambiguous { .. }),
                ..
            }
        ));
    }

    #[test]
    fn gateway_error_fails_only_that_item() {
        let registry: Registry = [spec("A.twb", "A", "Sales"), spec("B.twb", "B", "Sales")]
            .into_iter()
            .collect();
        let mut gateway = FakeGateway::default().with_destination("Sales", &["p-sales"]);
        gateway.reject.push("A".into());

        let report = Orchestrator::new(&mut gateway, "/repo")
            .run(&registry, &[candidate("wb/A.twb"), candidate("wb/B.twb")]);
        assert!(!report.success());
        assert!(report.items()[0].is_failure());
        assert!(matches!(report.items()[1], ItemOutcome::Published { .. }));
    }

    #[test]
    fn duplicate_candidates_are_each_attempted() {
        let registry: Registry = [spec("A.twb", "A", "Sales")].into_iter().collect();
        let mut gateway = FakeGateway::default().with_destination("Sales", &["p"]);

        let report = Orchestrator::new(&mut gateway, "/repo")
            .run(&registry, &[candidate("wb/A.twb"), candidate("wb/A.twb")]);
        assert_eq!(report.published(), 2);
        assert_eq!(gateway.uploads.len(), 2);
    }

    #[test]
    fn upload_path_is_joined_to_checkout_root() {
        let registry: Registry = [spec("A.twb", "A", "Sales")].into_iter().collect();
        let mut gateway = FakeGateway::default().with_destination("Sales", &["p"]);

        Orchestrator::new(&mut gateway, "/repo").run(&registry, &[candidate("bi/wb/A.twb")]);
        assert_eq!(gateway.uploads[0].2, Path::new("/repo").join("bi/wb/A.twb"));
    }
}
