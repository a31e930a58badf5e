//! Boundary to the BI server that receives published workbooks.

use std::fmt;
use std::path::Path;

use tabpub_core::WorkbookSpec;

use crate::error::PublishGatewayError;

/// Server-side identifier of a resolved destination (a Tableau project id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationId(pub String);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DestinationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Everything the gateway needs to upload one workbook.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub spec: &'a WorkbookSpec,
    pub destination: &'a DestinationId,
    /// Workbook file on the local checkout.
    pub local_path: &'a Path,
}

/// What the server reports back after a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedWorkbook {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

/// Capability interface over the BI server.
///
/// Publishing overwrites an existing workbook of the same name in the
/// destination.
pub trait PublishGateway {
    /// Resolve `path_query` to one destination.
    ///
    /// `Ok(None)` means nothing matched; more than one match is
    /// [`PublishGatewayError::AmbiguousDestination`].
    fn resolve_destination(
        &mut self,
        path_query: &str,
    ) -> Result<Option<DestinationId>, PublishGatewayError>;

    fn publish(
        &mut self,
        request: &PublishRequest<'_>,
    ) -> Result<PublishedWorkbook, PublishGatewayError>;
}
