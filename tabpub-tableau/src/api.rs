//! JSON wire types for the Tableau REST API.
//!
//! Only the fields the gateway reads are modelled. Tableau sends counters as
//! strings in some versions and as numbers in others; [`de_count`] accepts
//! both.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub credentials: SignInCredentials<'a>,
}

#[derive(Debug, Serialize)]
pub struct SignInCredentials<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub site: SiteRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct SiteRef<'a> {
    #[serde(rename = "contentUrl")]
    pub content_url: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub credentials: IssuedCredentials,
}

#[derive(Debug, Deserialize)]
pub struct IssuedCredentials {
    pub token: String,
    pub site: IssuedSite,
}

#[derive(Debug, Deserialize)]
pub struct IssuedSite {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerInfoResponse {
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "restApiVersion")]
    pub rest_api_version: String,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProjectsResponse {
    pub pagination: Pagination,
    #[serde(default)]
    pub projects: ProjectList,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub project: Vec<ProjectItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "parentProjectId", default)]
    pub parent_project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(rename = "pageNumber", deserialize_with = "de_count")]
    pub page_number: u64,
    #[serde(rename = "pageSize", deserialize_with = "de_count")]
    pub page_size: u64,
    #[serde(rename = "totalAvailable", deserialize_with = "de_count")]
    pub total_available: u64,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page_number.saturating_mul(self.page_size) < self.total_available
    }
}

/// Accept `"42"` as well as `42`.
pub fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WorkbookResponse {
    pub workbook: WorkbookItem,
}

#[derive(Debug, Deserialize)]
pub struct WorkbookItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "webpageUrl", default)]
    pub webpage_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileUploadResponse {
    #[serde(rename = "fileUpload")]
    pub file_upload: FileUpload,
}

#[derive(Debug, Deserialize)]
pub struct FileUpload {
    #[serde(rename = "uploadSessionId")]
    pub upload_session_id: String,
}

/// `{"error": {...}}` body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiError {
    /// `summary: detail (code)`, skipping absent parts.
    pub fn describe(&self) -> String {
        let mut out = self.summary.clone().unwrap_or_default();
        if let Some(detail) = &self.detail {
            if !out.is_empty() {
                out.push_str(": ");
            }
            out.push_str(detail);
        }
        if let Some(code) = &self.code {
            out.push_str(&format!(" ({code})"));
        }
        out
    }
}
