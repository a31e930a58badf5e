//! [`PublishGateway`] over the Tableau REST API.
//!
//! The session is opened on the first gateway call and kept until
//! [`TableauGateway::sign_out`]. The project list is fetched once per session.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tabpub_core::WorkbookSpec;
use tabpub_publish::{
    DestinationId, PublishGateway, PublishGatewayError, PublishRequest, PublishedWorkbook,
};

use crate::api::{
    ErrorResponse, FileUploadResponse, ProjectItem, ProjectsResponse, ServerInfoResponse,
    SignInCredentials, SignInRequest, SignInResponse, SiteRef, WorkbookResponse,
};
use crate::config::TableauConfig;
use crate::multipart::{boundary_for, file_digest, MultipartBody};
use crate::projects::{ProjectTree, Resolution};

/// Files larger than this are sent through a chunked upload session.
pub const CHUNKED_UPLOAD_THRESHOLD: u64 = 64 * 1024 * 1024;
/// Size of each `PUT` in a chunked upload session.
pub const UPLOAD_CHUNK_SIZE: u64 = 5 * 1024 * 1024;
const PAGE_SIZE: u64 = 100;
/// Oldest version that serves `serverinfo` without authentication.
const SERVER_INFO_VERSION: &str = "2.4";
const AUTH_HEADER: &str = "X-Tableau-Auth";

type Result<T> = std::result::Result<T, PublishGatewayError>;

#[derive(Debug)]
struct Session {
    /// `{server}/api/{version}`
    api_base: String,
    site_id: String,
    token: SecretString,
}

/// Thin request layer; holds no session state.
#[derive(Debug)]
struct Api {
    agent: ureq::Agent,
    server_url: String,
    chunk_threshold: u64,
    chunk_size: u64,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct TableauGateway {
    api: Api,
    config: TableauConfig,
    session: Option<Session>,
    projects: Option<ProjectTree>,
}

impl TableauGateway {
    pub fn new(config: TableauConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(300))
            .timeout_write(Duration::from_secs(300))
            .build();
        Self {
            api: Api {
                agent,
                server_url: config.server_url.clone(),
                chunk_threshold: CHUNKED_UPLOAD_THRESHOLD,
                chunk_size: UPLOAD_CHUNK_SIZE,
            },
            config,
            session: None,
            projects: None,
        }
    }

    /// Upload files larger than `threshold` bytes in `chunk_size` pieces.
    pub fn with_chunking(mut self, threshold: u64, chunk_size: u64) -> Self {
        self.api.chunk_threshold = threshold;
        self.api.chunk_size = chunk_size.max(1);
        self
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// End the session if one was opened. Failures are logged only.
    pub fn sign_out(&mut self) {
        self.projects = None;
        let Some(session) = self.session.take() else {
            return;
        };
        match self.api.sign_out(&session) {
            Ok(()) => tracing::info!(server = %self.api.server_url, "signed out of Tableau"),
            Err(err) => tracing::warn!(error = %err, "Tableau sign-out failed"),
        }
    }

    fn signed_in<'s>(
        api: &Api,
        config: &TableauConfig,
        slot: &'s mut Option<Session>,
    ) -> Result<&'s Session> {
        let session = match slot.take() {
            Some(session) => session,
            None => api.sign_in(config)?,
        };
        Ok(slot.insert(session))
    }
}

impl PublishGateway for TableauGateway {
    fn resolve_destination(&mut self, path_query: &str) -> Result<Option<DestinationId>> {
        let tree = match self.projects.take() {
            Some(tree) => tree,
            None => {
                let session = Self::signed_in(&self.api, &self.config, &mut self.session)?;
                ProjectTree::new(self.api.list_projects(session)?)
            }
        };
        let tree = self.projects.insert(tree);

        match tree.resolve(path_query) {
            Resolution::Unique(entry) => {
                tracing::debug!(
                    query = path_query,
                    project = %entry.full_path,
                    id = %entry.id,
                    "project resolved"
                );
                Ok(Some(DestinationId(entry.id.clone())))
            }
            Resolution::Ambiguous(matches) => Err(PublishGatewayError::AmbiguousDestination {
                query: path_query.to_owned(),
                matches,
            }),
            Resolution::Missing { near_misses } => {
                if near_misses.is_empty() {
                    tracing::info!(query = path_query, "the project does not exist");
                } else {
                    tracing::warn!(
                        query = path_query,
                        near_misses = ?near_misses,
                        "no exact project match"
                    );
                }
                Ok(None)
            }
        }
    }

    fn publish(&mut self, request: &PublishRequest<'_>) -> Result<PublishedWorkbook> {
        let session = Self::signed_in(&self.api, &self.config, &mut self.session)?;
        let workbook = self.api.upload(session, request)?;

        let options = &request.spec.options;
        if !options.tags.is_empty() {
            self.api.add_tags(session, &workbook.id, &options.tags)?;
        }
        if let Some(description) = &options.description {
            if let Err(err) = self.api.set_description(session, &workbook.id, description) {
                tracing::warn!(workbook = %workbook.name, error = %err, "description not set");
            }
        }
        Ok(workbook)
    }
}

/// `request_payload` part for a workbook publish.
pub fn workbook_payload(spec: &WorkbookSpec, project: &DestinationId) -> serde_json::Value {
    let mut workbook = json!({
        "name": spec.display_name,
        "showTabs": spec.options.show_tabs.to_string(),
        "project": { "id": project.0 },
    });
    if !spec.options.hidden_views.is_empty() {
        let views: Vec<_> = spec
            .options
            .hidden_views
            .iter()
            .map(|name| json!({ "name": name, "hidden": "true" }))
            .collect();
        workbook["views"] = json!({ "view": views });
    }
    json!({ "workbook": workbook })
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

impl Api {
    fn site_url(&self, session: &Session, tail: &str) -> String {
        format!("{}/sites/{}/{tail}", session.api_base, session.site_id)
    }

    fn authed(&self, method: &str, url: &str, session: &Session) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Accept", "application/json")
            .set(AUTH_HEADER, session.token.expose_secret())
    }

    fn api_version(&self, config: &TableauConfig) -> Result<String> {
        if let Some(version) = &config.api_version {
            return Ok(version.clone());
        }
        const OP: &str = "server info";
        let url = format!("{}/api/{SERVER_INFO_VERSION}/serverinfo", self.server_url);
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| gateway_err(OP, e))?;
        let info: ServerInfoResponse = decode(OP, response)?;
        Ok(info.server_info.rest_api_version)
    }

    fn sign_in(&self, config: &TableauConfig) -> Result<Session> {
        const OP: &str = "sign in";
        let version = self.api_version(config)?;
        let api_base = format!("{}/api/{version}", self.server_url);
        let body = SignInRequest {
            credentials: SignInCredentials {
                name: &config.username,
                password: config.password.expose_secret(),
                site: SiteRef {
                    content_url: &config.site_content_url,
                },
            },
        };
        let response = self
            .agent
            .post(&format!("{api_base}/auth/signin"))
            .set("Accept", "application/json")
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Status(401 | 403, response) => {
                    PublishGatewayError::Auth(error_message(response))
                }
                other => gateway_err(OP, other),
            })?;
        let signed: SignInResponse = decode(OP, response)?;
        tracing::info!(
            server = %self.server_url,
            api_version = %version,
            site = %config.site_content_url,
            "signed in to Tableau"
        );
        Ok(Session {
            api_base,
            site_id: signed.credentials.site.id,
            token: SecretString::from(signed.credentials.token),
        })
    }

    fn sign_out(&self, session: &Session) -> Result<()> {
        let url = format!("{}/auth/signout", session.api_base);
        self.authed("POST", &url, session)
            .call()
            .map_err(|e| gateway_err("sign out", e))?;
        Ok(())
    }

    fn list_projects(&self, session: &Session) -> Result<Vec<ProjectItem>> {
        const OP: &str = "list projects";
        let url = self.site_url(session, "projects");
        let mut projects = Vec::new();
        let mut page_number = 1u64;
        loop {
            let response = self
                .authed("GET", &url, session)
                .query("pageSize", &PAGE_SIZE.to_string())
                .query("pageNumber", &page_number.to_string())
                .call()
                .map_err(|e| gateway_err(OP, e))?;
            let page: ProjectsResponse = decode(OP, response)?;
            let received = page.projects.project.len();
            projects.extend(page.projects.project);
            if !page.pagination.has_more() || received == 0 {
                break;
            }
            page_number += 1;
        }
        tracing::debug!(count = projects.len(), "fetched projects");
        Ok(projects)
    }

    fn upload(&self, session: &Session, request: &PublishRequest<'_>) -> Result<PublishedWorkbook> {
        const OP: &str = "publish workbook";
        let path = request.local_path;
        let size = std::fs::metadata(path)
            .map_err(|e| io_err(path, e))?
            .len();
        let digest = file_digest(path).map_err(|e| io_err(path, e))?;
        let boundary = boundary_for(&digest);
        let file_name = request.spec.file_name.as_str();
        let workbook_type = request
            .spec
            .file_name
            .extension()
            .unwrap_or_else(|| "twbx".to_owned());
        tracing::info!(
            workbook = %request.spec.display_name,
            file = %path.display(),
            size,
            sha256 = %digest,
            "uploading workbook"
        );

        let payload = workbook_payload(request.spec, request.destination);
        let url = self.site_url(session, "workbooks");
        let publish = self
            .authed("POST", &url, session)
            .query("overwrite", "true")
            .query("skipConnectionCheck", "true");

        let (content_type, body, publish) = if size > self.chunk_threshold {
            let upload_id = self.upload_in_chunks(session, path, &boundary)?;
            let (content_type, body) = MultipartBody::new(boundary)
                .json_part("request_payload", &payload)
                .finish();
            let publish = publish
                .query("uploadSessionId", &upload_id)
                .query("workbookType", &workbook_type);
            (content_type, body, publish)
        } else {
            let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
            let (content_type, body) = MultipartBody::new(boundary)
                .json_part("request_payload", &payload)
                .file_part("tableau_workbook", file_name, &bytes)
                .finish();
            (content_type, body, publish)
        };

        let response = publish
            .set("Content-Type", &content_type)
            .send_bytes(&body)
            .map_err(|e| gateway_err(OP, e))?;
        let published: WorkbookResponse = decode(OP, response)?;
        Ok(PublishedWorkbook {
            id: published.workbook.id,
            name: published.workbook.name,
            url: published.workbook.webpage_url,
        })
    }

    /// Send `path` through a file upload session; returns the session id.
    fn upload_in_chunks(&self, session: &Session, path: &Path, boundary: &str) -> Result<String> {
        const OP: &str = "chunked upload";
        let response = self
            .authed("POST", &self.site_url(session, "fileUploads"), session)
            .call()
            .map_err(|e| gateway_err(OP, e))?;
        let upload: FileUploadResponse = decode(OP, response)?;
        let upload_id = upload.file_upload.upload_session_id;
        let url = self.site_url(session, &format!("fileUploads/{upload_id}"));

        let mut file = File::open(path).map_err(|e| io_err(path, e))?;
        let mut chunks = 0usize;
        loop {
            let mut chunk = Vec::new();
            (&mut file)
                .take(self.chunk_size)
                .read_to_end(&mut chunk)
                .map_err(|e| io_err(path, e))?;
            if chunk.is_empty() {
                break;
            }
            let (content_type, body) = MultipartBody::new(boundary)
                .json_part("request_payload", &json!({}))
                .file_part("tableau_file", "file", &chunk)
                .finish();
            self.authed("PUT", &url, session)
                .set("Content-Type", &content_type)
                .send_bytes(&body)
                .map_err(|e| gateway_err(OP, e))?;
            chunks += 1;
        }
        tracing::debug!(upload_id = %upload_id, chunks, "chunked upload complete");
        Ok(upload_id)
    }

    fn add_tags(&self, session: &Session, workbook_id: &str, tags: &[String]) -> Result<()> {
        let labels: Vec<_> = tags.iter().map(|t| json!({ "label": t })).collect();
        let url = self.site_url(session, &format!("workbooks/{workbook_id}/tags"));
        self.authed("PUT", &url, session)
            .send_json(json!({ "tags": { "tag": labels } }))
            .map_err(|e| gateway_err("add tags", e))?;
        Ok(())
    }

    fn set_description(
        &self,
        session: &Session,
        workbook_id: &str,
        description: &str,
    ) -> Result<()> {
        let url = self.site_url(session, &format!("workbooks/{workbook_id}"));
        self.authed("PUT", &url, session)
            .send_json(json!({ "workbook": { "description": description } }))
            .map_err(|e| gateway_err("update workbook", e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(operation: &'static str, response: ureq::Response) -> Result<T> {
    response
        .into_json()
        .map_err(|e| PublishGatewayError::Decode {
            operation,
            message: e.to_string(),
        })
}

fn gateway_err(operation: &'static str, err: ureq::Error) -> PublishGatewayError {
    match err {
        ureq::Error::Status(status, response) => PublishGatewayError::Rejected {
            operation,
            status,
            message: error_message(response),
        },
        ureq::Error::Transport(transport) => PublishGatewayError::Transport {
            operation,
            source: Box::new(transport),
        },
    }
}

fn error_message(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => parsed.error.describe(),
        Err(_) => body,
    }
}

fn io_err(path: &Path, source: std::io::Error) -> PublishGatewayError {
    PublishGatewayError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabpub_core::{WorkbookFile, WorkbookOptions};

    fn spec(options: WorkbookOptions) -> WorkbookSpec {
        WorkbookSpec {
            file_name: WorkbookFile::from("Sales.twbx"),
            display_name: "Sales Overview".into(),
            destination_path: "Finance".into(),
            options,
        }
    }

    #[test]
    fn payload_without_hidden_views_has_no_views_key() {
        let payload = workbook_payload(&spec(WorkbookOptions::default()), &"p1".into());
        assert_eq!(
            payload,
            json!({"workbook": {
                "name": "Sales Overview",
                "showTabs": "false",
                "project": {"id": "p1"}
            }})
        );
    }

    #[test]
    fn payload_lists_hidden_views() {
        let options = WorkbookOptions {
            hidden_views: vec!["Scratch".into(), "Debug".into()],
            show_tabs: true,
            ..WorkbookOptions::default()
        };
        let payload = workbook_payload(&spec(options), &"p1".into());
        assert_eq!(payload["workbook"]["showTabs"], "true");
        assert_eq!(
            payload["workbook"]["views"]["view"],
            json!([{"name": "Scratch", "hidden": "true"}, {"name": "Debug", "hidden": "true"}])
        );
    }

    #[test]
    fn new_gateway_is_not_signed_in_and_sign_out_is_a_no_op() {
        let mut gateway = TableauGateway::new(TableauConfig::new(
            "http://127.0.0.1:9/",
            "",
            "user",
            SecretString::from("pw".to_string()),
        ));
        assert!(!gateway.is_signed_in());
        gateway.sign_out();
        assert!(!gateway.is_signed_in());
    }
}
