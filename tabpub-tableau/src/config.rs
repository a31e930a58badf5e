use secrecy::SecretString;

/// Connection settings for one Tableau site.
#[derive(Debug, Clone)]
pub struct TableauConfig {
    /// Server root, e.g. `https://tableau.example.com`.
    pub server_url: String,
    /// Site content URL; empty for the default site.
    pub site_content_url: String,
    pub username: String,
    pub password: SecretString,
    /// REST API version to use; asked from the server when `None`.
    pub api_version: Option<String>,
}

impl TableauConfig {
    pub fn new(
        server_url: &str,
        site_content_url: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_owned(),
            site_content_url: site_content_url.into(),
            username: username.into(),
            password,
            api_version: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }
}
