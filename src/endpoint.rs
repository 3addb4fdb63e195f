/// Webhook id of the default image workflow.
pub const DEFAULT_WEBHOOK_ID: &str = "e47176dd-28ad-42f8-bf31-b7a091a65a9d";
pub const PRODUCTION_BASE_URL: &str = "https://n8n.cherishxn.cloud/webhook-test";
pub const DEVELOPMENT_BASE_URL: &str = "http://localhost:5678/webhook-test";

/// Which environment the client was built or launched for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    #[default]
    Production,
}

impl BuildMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(BuildMode::Development),
            "prod" | "production" => Some(BuildMode::Production),
            _ => None,
        }
    }
}

/// Where the default webhook lives for each build mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEndpoints {
    pub mode: BuildMode,
    pub development_base: String,
    pub production_base: String,
    pub webhook_id: String,
}

impl Default for WebhookEndpoints {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            development_base: DEVELOPMENT_BASE_URL.to_string(),
            production_base: PRODUCTION_BASE_URL.to_string(),
            webhook_id: DEFAULT_WEBHOOK_ID.to_string(),
        }
    }
}

impl WebhookEndpoints {
    /// The default endpoint for the configured mode.
    pub fn default_endpoint(&self) -> String {
        let base = match self.mode {
            BuildMode::Development => &self.development_base,
            BuildMode::Production => &self.production_base,
        };
        format!("{}/{}", base.trim_end_matches('/'), self.webhook_id)
    }
}

/// Decide which URL a generation request should target.
///
/// A non-blank `custom_url` wins and is returned trimmed. It is not validated
/// any further: callers that expose this to users own the consequences of
/// pointing the client at arbitrary hosts.
pub fn resolve_endpoint(custom_url: Option<&str>, endpoints: &WebhookEndpoints) -> String {
    match custom_url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => endpoints.default_endpoint(),
    }
}
