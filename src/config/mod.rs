use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub server: ServerConfiguration,

    #[serde(default)]
    pub google: GoogleConfiguration,

    #[serde(default)]
    pub cors: CorsConfiguration,

    #[serde(default)]
    pub proxy: ProxyConfiguration,

    #[serde(default)]
    pub rate_limit: RateLimitConfiguration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfiguration {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,

    /// Connection string for the networked session store backing.
    /// Absent means the in-process memory store is used.
    #[serde(default)]
    pub redis_url: Option<String>,
}

/// Google OAuth and Drive settings. Credentials are optional on purpose:
/// an unconfigured deployment still boots and reports "not configured" per
/// request instead of refusing to start.
#[derive(Debug, Deserialize, Clone)]
pub struct GoogleConfiguration {
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub redirect_uri: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_drive_base_url")]
    pub drive_base_url: String,

    #[serde(default)]
    pub service_account_email: Option<String>,

    #[serde(default)]
    pub service_account_private_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfiguration {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfiguration {
    /// Empty list means every host is allowed.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfiguration {
    #[serde(default = "default_window")]
    pub window_seconds: u64,

    #[serde(default = "default_download_limit")]
    pub download_per_window: u32,

    #[serde(default = "default_info_limit")]
    pub info_per_window: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_session_ttl() -> u64 {
    600
}

fn default_scope() -> String {
    [
        "https://www.googleapis.com/auth/spreadsheets.readonly",
        "https://www.googleapis.com/auth/drive.readonly",
    ]
    .join(" ")
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "https://www.figma.com".to_string(),
        // Plugin iframes can send Origin: null. Allow the literal string.
        "null".to_string(),
    ]
}

fn default_window() -> u64 {
    60
}

fn default_download_limit() -> u32 {
    10
}

fn default_info_limit() -> u32 {
    30
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_ttl_seconds: default_session_ttl(),
            redis_url: None,
        }
    }
}

impl Default for GoogleConfiguration {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scope: default_scope(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            drive_base_url: default_drive_base_url(),
            service_account_email: None,
            service_account_private_key: None,
        }
    }
}

impl Default for CorsConfiguration {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for ProxyConfiguration {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
        }
    }
}

impl Default for RateLimitConfiguration {
    fn default() -> Self {
        Self {
            window_seconds: default_window(),
            download_per_window: default_download_limit(),
            info_per_window: default_info_limit(),
        }
    }
}

impl Configuration {
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(config::File::with_name("config"));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DRIVE_GATEWAY")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .with_list_parse_key("proxy.allowed_hosts"),
        );

        builder.build()?.try_deserialize()
    }
}
