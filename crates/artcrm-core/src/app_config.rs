use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub google_maps_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub claude_model: String,
    pub deepseek_api_key: Option<String>,
    pub deepseek_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub scout_rate_limit_ms: u64,
    pub scout_fallback_min_results: usize,
    pub scout_results_dir: PathBuf,
    pub overpass_url: String,
    pub default_language: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "google_maps_api_key",
                &self.google_maps_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("claude_model", &self.claude_model)
            .field(
                "deepseek_api_key",
                &self.deepseek_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("deepseek_base_url", &self.deepseek_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("scout_rate_limit_ms", &self.scout_rate_limit_ms)
            .field(
                "scout_fallback_min_results",
                &self.scout_fallback_min_results,
            )
            .field("scout_results_dir", &self.scout_results_dir)
            .field("overpass_url", &self.overpass_url)
            .field("default_language", &self.default_language)
            .finish()
    }
}
