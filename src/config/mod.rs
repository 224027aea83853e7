use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    pub timeout: u64,
    pub user_agent: String,
    /// Allow-listed origin prefix. Requests whose url does not start with
    /// this exact byte prefix are rejected with 404.
    pub url_prefix: String,
    /// Directory holding persisted derivatives and the mask.png asset.
    pub image_dir: String,
    /// Base URL of the external star-count API.
    pub star_api_url: String,
}
