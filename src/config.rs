use std::time::Duration;

use url::Url;

use crate::cli::Args;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    // Per-request deadline; also caps a throttled GET's wait before retrying.
    pub timeout: Duration,
    pub user_agent: String,
    pub max_concurrency: usize,
    pub max_attempts: usize,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
            user_agent: concat!("brasfut-client/", env!("CARGO_PKG_VERSION")).to_string(),
            max_concurrency: 4,
            max_attempts: 3,
        }
    }
}

impl From<&Args> for ClientConfig {
    fn from(args: &Args) -> Self {
        Self {
            base_url: args.base_url.clone(),
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
            user_agent: args.user_agent.clone(),
            max_concurrency: args.max_concurrency.max(1),
            max_attempts: args.max_attempts.max(1),
        }
    }
}
