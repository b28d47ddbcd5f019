use clap::Parser;
use serde::{Deserialize, Serialize};

/// Base configuration for the app.
///
/// Parsed once from CLI arguments / environment in `main` and passed into
/// component constructors; nothing reads configuration ambiently.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "anchorsmith", about = "Anchors documents to a public timeline")]
pub struct BaseConfig {
    /// Address the webhook intake binds to.
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub bind_addr: String,

    /// Path for the durable checkpoint task store (RocksDB).
    #[arg(long, default_value = "./data")]
    pub task_store_path: String,

    /// Directory where proof bundles are spooled before upload.
    #[arg(long, default_value = "./files")]
    pub spool_dir: String,

    /// Discovery endpoint of the anchoring network.
    #[arg(long, default_value = "https://a.chainpoint.org")]
    pub discovery_uri: String,

    /// Base URI of the document source API.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub source_uri: String,

    /// Bearer token for the document source API.
    #[arg(long, env = "ANCHORSMITH_SOURCE_TOKEN", default_value = "")]
    pub source_token: String,

    /// Secret key for document fingerprints (HMAC-SHA256).
    #[arg(long, env = "ANCHORSMITH_FINGERPRINT_SECRET", hide_env_values = true, default_value = "change-me")]
    pub fingerprint_secret: String,

    /// Shared key used to verify webhook signatures.
    #[arg(long, env = "ANCHORSMITH_WEBHOOK_KEY", hide_env_values = true, default_value = "")]
    pub webhook_key: String,

    /// Number of anchoring nodes to spread each submission across.
    #[arg(long, default_value_t = 2)]
    pub submit_node_count: usize,

    /// Delay before the fast (calendar) proof checkpoint, in seconds.
    #[arg(long, default_value_t = 12)]
    pub fast_delay_secs: u64,

    /// Delay before the full (public ledger) proof checkpoint, in seconds.
    #[arg(long, default_value_t = 7200)]
    pub full_delay_secs: u64,

    /// Interval at which the scheduler scans for due checkpoint tasks.
    #[arg(long, default_value_t = 5)]
    pub scheduler_tick_secs: u64,

    /// Maximum full-checkpoint polls per document before giving up.
    #[arg(long, default_value_t = 6)]
    pub max_poll_attempts: u32,

    /// Upper bound for the full-checkpoint retry backoff, in seconds.
    #[arg(long, default_value_t = 86400)]
    pub max_backoff_secs: u64,
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            bind_addr: "127.0.0.1:3000".to_string(),
            task_store_path: "./data".to_string(),
            spool_dir: "./files".to_string(),
            discovery_uri: "https://a.chainpoint.org".to_string(),
            source_uri: "http://127.0.0.1:8080".to_string(),
            source_token: String::new(),
            fingerprint_secret: "change-me".to_string(),
            webhook_key: String::new(),
            submit_node_count: 2,
            fast_delay_secs: 12,
            full_delay_secs: 7200, // ~2h, BTC anchors take at least 90 minutes
            scheduler_tick_secs: 5,
            max_poll_attempts: 6,
            max_backoff_secs: 86400,
        }
    }
}
