use std::time::Duration;

use serde::Deserialize;

use crate::services::{CorrelationMode, EngineSettings};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Catalog table (`movieId,title,genres`)
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Rating table (`userId,movieId,rating,timestamp`)
    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// Per-request recommendation budget in milliseconds, 0 disables it
    #[serde(default = "default_recommend_timeout_ms")]
    pub recommend_timeout_ms: u64,

    /// How missing ratings are treated when correlating items
    #[serde(default)]
    pub correlation_mode: CorrelationMode,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_movies_path() -> String {
    "data/movies.csv".to_string()
}

fn default_ratings_path() -> String {
    "data/ratings.csv".to_string()
}

fn default_recommend_timeout_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings handed to every engine built by this process
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            correlation: self.correlation_mode,
            timeout: (self.recommend_timeout_ms > 0)
                .then(|| Duration::from_millis(self.recommend_timeout_ms)),
        }
    }
}
