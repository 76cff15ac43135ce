use std::path::PathBuf;

use anyhow::{bail, Context, Result};

const DEFAULT_CATALOG_PATH: &str = "data/opportunities.json";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Connection settings for the embedding backend.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

/// Application configuration loaded from environment variables.
/// Every variable is optional; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub catalog_path: PathBuf,
    /// JSON file with match weights, adjacency and vocabulary extensions.
    pub match_config_path: Option<PathBuf>,
    pub embedding: EmbeddingSettings,
    /// Overrides `enable_semantic` from the match config file.
    pub enable_semantic: Option<bool>,
    /// Overrides `top_k` from the match config file.
    pub match_top_k: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            catalog_path: optional_env("CATALOG_PATH")
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string())
                .into(),
            match_config_path: optional_env("MATCH_CONFIG_PATH").map(PathBuf::from),
            embedding: EmbeddingSettings {
                api_url: optional_env("EMBEDDING_API_URL"),
                api_key: optional_env("EMBEDDING_API_KEY"),
                model: optional_env("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            },
            enable_semantic: optional_env("ENABLE_SEMANTIC")
                .map(|v| parse_bool("ENABLE_SEMANTIC", &v))
                .transpose()?,
            match_top_k: optional_env("MATCH_TOP_K")
                .map(|v| {
                    v.parse::<usize>()
                        .context("MATCH_TOP_K must be a non-negative integer")
                })
                .transpose()?,
        })
    }
}

/// The variable's value, treating unset and blank the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean (true/false), got '{other}'"),
    }
}
