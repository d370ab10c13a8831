use anyhow::Context;
use std::{
    collections::HashSet,
    env,
    path::PathBuf,
    time::Duration,
};

/// Server configuration loaded via environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Asset settings
    pub asset_root: PathBuf,
    /// Base URL prefixed to every returned asset path.
    pub public_url: String,
    /// Lowercase extension allow-list; empty indexes every file.
    pub asset_extensions: Vec<String>,

    // Index store settings
    pub database_path: PathBuf,

    /// Quiet period after the last filesystem change before a category
    /// rebuild fires.
    pub rebuild_debounce: Duration,

    // CORS settings
    pub cors_allowed_origins: Vec<String>,

    // Development settings
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let rebuild_debounce = match env::var("REBUILD_DEBOUNCE") {
            Ok(raw) => humantime::parse_duration(&raw)
                .with_context(|| format!("invalid REBUILD_DEBOUNCE value: {raw}"))?,
            Err(_) => Duration::from_secs(300),
        };

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),

            asset_root: env::var("ASSET_ROOT")
                .unwrap_or_else(|_| "./assets".to_string())
                .into(),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            asset_extensions: split_csv(
                &env::var("ASSET_EXTENSIONS").unwrap_or_default(),
            )
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect(),

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./cache/index.db".to_string())
                .into(),

            rebuild_debounce,

            cors_allowed_origins: split_csv(
                &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            ),

            dev_mode: env::var("DEV_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }

    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.asset_root).with_context(|| {
            format!("failed to create asset root {}", self.asset_root.display())
        })?;
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }
        Ok(())
    }

    /// Canonicalize the asset root so watch events, which carry resolved
    /// paths, map back onto categories. The server calls this once during
    /// startup immediately after `ensure_directories`.
    pub fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.asset_root = std::fs::canonicalize(&self.asset_root)?;
        Ok(())
    }

    pub fn extension_filter(&self) -> HashSet<String> {
        self.asset_extensions.iter().cloned().collect()
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
