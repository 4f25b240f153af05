use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OUTPUT_PATH: &str = "reports/library-report.xlsx";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub token_id: Option<String>,
    pub token_secret: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ReportSection {
    pub output_path: Option<String>,
    pub refetch_membership: Option<bool>,
}

impl Config {
    /// Resolve the instance base URL: env STACKAUDIT_BASE_URL > config.
    pub fn base_url(&self) -> Option<String> {
        if let Some(value) = env_value("STACKAUDIT_BASE_URL") {
            return Some(value);
        }
        self.api.base_url.clone()
    }

    pub fn token_id(&self) -> Option<String> {
        env_value("STACKAUDIT_TOKEN_ID").or_else(|| self.api.token_id.clone())
    }

    pub fn token_secret(&self) -> Option<String> {
        env_value("STACKAUDIT_TOKEN_SECRET").or_else(|| self.api.token_secret.clone())
    }

    pub fn timeout_ms(&self) -> u64 {
        env_value("STACKAUDIT_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(self.api.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn output_path(&self) -> String {
        env_value("STACKAUDIT_OUTPUT_PATH")
            .or_else(|| self.report.output_path.clone())
            .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string())
    }

    pub fn refetch_membership(&self) -> bool {
        self.report.refetch_membership.unwrap_or(true)
    }

    /// Validate the loaded configuration into the resolved form the rest of
    /// the pipeline consumes. The base URL and both token halves are required.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let Some(base_url) = self.base_url() else {
            bail!("missing base_url (set [api].base_url or STACKAUDIT_BASE_URL)");
        };
        let Some(token_id) = self.token_id() else {
            bail!("missing token_id (set [api].token_id or STACKAUDIT_TOKEN_ID)");
        };
        let Some(token_secret) = self.token_secret() else {
            bail!("missing token_secret (set [api].token_secret or STACKAUDIT_TOKEN_SECRET)");
        };
        Ok(ResolvedConfig {
            site: Site::new(&base_url),
            token_id,
            token_secret,
            timeout_ms: self.timeout_ms(),
            output_path: self.output_path(),
            refetch_membership: self.refetch_membership(),
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed)
}

/// Load and parse a Config from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub site: Site,
    pub token_id: String,
    pub token_secret: String,
    pub timeout_ms: u64,
    pub output_path: String,
    pub refetch_membership: bool,
}

/// Canonical URL builder for one BookStack instance. Chapter and page URLs
/// nest under their parent book's segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    base: String,
}

impl Site {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base, endpoint)
    }

    pub fn shelf_url(&self, slug: &str) -> String {
        format!("{}/shelves/{}", self.base, slug)
    }

    pub fn book_url(&self, slug: &str) -> String {
        format!("{}/books/{}", self.base, slug)
    }

    pub fn chapter_url(&self, book_slug: &str, slug: &str) -> String {
        format!("{}/books/{}/chapter/{}", self.base, book_slug, slug)
    }

    pub fn page_url(&self, book_slug: &str, slug: &str) -> String {
        format!("{}/books/{}/page/{}", self.base, book_slug, slug)
    }
}
