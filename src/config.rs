use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub annotator: AnnotatorConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    /// Split boundaries in priority order. The first separator with a match
    /// inside the length window wins.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
            separators: default_separators(),
        }
    }
}

fn default_max_chars() -> usize {
    400
}
fn default_overlap_chars() -> usize {
    35
}
fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ".", "!", "?", ";"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotatorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_timing_model")]
    pub timing_model: String,
    #[serde(default = "default_tactic_model")]
    pub tactic_model: String,
    /// Expected embedding vector length. Replies with any other length are
    /// rejected as annotator failures.
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            embed_model: default_embed_model(),
            timing_model: default_timing_model(),
            tactic_model: default_tactic_model(),
            dims: default_dims(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_embed_model() -> String {
    "text-embedding-004".to_string()
}
fn default_timing_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_tactic_model() -> String {
    "gemini-1.5-pro".to_string()
}
fn default_dims() -> usize {
    768
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            period_secs: default_period_secs(),
        }
    }
}

fn default_max_calls() -> usize {
    15
}
fn default_period_secs() -> u64 {
    60
}

impl AnnotatorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!(
            "chunking.overlap_chars must be smaller than chunking.max_chars ({} >= {})",
            config.chunking.overlap_chars,
            config.chunking.max_chars
        );
    }

    // Validate rate limit
    if config.rate_limit.max_calls == 0 {
        anyhow::bail!("rate_limit.max_calls must be > 0");
    }

    if config.rate_limit.period_secs == 0 {
        anyhow::bail!("rate_limit.period_secs must be > 0");
    }

    // Validate annotator
    if config.annotator.is_enabled() && config.annotator.dims == 0 {
        anyhow::bail!(
            "annotator.dims must be > 0 when provider is '{}'",
            config.annotator.provider
        );
    }

    match config.annotator.provider.as_str() {
        "disabled" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown annotator provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    Ok(config)
}
