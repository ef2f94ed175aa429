use serde::Deserialize;
use std::time::Duration;

/// How jobs get processed. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProcessingMode {
    /// Internal timer completes jobs with a placeholder result.
    #[default]
    Simulated,
    /// Jobs are dispatched to an external compositor which reports back
    /// through the webhook.
    Delegated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Absolute URL prefix of this service, used for URLs handed to the
    /// compositor (original image, callback).
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Path to the product catalog JSON file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Maximum catalog products per try-on job
    #[serde(default = "default_max_catalog_items")]
    pub max_catalog_items: usize,

    /// Maximum external garment URLs per try-on job
    #[serde(default = "default_max_external_garments")]
    pub max_external_garments: usize,

    #[serde(default)]
    pub processing_mode: ProcessingMode,

    /// Lower bound of the simulated processing delay
    #[serde(default = "default_simulated_delay_min_ms")]
    pub simulated_delay_min_ms: u64,

    /// Upper bound of the simulated processing delay
    #[serde(default = "default_simulated_delay_max_ms")]
    pub simulated_delay_max_ms: u64,

    /// Result image reported by the simulated processor
    #[serde(default = "default_simulated_result_url")]
    pub simulated_result_url: String,

    /// Compositor endpoint. Required in delegated mode.
    #[serde(default)]
    pub worker_url: Option<String>,

    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Jobs in `processing` longer than this are reported by /health
    #[serde(default = "default_stale_job_secs")]
    pub stale_job_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_catalog_path() -> String {
    "data/products.json".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_catalog_items() -> usize {
    3
}

fn default_max_external_garments() -> usize {
    1
}

fn default_simulated_delay_min_ms() -> u64 {
    3000
}

fn default_simulated_delay_max_ms() -> u64 {
    5000
}

fn default_simulated_result_url() -> String {
    "https://images.unsplash.com/photo-1594736797933-d0501ba2fe65?auto=format&fit=crop&w=600&h=750"
        .to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

fn default_stale_job_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_base_url: default_public_base_url(),
            catalog_path: default_catalog_path(),
            max_upload_bytes: default_max_upload_bytes(),
            max_catalog_items: default_max_catalog_items(),
            max_external_garments: default_max_external_garments(),
            processing_mode: ProcessingMode::default(),
            simulated_delay_min_ms: default_simulated_delay_min_ms(),
            simulated_delay_max_ms: default_simulated_delay_max_ms(),
            simulated_result_url: default_simulated_result_url(),
            worker_url: None,
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            stale_job_secs: default_stale_job_secs(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing_mode == ProcessingMode::Delegated && self.worker_url.is_none() {
            return Err(ConfigError::MissingWorkerUrl);
        }
        if self.simulated_delay_min_ms > self.simulated_delay_max_ms {
            return Err(ConfigError::InvalidDelayWindow {
                min: self.simulated_delay_min_ms,
                max: self.simulated_delay_max_ms,
            });
        }
        if self.max_catalog_items == 0 {
            return Err(ConfigError::InvalidLimit("MAX_CATALOG_ITEMS"));
        }
        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn stale_job_after(&self) -> Duration {
        Duration::from_secs(self.stale_job_secs)
    }

    /// Join a path onto the public base URL.
    pub fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

/// Settings for the stand-in compositor binary (`COMPOSITOR_*` variables).
#[derive(Debug, Clone, Deserialize)]
pub struct CompositorConfig {
    #[serde(default = "default_compositor_bind_addr")]
    pub bind_addr: String,

    /// Simulated compositing time per job
    #[serde(default = "default_compositor_processing_ms")]
    pub processing_ms: u64,

    /// Fixed result image. When unset the first garment image is echoed.
    #[serde(default)]
    pub result_url: Option<String>,

    /// Fraction of jobs (0.0-1.0) reported as failed
    #[serde(default)]
    pub fail_rate: f64,
}

fn default_compositor_bind_addr() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_compositor_processing_ms() -> u64 {
    2000
}

impl CompositorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed("COMPOSITOR_").from_env()?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("WORKER_URL is required when PROCESSING_MODE=delegated")]
    MissingWorkerUrl,

    #[error("SIMULATED_DELAY_MIN_MS ({min}) exceeds SIMULATED_DELAY_MAX_MS ({max})")]
    InvalidDelayWindow { min: u64, max: u64 },

    #[error("{0} must be greater than zero")]
    InvalidLimit(&'static str),
}
