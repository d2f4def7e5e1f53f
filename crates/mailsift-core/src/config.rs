//! Analyzer configuration.
//!
//! Built once at startup and handed to the orchestrator. Stored as JSON;
//! a missing file means defaults.

use std::path::Path;
use std::time::Duration;

use mailsift_llm::{Endpoint, ModelProfile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pipeline::RetryPolicy;
use crate::{Error, Result};

/// Everything the pipeline needs to know besides the stores and the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Where to send inference requests.
    pub inference: InferenceSettings,
    /// Profile for the cheap go/no-go call.
    pub triage: ModelProfile,
    /// Profile for full structured extraction.
    pub analysis: ModelProfile,
    /// Retry behaviour around each inference call.
    pub retry: RetryPolicy,
    /// Batch sizing and rate limiting.
    pub batch: BatchSettings,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            inference: InferenceSettings::default(),
            triage: ModelProfile::triage_default(),
            analysis: ModelProfile::analysis_default(),
            retry: RetryPolicy::default(),
            batch: BatchSettings::default(),
        }
    }
}

/// Inference service connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// Base URL of the Messages-style API.
    pub base_url: String,
    /// API version header value.
    pub api_version: String,
    /// Per-request timeout.
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/".to_string(),
            api_version: mailsift_llm::endpoint::DEFAULT_API_VERSION.to_string(),
            timeout: mailsift_llm::client::DEFAULT_TIMEOUT,
        }
    }
}

impl InferenceSettings {
    /// Build and validate the endpoint these settings describe.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or API version is invalid.
    pub fn endpoint(&self) -> Result<Endpoint> {
        let endpoint = Endpoint::new("inference", &self.base_url)?
            .with_api_version(self.api_version.clone());
        endpoint.validate()?;
        Ok(endpoint)
    }
}

/// Batch sizing and rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Emails pulled per run.
    pub batch_size: usize,
    /// Pause after this many attempted items; 0 disables pausing.
    pub pause_every: usize,
    /// How long each pause lasts.
    #[serde(rename = "pause_secs", with = "duration_secs")]
    pub pause_duration: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            pause_every: 10,
            pause_duration: Duration::from_secs(60),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a JSON file, or defaults if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the loaded values are invalid.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write configuration as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.batch.batch_size == 0 {
            return Err(Error::Config("batch.batch_size must be at least 1".into()));
        }
        for (name, profile) in [("triage", &self.triage), ("analysis", &self.analysis)] {
            if profile.model.trim().is_empty() {
                return Err(Error::Config(format!("{name}.model is empty")));
            }
            if profile.max_tokens == 0 {
                return Err(Error::Config(format!("{name}.max_tokens must be at least 1")));
            }
        }
        self.inference.endpoint()?;
        Ok(())
    }
}

/// Serialize a [`Duration`] as whole seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)] // Required by serde with= signature
    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Serialize a [`Duration`] as whole milliseconds.
pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)] // Required by serde with= signature
    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
