//! Configuration for SwarmRoute
//!
//! Everything is driven by environment variables with workable defaults, so the
//! binary can point at any OpenAI-compatible proxy (LiteLLM, vLLM, OpenRouter,
//! Ollama, ...) without a config file:
//!
//! - `SWARM_PRIMARY_URL` / `SWARM_PRIMARY_KEY` — primary endpoint (default
//!   `http://localhost:4000` / `sk-default`)
//! - `SWARM_SECONDARY_URL` / `SWARM_SECONDARY_KEY` — optional secondary
//!   endpoint; both must be set to activate it
//! - `SWARM_KNOWLEDGE_URL` — optional knowledge-store API root
//! - `SWARM_TIMEOUT_FAST` / `SWARM_TIMEOUT_POWER` / `SWARM_TIMEOUT_DEEP` —
//!   per-tier read timeouts in seconds (defaults 30 / 60 / 120)
//!
//! Models are registered programmatically with [`SwarmConfig::add_model`].
//! The configuration is append-only during setup and read-only afterwards;
//! no request-path code mutates it.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Connect timeout applied to every tier, in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Model capability tier.
///
/// `fast` is the cheap default, `power` handles mid-complexity work, `deep`
/// is reserved for the heavyweight reasoning models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Power,
    Deep,
}

impl Tier {
    /// All tiers, in fast-to-deep order.
    pub const ALL: [Tier; 3] = [Tier::Fast, Tier::Power, Tier::Deep];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Power => "power",
            Self::Deep => "deep",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "power" => Ok(Self::Power),
            "deep" => Ok(Self::Deep),
            other => Err(format!(
                "unknown tier '{other}' (expected fast, power, or deep)"
            )),
        }
    }
}

/// An LLM API endpoint: base URL plus bearer credential.
///
/// Constructed once during setup and shared by `Arc` across every
/// [`ModelEntry`] that lives on it. The credential never serializes.
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    url: String,
    #[serde(skip_serializing)]
    api_key: String,
    name: String,
}

impl Endpoint {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            name: name.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Display name, also the key the health monitor tracks this endpoint under.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A model registered in the swarm: a model identifier bound to a tier and an
/// endpoint. Registration order within a tier is call-priority order.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    model_id: String,
    tier: Tier,
    endpoint: Arc<Endpoint>,
    expected_latency_s: f64,
}

impl ModelEntry {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn expected_latency_s(&self) -> f64 {
        self.expected_latency_s
    }
}

/// A (connect, read) timeout pair for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTimeout {
    connect: Duration,
    read: Duration,
}

impl TierTimeout {
    /// Build a timeout pair with a validated read timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the read timeout is zero or exceeds 600 seconds.
    /// The upper bound keeps pathological overrides (`u64::MAX` and friends)
    /// out of timeout arithmetic.
    pub fn new(read_seconds: u64) -> AppResult<Self> {
        if read_seconds == 0 {
            return Err(AppError::Config(
                "tier read timeout must be greater than 0".to_string(),
            ));
        }
        if read_seconds > 600 {
            return Err(AppError::Config(format!(
                "tier read timeout cannot exceed 600 seconds, got {read_seconds}"
            )));
        }
        Ok(Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(read_seconds),
        })
    }

    pub fn connect(&self) -> Duration {
        self.connect
    }

    pub fn read(&self) -> Duration {
        self.read
    }
}

/// Default deep-trigger keywords for the complexity classifier.
///
/// Any case-insensitive substring match forces T3 regardless of length.
const DEEP_KEYWORDS: &[&str] = &[
    "compare",
    "analyze",
    "tradeoffs",
    "architecture",
    "design",
    "research",
    "explain in detail",
    "step by step",
    "why",
    "how does",
    "evaluate",
    "pros and cons",
    "difference between",
];

/// Central configuration: endpoints, registered models, per-tier timeouts and
/// classification thresholds.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    primary: Arc<Endpoint>,
    secondary: Option<Arc<Endpoint>>,
    knowledge_url: Option<String>,
    timeout_fast: TierTimeout,
    timeout_power: TierTimeout,
    timeout_deep: TierTimeout,
    models: Vec<ModelEntry>,
    t1_max_words: usize,
    t2_max_words: usize,
    deep_keywords: Vec<String>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            primary: Arc::new(Endpoint::new("http://localhost:4000", "sk-default", "primary")),
            secondary: None,
            knowledge_url: None,
            timeout_fast: TierTimeout {
                connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
                read: Duration::from_secs(30),
            },
            timeout_power: TierTimeout {
                connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
                read: Duration::from_secs(60),
            },
            timeout_deep: TierTimeout {
                connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
                read: Duration::from_secs(120),
            },
            models: Vec::new(),
            t1_max_words: 20,
            t2_max_words: 60,
            deep_keywords: DEEP_KEYWORDS.iter().map(|kw| kw.to_string()).collect(),
        }
    }
}

impl SwarmConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `from_env` delegates here with `std::env::var`; tests supply closures
    /// so they stay hermetic.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("SWARM_PRIMARY_URL") {
            let key = lookup("SWARM_PRIMARY_KEY").unwrap_or_else(|| "sk-default".to_string());
            config.primary = Arc::new(Endpoint::new(url, key, "primary"));
        } else if let Some(key) = lookup("SWARM_PRIMARY_KEY") {
            config.primary = Arc::new(Endpoint::new("http://localhost:4000", key, "primary"));
        }

        match (lookup("SWARM_SECONDARY_URL"), lookup("SWARM_SECONDARY_KEY")) {
            (Some(url), Some(key)) => {
                config.secondary = Some(Arc::new(Endpoint::new(url, key, "secondary")));
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "SWARM_SECONDARY_URL and SWARM_SECONDARY_KEY must both be set; \
                    ignoring partial secondary endpoint configuration"
                );
            }
            (None, None) => {}
        }

        config.knowledge_url = lookup("SWARM_KNOWLEDGE_URL");

        for (key, slot) in [
            ("SWARM_TIMEOUT_FAST", &mut config.timeout_fast),
            ("SWARM_TIMEOUT_POWER", &mut config.timeout_power),
            ("SWARM_TIMEOUT_DEEP", &mut config.timeout_deep),
        ] {
            if let Some(raw) = lookup(key) {
                let seconds: u64 = raw.parse().map_err(|_| {
                    AppError::Config(format!("{key} must be a whole number of seconds, got '{raw}'"))
                })?;
                *slot = TierTimeout::new(seconds).map_err(|_| {
                    AppError::Config(format!(
                        "{key} must be between 1 and 600 seconds, got {seconds}"
                    ))
                })?;
            }
        }

        Ok(config)
    }

    /// Register a fallback `default` model on the primary endpoint when a real
    /// key was configured and nothing else has been registered yet.
    pub fn with_default_model(mut self) -> Self {
        if self.models.is_empty() && self.primary.api_key() != "sk-default" {
            self.add_model("default", Tier::Fast, None, 5.0);
        }
        self
    }

    /// Register a model. Chainable; only valid during setup.
    pub fn add_model(
        &mut self,
        model_id: impl Into<String>,
        tier: Tier,
        endpoint: Option<Arc<Endpoint>>,
        expected_latency_s: f64,
    ) -> &mut Self {
        let endpoint = endpoint.unwrap_or_else(|| self.primary.clone());
        self.models.push(ModelEntry {
            model_id: model_id.into(),
            tier,
            endpoint,
            expected_latency_s,
        });
        self
    }

    pub fn primary(&self) -> &Arc<Endpoint> {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Arc<Endpoint>> {
        self.secondary.as_ref()
    }

    pub fn knowledge_url(&self) -> Option<&str> {
        self.knowledge_url.as_deref()
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    /// Models of one tier, in registration (priority) order.
    pub fn tier_models(&self, tier: Tier) -> Vec<&ModelEntry> {
        self.models.iter().filter(|m| m.tier == tier).collect()
    }

    pub fn tier_timeout(&self, tier: Tier) -> TierTimeout {
        match tier {
            Tier::Fast => self.timeout_fast,
            Tier::Power => self.timeout_power,
            Tier::Deep => self.timeout_deep,
        }
    }

    pub fn t1_max_words(&self) -> usize {
        self.t1_max_words
    }

    pub fn t2_max_words(&self) -> usize {
        self.t2_max_words
    }

    pub fn deep_keywords(&self) -> &[String] {
        &self.deep_keywords
    }

    /// Override the classification thresholds (setup only).
    pub fn set_thresholds(&mut self, t1_max_words: usize, t2_max_words: usize) -> &mut Self {
        self.t1_max_words = t1_max_words;
        self.t2_max_words = t2_max_words;
        self
    }
}
