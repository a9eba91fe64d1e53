//! Service health monitoring
//!
//! Tracks live up/down status for the configured backend services. A refresh
//! probes every registered target concurrently under one overall deadline and
//! writes the results back atomically; consumers only ever read a
//! point-in-time snapshot, so staleness between refresh and use is tolerated.

use crate::config::SwarmConfig;
use crate::error::{AppError, AppResult};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Per-probe connect timeout.
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-probe read timeout.
const PROBE_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall deadline for one refresh pass. Probes that miss it keep their
/// previous status.
const REFRESH_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct ProbeTarget {
    name: String,
    url: String,
    bearer: Option<String>,
}

/// Tracks live availability of registered service endpoints.
///
/// Registration happens during setup (builder-style); the status map is the
/// only state mutated afterwards, always under the lock and always as a full
/// writeback of one refresh pass.
pub struct HealthMonitor {
    targets: Vec<ProbeTarget>,
    status: RwLock<HashMap<String, bool>>,
    http: reqwest::Client,
}

impl HealthMonitor {
    /// Create an empty monitor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the probe HTTP client cannot be built.
    pub fn new() -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(PROBE_CONNECT_TIMEOUT)
            .timeout(PROBE_READ_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build probe client: {e}")))?;

        Ok(Self {
            targets: Vec::new(),
            status: RwLock::new(HashMap::new()),
            http,
        })
    }

    /// Register a service for health checking. Services start as down until
    /// the first refresh observes them.
    pub fn register(
        mut self,
        name: impl Into<String>,
        url: impl Into<String>,
        bearer: Option<String>,
    ) -> Self {
        let name = name.into();
        self.status.get_mut().insert(name.clone(), false);
        self.targets.push(ProbeTarget {
            name,
            url: url.into(),
            bearer,
        });
        self
    }

    /// Build a monitor covering everything the config knows about: the
    /// primary and (if configured) secondary LLM endpoints via their
    /// `/health/liveliness` routes, and the knowledge store via its root.
    pub fn for_config(config: &SwarmConfig) -> AppResult<Self> {
        let primary = config.primary();
        let mut monitor = Self::new()?.register(
            primary.name(),
            format!("{}/health/liveliness", primary.url().trim_end_matches('/')),
            Some(primary.api_key().to_string()),
        );

        if let Some(secondary) = config.secondary() {
            monitor = monitor.register(
                secondary.name(),
                format!("{}/health/liveliness", secondary.url().trim_end_matches('/')),
                Some(secondary.api_key().to_string()),
            );
        }

        if let Some(knowledge_url) = config.knowledge_url() {
            // The store root answers unauthenticated; drop the API suffix
            let base = knowledge_url.replace("/api/v1", "");
            let base = base.trim_end_matches('/');
            monitor = monitor.register("knowledge", format!("{base}/"), None);
        }

        Ok(monitor)
    }

    /// Probe all registered services concurrently and return the refreshed
    /// status snapshot.
    ///
    /// Any HTTP status below 400 counts as up; errors and 4xx/5xx count as
    /// down. The pass is bounded by a 10 second deadline; targets whose probe
    /// has not completed by then are left at their previous status.
    pub async fn refresh(&self) -> HashMap<String, bool> {
        let deadline = tokio::time::Instant::now() + REFRESH_DEADLINE;

        let mut probes: FuturesUnordered<_> = self
            .targets
            .iter()
            .map(|target| async move {
                let mut request = self.http.get(&target.url);
                if let Some(token) = &target.bearer {
                    request = request.bearer_auth(token);
                }
                let up = match request.send().await {
                    Ok(response) => response.status().as_u16() < 400,
                    Err(e) => {
                        tracing::debug!(service = %target.name, error = %e, "health probe failed");
                        false
                    }
                };
                (target.name.clone(), up)
            })
            .collect();

        let mut fresh = Vec::with_capacity(self.targets.len());
        loop {
            match tokio::time::timeout_at(deadline, probes.next()).await {
                Ok(Some(result)) => fresh.push(result),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        completed = fresh.len(),
                        registered = self.targets.len(),
                        "health refresh deadline lapsed, keeping stale status for remaining probes"
                    );
                    break;
                }
            }
        }

        let mut status = self.status.write().await;
        for (name, up) in fresh {
            if let Some(previous) = status.insert(name.clone(), up) {
                if previous != up {
                    tracing::info!(service = %name, up, "service health changed");
                }
            }
        }
        status.clone()
    }

    /// Current status of one service. Unknown services count as down.
    pub async fn is_up(&self, service: &str) -> bool {
        self.status.read().await.get(service).copied().unwrap_or(false)
    }

    /// Point-in-time copy of all statuses.
    pub async fn snapshot(&self) -> HashMap<String, bool> {
        self.status.read().await.clone()
    }
}
