/// Health probing for the application's status endpoints
///
/// Three fixed local endpoints are consumed: /api/health, /api/ready,
/// and /api/metrics. Every probe failure mode (refused, timeout,
/// non-200, malformed body) collapses to "not currently healthy".

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::utils::{
    format_bytes, format_duration, now_display, HEALTH_WAIT_ATTEMPTS,
    HEALTH_WAIT_INTERVAL_SECS, PROBE_TIMEOUT_SECS,
};

/// Self-reported state from one successful /api/health probe
#[derive(Debug, Clone, Deserialize)]
pub struct HealthSnapshot {
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default)]
    pub uptime: f64,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

/// Self-reported state from /api/ready; extra fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct ReadySnapshot {
    #[serde(default = "unknown_status")]
    pub database: String,
}

/// Result of one pass through the bounded polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub healthy: bool,
    pub attempts: u32,
}

/// Probe up to `max_attempts` times with a fixed sleep between attempts.
/// Returns on the first success; exhaustion is terminal.
pub async fn poll_until<'a, F>(mut probe: F, max_attempts: u32, interval: Duration) -> PollOutcome
where
    F: FnMut() -> BoxFuture<'a, bool>,
{
    for attempt in 1..=max_attempts {
        if probe().await {
            return PollOutcome {
                healthy: true,
                attempts: attempt,
            };
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    PollOutcome {
        healthy: false,
        attempts: max_attempts,
    }
}

pub struct HealthMonitor {
    client: reqwest::Client,
    base_url: String,
    wait_attempts: u32,
    wait_interval: Duration,
}

impl HealthMonitor {
    pub fn new(port: u16) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: format!("http://localhost:{}", port),
            wait_attempts: HEALTH_WAIT_ATTEMPTS,
            wait_interval: Duration::from_secs(HEALTH_WAIT_INTERVAL_SECS),
        }
    }

    /// Override the health-wait budget (mainly for tests)
    pub fn with_wait(mut self, attempts: u32, interval: Duration) -> Self {
        self.wait_attempts = attempts;
        self.wait_interval = interval;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }

    pub async fn check_health(&self) -> Option<HealthSnapshot> {
        self.get_json("/api/health").await
    }

    pub async fn check_ready(&self) -> Option<ReadySnapshot> {
        self.get_json("/api/ready").await
    }

    pub async fn check_metrics(&self) -> Option<Value> {
        self.get_json("/api/metrics").await
    }

    /// Block until the application answers a health probe, or the
    /// attempt budget runs out
    pub async fn wait_for_health(&self) -> bool {
        println!("Waiting for application to be ready...");

        let max_attempts = self.wait_attempts;
        let mut attempt = 0u32;
        let outcome = poll_until(
            || {
                attempt += 1;
                let n = attempt;
                self.check_health()
                    .map(move |h| {
                        if h.is_none() {
                            println!("   Attempt {}/{}...", n, max_attempts);
                        }
                        h.is_some()
                    })
                    .boxed()
            },
            max_attempts,
            self.wait_interval,
        )
        .await;

        if outcome.healthy {
            println!("Application is healthy!");
        } else {
            println!("Application did not become healthy");
        }

        outcome.healthy
    }

    /// Heartbeat printer: probe health and metrics every `interval`
    /// seconds until Ctrl+C. Not an alerting system.
    pub async fn monitor(&self, interval: u64) -> Result<()> {
        println!("Monitoring application (interval: {}s)", interval);
        println!("Press Ctrl+C to stop\n");

        loop {
            let timestamp = now_display();
            let health = self.check_health().await;
            let metrics = self.check_metrics().await;

            match health {
                Some(snapshot) => {
                    let memory = memory_display(metrics.as_ref());
                    println!(
                        "[{}] ✓ Health: OK | Memory: {} | Uptime: {}",
                        timestamp,
                        memory,
                        format_duration(snapshot.uptime as u64)
                    );
                }
                None => println!("[{}] ✗ Health: FAIL", timestamp),
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
                _ = tokio::signal::ctrl_c() => {
                    println!("\nStopped monitoring");
                    return Ok(());
                }
            }
        }
    }
}

/// Memory-used figure from a metrics body, if one is present
fn memory_display(metrics: Option<&Value>) -> String {
    match metrics.and_then(|m| m.pointer("/memory/used")) {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(format_bytes)
            .unwrap_or_else(|| n.to_string()),
        Some(Value::String(s)) => s.clone(),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_poll_until_reports_success_on_first_healthy_probe() {
        let calls = AtomicU32::new(0);

        let outcome = poll_until(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { n == 3 }.boxed()
            },
            3,
            Duration::ZERO,
        )
        .await;

        assert_eq!(outcome, PollOutcome { healthy: true, attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_exhaustion_is_terminal() {
        let calls = AtomicU32::new(0);

        let outcome = poll_until(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { false }.boxed()
            },
            3,
            Duration::ZERO,
        )
        .await;

        assert_eq!(outcome, PollOutcome { healthy: false, attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_stops_probing_after_success() {
        let calls = AtomicU32::new(0);

        let outcome = poll_until(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { true }.boxed()
            },
            30,
            Duration::from_secs(3600),
        )
        .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unhealthy() {
        // Port 1 is never serving HTTP
        let monitor = HealthMonitor::new(1);
        assert!(monitor.check_health().await.is_none());
        assert!(monitor.check_ready().await.is_none());
        assert!(monitor.check_metrics().await.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_health_exhausts_budget() {
        let monitor = HealthMonitor::new(1).with_wait(2, Duration::ZERO);
        assert!(!monitor.wait_for_health().await);
    }

    #[test]
    fn test_health_snapshot_tolerates_partial_bodies() {
        let snapshot: HealthSnapshot = serde_json::from_value(json!({"uptime": 12.5})).unwrap();
        assert_eq!(snapshot.status, "unknown");
        assert_eq!(snapshot.uptime, 12.5);

        let snapshot: HealthSnapshot =
            serde_json::from_value(json!({"status": "ok", "uptime": 3700})).unwrap();
        assert_eq!(snapshot.status, "ok");
    }

    #[test]
    fn test_memory_display() {
        let metrics = json!({"memory": {"used": 1048576, "total": 4194304}});
        assert_eq!(memory_display(Some(&metrics)), "1.00 MB");

        let metrics = json!({"memory": {"used": "52 MB"}});
        assert_eq!(memory_display(Some(&metrics)), "52 MB");

        assert_eq!(memory_display(None), "N/A");
        assert_eq!(memory_display(Some(&json!({}))), "N/A");
    }
}
