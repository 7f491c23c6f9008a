//! Local node container status
//!
//! Reports how long the node container has been running. The runtime backend
//! is a narrow trait (start timestamp for a named container) so the Docker
//! CLI can be swapped for another engine without touching the reporting
//! logic. Each query is a one-shot subprocess invocation.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to invoke container runtime: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0}")]
    Runtime(String),
}

/// Start-timestamp lookup for a named container.
///
/// `Ok` carries the raw timestamp string from the runtime; an empty string
/// means the container exists but is not running.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn started_at(&self, name: &str) -> Result<String, ContainerError>;
}

/// Docker CLI backend (`docker inspect --format {{.State.StartedAt}}`)
#[derive(Debug, Default)]
pub struct DockerRuntime;

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn started_at(&self, name: &str) -> Result<String, ContainerError> {
        let output = Command::new("docker")
            .args(["inspect", "--format", "{{.State.StartedAt}}", name])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ContainerError::Runtime(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Renders the elapsed-run-time report for one fixed container
pub struct ContainerReporter {
    runtime: Box<dyn ContainerRuntime>,
    name: String,
}

impl ContainerReporter {
    pub fn new(runtime: Box<dyn ContainerRuntime>, name: impl Into<String>) -> Self {
        Self {
            runtime,
            name: name.into(),
        }
    }

    /// Query the runtime and render the report. Failures surface as text,
    /// never as an error.
    pub async fn report(&self) -> String {
        match self.runtime.started_at(&self.name).await {
            Ok(raw) if raw.is_empty() => {
                format!("Container '{}' is not running.", self.name)
            }
            Ok(raw) => match parse_started_at(&raw) {
                Ok(start) => format!(
                    "Container '{}' has been running for: {}.",
                    self.name,
                    format_elapsed(start, Utc::now().naive_utc())
                ),
                Err(e) => format!("Error fetching container status: {}", e),
            },
            Err(e) => format!("Error fetching container status: {}", e),
        }
    }
}

/// Parse the runtime's start timestamp. Docker emits RFC 3339 with
/// nanosecond precision; the fraction and zone suffix are dropped before
/// parsing.
fn parse_started_at(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let truncated = raw.split('.').next().unwrap_or(raw);
    let truncated = truncated.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(truncated, "%Y-%m-%dT%H:%M:%S")
}

/// Decompose `now - start` into days/hours/minutes/seconds. A start in the
/// future clamps to zero.
fn format_elapsed(start: NaiveDateTime, now: NaiveDateTime) -> String {
    let total = now.signed_duration_since(start).num_seconds().max(0);
    let days = total / 86_400;
    let mut rem = total % 86_400;
    let hours = rem / 3_600;
    rem %= 3_600;
    let minutes = rem / 60;
    let seconds = rem % 60;

    format!(
        "{} days, {} hours, {} minutes, and {} seconds",
        days, hours, minutes, seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRuntime {
        result: Result<String, ContainerError>,
    }

    impl FakeRuntime {
        fn ok(s: &str) -> Box<Self> {
            Box::new(Self {
                result: Ok(s.to_string()),
            })
        }

        fn err(msg: &str) -> Box<Self> {
            Box::new(Self {
                result: Err(ContainerError::Runtime(msg.to_string())),
            })
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn started_at(&self, _name: &str) -> Result<String, ContainerError> {
            match &self.result {
                Ok(s) => Ok(s.clone()),
                Err(ContainerError::Runtime(msg)) => Err(ContainerError::Runtime(msg.clone())),
                Err(_) => unreachable!(),
            }
        }
    }

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn elapsed_decomposes_into_units() {
        let start = naive("2024-01-01T00:00:00");
        let now = naive("2024-01-02T01:02:03");
        assert_eq!(
            format_elapsed(start, now),
            "1 days, 1 hours, 2 minutes, and 3 seconds"
        );
    }

    #[test]
    fn elapsed_clamps_future_start_to_zero() {
        let start = naive("2024-01-02T00:00:00");
        let now = naive("2024-01-01T00:00:00");
        assert_eq!(
            format_elapsed(start, now),
            "0 days, 0 hours, 0 minutes, and 0 seconds"
        );
    }

    #[test]
    fn parses_docker_timestamp_with_nanos() {
        let start = parse_started_at("2024-01-01T00:00:00.123456789Z").unwrap();
        assert_eq!(start, naive("2024-01-01T00:00:00"));
    }

    #[test]
    fn parses_timestamp_without_fraction() {
        let start = parse_started_at("2024-01-01T12:30:00Z").unwrap();
        assert_eq!(start, naive("2024-01-01T12:30:00"));
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        assert!(parse_started_at("yesterday-ish").is_err());
    }

    #[tokio::test]
    async fn running_container_reports_elapsed_sentence() {
        let reporter = ContainerReporter::new(
            FakeRuntime::ok("2024-01-01T00:00:00.123456789Z"),
            "sophon-light-node",
        );
        let report = reporter.report().await;
        assert!(report.starts_with("Container 'sophon-light-node' has been running for:"));
        assert!(report.contains("days"));
        assert!(report.ends_with("seconds."));
    }

    #[tokio::test]
    async fn empty_start_time_means_not_running() {
        let reporter = ContainerReporter::new(FakeRuntime::ok(""), "sophon-light-node");
        assert_eq!(
            reporter.report().await,
            "Container 'sophon-light-node' is not running."
        );
    }

    #[tokio::test]
    async fn runtime_failure_embeds_stderr() {
        let reporter = ContainerReporter::new(
            FakeRuntime::err("Error: No such object: sophon-light-node"),
            "sophon-light-node",
        );
        let report = reporter.report().await;
        assert!(report.starts_with("Error fetching container status:"));
        assert!(report.contains("No such object"));
    }

    #[tokio::test]
    async fn bad_timestamp_surfaces_as_text() {
        let reporter = ContainerReporter::new(FakeRuntime::ok("not-a-date"), "sophon-light-node");
        let report = reporter.report().await;
        assert!(report.starts_with("Error fetching container status:"));
    }
}
