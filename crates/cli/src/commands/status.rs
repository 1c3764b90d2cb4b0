//! Health and readiness of a running server

use anyhow::{bail, Result};
use colored::Colorize;
use diagnosis_lib::{HealthResponse, ReadinessResponse};
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_timestamp, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

#[derive(Serialize)]
struct StatusReport {
    health: HealthResponse,
    readiness: ReadinessResponse,
}

/// Query `/healthz` and `/readyz` and print both.
///
/// Fails when either probe answers 503, so scripts can rely on the exit code.
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health_probe = client.probe::<HealthResponse>("healthz").await?;
    let readiness_probe = client.probe::<ReadinessResponse>("readyz").await?;
    let serving = health_probe.ok && readiness_probe.ok;
    let health = health_probe.body;
    let readiness = readiness_probe.body;

    match format {
        OutputFormat::Json => print_json(&StatusReport { health, readiness })?,
        OutputFormat::Table => {
            println!("{}", "Diagnosis Server Status".bold());
            println!("{}", "=".repeat(40));
            println!("Overall: {}", color_status(health.status));
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(component.status),
                    message: component.message.clone().unwrap_or_else(|| "-".to_string()),
                    last_check: format_timestamp(component.last_check_timestamp),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows);
            println!();

            if readiness.ready {
                print_success("Server is ready");
            } else {
                print_warning(&format!(
                    "Server is not ready: {}",
                    readiness.reason.as_deref().unwrap_or("unknown reason")
                ));
            }
        }
    }

    if !serving {
        bail!("diagnosis server is not serving requests");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTHY: &str = r#"{"status":"healthy","components":{"classifier":{"status":"healthy","last_check_timestamp":1700000000}}}"#;

    async fn mock_probes(server: &mut mockito::Server, ready_status: usize, ready_body: &str) {
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(HEALTHY)
            .create_async()
            .await;
        server
            .mock("GET", "/readyz")
            .with_status(ready_status)
            .with_header("content-type", "application/json")
            .with_body(ready_body)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_status_succeeds_when_ready() {
        let mut server = mockito::Server::new_async().await;
        mock_probes(&mut server, 200, r#"{"ready":true}"#).await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(show_status(&client, OutputFormat::Table).await.is_ok());
    }

    #[tokio::test]
    async fn test_status_fails_when_not_ready() {
        let mut server = mockito::Server::new_async().await;
        mock_probes(&mut server, 503, r#"{"ready":false,"reason":"starting"}"#).await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = show_status(&client, OutputFormat::Json).await.unwrap_err();
        assert!(err.to_string().contains("not serving"));
    }
}
