// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const LEDGER_CALLS: &str = "dapp_ledger_calls_total";
pub const LEDGER_CALL_DURATION: &str = "dapp_ledger_call_duration_seconds";
pub const DEPLOYMENTS: &str = "dapp_deployments_total";
pub const EXECUTIONS: &str = "dapp_executions_total";
pub const CALLBACKS: &str = "dapp_callbacks_total";
pub const SANDBOX_INVOCATIONS: &str = "dapp_sandbox_invocations_total";
pub const STORE_APPENDS: &str = "dapp_store_appends_total";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dapp_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }

    metrics::describe_counter!(LEDGER_CALLS, "Ledger REST calls by endpoint and outcome");
    metrics::describe_histogram!(LEDGER_CALL_DURATION, "Ledger REST call latency");
    metrics::describe_counter!(DEPLOYMENTS, "Deployment pipelines by outcome");
    metrics::describe_counter!(EXECUTIONS, "Execution pipelines by outcome");
    metrics::describe_counter!(CALLBACKS, "Callback notifications by outcome");
    metrics::describe_counter!(SANDBOX_INVOCATIONS, "Contract module invocations by outcome");
    metrics::describe_counter!(STORE_APPENDS, "Side-effect records appended by category");

    metrics::gauge!("dapp_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
