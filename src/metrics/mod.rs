// metrics/mod.rs
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const COMMANDS_TOTAL: &str = "lamp_commands_total";
pub const DRIVER_ERRORS_TOTAL: &str = "lamp_driver_errors_total";
pub const BUS_CLIENTS: &str = "lamp_bus_clients";

pub fn setup_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to setup metrics: {}", e))
}

pub fn record_command(outcome: &'static str) {
    counter!(COMMANDS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_driver_error() {
    counter!(DRIVER_ERRORS_TOTAL).increment(1);
}

pub fn set_bus_clients(count: usize) {
    gauge!(BUS_CLIENTS).set(count as f64);
}
