use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_enrollment(outcome: &'static str) {
    metrics::counter!("enrollment_attempts_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_login(outcome: &'static str) {
    metrics::counter!("login_attempts_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_submission_upload(size_bytes: i64) {
    metrics::counter!("submission_uploads_total").increment(1);
    metrics::histogram!("submission_upload_bytes").record(size_bytes as f64);
}

pub(crate) fn record_contact(outcome: &'static str) {
    metrics::counter!("contact_requests_total", "outcome" => outcome).increment(1);
}
