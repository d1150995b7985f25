use std::sync::OnceLock;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once per process and register the ledger
/// metrics. Later calls return the same handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!("A global metrics recorder is already installed");
            }

            // Pre-register counters so they appear even before the first increment.
            counter!("investments_recorded_total").absolute(0);
            counter!("investments_cancelled_total").absolute(0);
            counter!("supply_reservations_rejected_total").absolute(0);
            counter!("orders_placed_total", "side" => "buy").absolute(0);
            counter!("orders_placed_total", "side" => "sell").absolute(0);
            counter!("orders_cancelled_total").absolute(0);
            counter!("orders_expired_total").absolute(0);
            counter!("order_fills_total").absolute(0);
            counter!("order_fills_skipped_total").absolute(0);
            counter!("dividends_distributed_total").absolute(0);
            counter!("rate_limited_requests_total").absolute(0);

            histogram!("order_match_seconds").record(0.0);

            handle
        })
        .clone()
}
