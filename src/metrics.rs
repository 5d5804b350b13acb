//! Prometheus metrics and tracing span helpers.
//!
//! Metrics live in a dedicated registry (not the process-global one) so the
//! `/metrics` endpoint only exposes what this crate records.

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<StockroomMetrics> = Lazy::new(StockroomMetrics::init);

#[cfg(feature = "metrics")]
pub struct StockroomMetrics {
    pub registry: Registry,
    pub queries_total: IntCounter,
    pub query_errors_total: IntCounter,
    pub query_duration: Histogram,
    pub http_responses_total: IntCounterVec,
}

#[cfg(feature = "metrics")]
impl StockroomMetrics {
    pub fn init() -> Self {
        let registry = Registry::new_custom(Some("stockroom".to_string()), None)
            .expect("valid registry prefix");

        let queries_total = IntCounter::new("queries_total", "Total queries executed")
            .expect("valid counter");
        let query_errors_total =
            IntCounter::new("query_errors_total", "Queries that returned an error")
                .expect("valid counter");
        let query_duration = Histogram::with_opts(HistogramOpts::new(
            "query_duration_seconds",
            "Duration of queries",
        ))
        .expect("valid histogram");
        let http_responses_total = IntCounterVec::new(
            Opts::new("http_responses_total", "HTTP responses by route and status"),
            &["method", "route", "status"],
        )
        .expect("valid counter vec");

        for collector in [
            Box::new(queries_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(query_errors_total.clone()),
            Box::new(query_duration.clone()),
            Box::new(http_responses_total.clone()),
        ] {
            registry.register(collector).expect("unique metric name");
        }

        Self {
            registry,
            queries_total,
            query_errors_total,
            query_duration,
            http_responses_total,
        }
    }

    pub fn record_query(&self, elapsed: std::time::Duration) {
        self.queries_total.inc();
        self.query_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.inc();
    }

    pub fn record_response(&self, method: &str, route: &str, status: u16) {
        self.http_responses_total
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn acquire_connection_span() -> Span {
        info_span!("stockroom.acquire_connection")
    }

    pub fn execute_query_span(query: &str) -> Span {
        let statement = query.split_whitespace().next().unwrap_or("");
        info_span!("stockroom.execute_query", statement = %statement)
    }

    pub fn handle_request_span(method: &str, path: &str) -> Span {
        info_span!("stockroom.http_request", method = %method, path = %path)
    }

    pub fn migration_span(version: i64) -> Span {
        info_span!("stockroom.migration", version)
    }
}
