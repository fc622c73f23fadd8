use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business metrics
    pub static ref ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_total",
        "Total number of quiz attempts",
        &["event"]
    )
    .unwrap();

    pub static ref RESPONSES_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "responses_recorded_total",
        "Total number of recorded learner responses",
        &["kind"]
    )
    .unwrap();

    pub static ref REORDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "question_reorders_total",
        "Total number of question sequence rewrites",
        &["operation"]
    )
    .unwrap();
}

pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_exposes_registered_counters() {
        ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();
        let output = render_metrics().unwrap();
        assert!(output.contains("quiz_attempts_total"));
    }
}
