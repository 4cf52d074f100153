//! Metric names emitted through the `metrics` facade.

/// Counter, labelled with `check` and `outcome` (`pass`/`fail`).
pub const CHECKS: &str = "surge_checks";

/// Counter of completed iterations.
pub const ITERATIONS: &str = "surge_iterations";

/// Counter of issued requests.
pub const HTTP_REQS: &str = "surge_http_reqs";

/// Counter of requests which failed at the transport level.
pub const HTTP_REQ_FAILED: &str = "surge_http_req_failed";

/// Histogram of request latency, in seconds.
pub const HTTP_REQ_DURATION: &str = "surge_http_req_duration";

/// Gauge of running VUs.
pub const VUS: &str = "surge_vus";

/// Value of the `outcome` label on [`CHECKS`].
pub fn check_outcome(passed: bool) -> &'static str {
    if passed {
        "pass"
    } else {
        "fail"
    }
}
