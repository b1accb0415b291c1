// SPDX-License-Identifier: Apache-2.0

//! Per-route request counters and latency percentiles, rendered as plain
//! text for `/metrics`.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

const LATENCY_WINDOW: usize = 1024;

#[derive(Debug, Default)]
struct RouteMetric {
    hits: u64,
    errors: u64,
    latency_us: Vec<u64>,
}

#[derive(Debug, Default)]
pub struct RequestMetrics {
    routes: Mutex<BTreeMap<String, RouteMetric>>,
}

fn percentile_us(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

impl RequestMetrics {
    pub fn record(&self, route: &str, status: u16, elapsed: Duration) {
        let Ok(mut routes) = self.routes.lock() else {
            return;
        };
        let metric = routes.entry(route.to_string()).or_default();
        metric.hits += 1;
        if status >= 500 {
            metric.errors += 1;
        }
        if metric.latency_us.len() == LATENCY_WINDOW {
            metric.latency_us.remove(0);
        }
        metric.latency_us
            .push(elapsed.as_micros().min(u128::from(u64::MAX)) as u64);
    }

    /// Prometheus-style exposition, one family per counter.
    #[must_use]
    pub fn render(&self) -> String {
        let version = env!("CARGO_PKG_VERSION");
        let mut body = String::new();
        let Ok(routes) = self.routes.lock() else {
            return body;
        };
        for (route, metric) in routes.iter() {
            body.push_str(&format!(
                "timebank_requests_total{{route=\"{route}\",version=\"{version}\"}} {}\n",
                metric.hits
            ));
            body.push_str(&format!(
                "timebank_request_errors_total{{route=\"{route}\",version=\"{version}\"}} {}\n",
                metric.errors
            ));
            for (label, pct) in [("p50", 0.50), ("p95", 0.95), ("p99", 0.99)] {
                body.push_str(&format!(
                    "timebank_request_latency_us{{route=\"{route}\",quantile=\"{label}\",version=\"{version}\"}} {}\n",
                    percentile_us(&metric.latency_us, pct)
                ));
            }
        }
        body
    }
}
