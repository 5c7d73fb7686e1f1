// Copyright 2026 stubd Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::snapshot::{EndpointMetrics, MetricsSnapshot};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

#[derive(Debug, Default, Clone)]
struct EndpointStats {
    calls: u64,
    failures: u64,
    total_latency_us: u64,
    max_latency_us: u64,
}

/// Collects per-endpoint call statistics.
///
/// Recording happens on the request path after each envelope is produced;
/// snapshots are taken by the status handler.
pub struct MetricsCollector {
    started: Instant,
    endpoints: RwLock<HashMap<String, EndpointStats>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Records one call with its outcome and latency.
    ///
    /// # Arguments
    /// * `endpoint` - Endpoint label, e.g. `"put/scenario"`
    /// * `start_time` - When the call began, for latency calculation
    /// * `success` - `false` when the call produced a failure envelope
    pub fn record_call(&self, endpoint: &str, start_time: Instant, success: bool) {
        let latency_us = start_time.elapsed().as_micros() as u64;
        let Ok(mut endpoints) = self.endpoints.write() else {
            return;
        };
        let stats = endpoints.entry(endpoint.to_string()).or_default();
        stats.calls += 1;
        if !success {
            stats.failures += 1;
        }
        stats.total_latency_us += latency_us;
        stats.max_latency_us = stats.max_latency_us.max(latency_us);
    }

    /// Takes a point-in-time snapshot of all collected metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let endpoints = self
            .endpoints
            .read()
            .map(|endpoints| {
                endpoints
                    .iter()
                    .map(|(name, stats)| {
                        (
                            name.clone(),
                            EndpointMetrics {
                                calls: stats.calls,
                                failures: stats.failures,
                                avg_latency_us: if stats.calls > 0 {
                                    stats.total_latency_us / stats.calls
                                } else {
                                    0
                                },
                                max_latency_us: stats.max_latency_us,
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            uptime_ms: self.started.elapsed().as_millis() as u64,
            endpoints,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_collector_is_empty() {
        let collector = MetricsCollector::new();
        assert!(collector.snapshot().endpoints.is_empty());
    }

    #[test]
    fn test_record_call_counts_successes_and_failures() {
        let collector = MetricsCollector::new();
        let start = Instant::now();
        collector.record_call("put/scenario", start, true);
        collector.record_call("put/scenario", start, false);
        collector.record_call("get/status", start, true);

        let snapshot = collector.snapshot();
        let scenario = &snapshot.endpoints["put/scenario"];
        assert_eq!(scenario.calls, 2);
        assert_eq!(scenario.failures, 1);
        assert_eq!(snapshot.endpoints["get/status"].calls, 1);
    }

    #[test]
    fn test_latency_aggregates() {
        let collector = MetricsCollector::new();
        let start = Instant::now();
        collector.record_call("get/response", start, true);
        let snapshot = collector.snapshot();
        let stats = &snapshot.endpoints["get/response"];
        assert!(stats.max_latency_us >= stats.avg_latency_us);
    }
}
