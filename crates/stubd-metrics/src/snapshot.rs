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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregated statistics for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointMetrics {
    /// Total calls recorded
    pub calls: u64,
    /// Calls that produced a failure envelope
    pub failures: u64,
    /// Mean latency across all calls, microseconds
    pub avg_latency_us: u64,
    /// Largest observed latency, microseconds
    pub max_latency_us: u64,
}

/// Point-in-time view of all collected metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Milliseconds since the collector was created
    pub uptime_ms: u64,
    /// Per-endpoint statistics, keyed by endpoint label
    pub endpoints: HashMap<String, EndpointMetrics>,
}
