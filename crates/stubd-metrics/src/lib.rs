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

//! stubd Metrics
//!
//! Per-endpoint call statistics backing the `get/status` surface: request
//! counts, failure counts, and latency aggregates, with a serializable
//! snapshot.
//!
//! # Example
//!
//! ```
//! use stubd_metrics::MetricsCollector;
//! use std::time::Instant;
//!
//! let collector = MetricsCollector::new();
//! let start = Instant::now();
//! // ... handle the request ...
//! collector.record_call("put/scenario", start, true);
//!
//! let snapshot = collector.snapshot();
//! assert_eq!(snapshot.endpoints["put/scenario"].calls, 1);
//! ```

mod collector;
mod snapshot;

pub use collector::MetricsCollector;
pub use snapshot::{EndpointMetrics, MetricsSnapshot};
