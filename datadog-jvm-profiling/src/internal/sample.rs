// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;

/// One aggregated observation. The trace multiset is the aggregation;
/// samples are appended in arrival order and never merged here.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Sample {
    /// The leaf frame is at locations\[0\].
    pub locations: Vec<LocationId>,
    pub count: i64,
    pub weight: i64,
    /// Caller classification; zero means untagged and emits no label.
    pub attr: i64,
}
