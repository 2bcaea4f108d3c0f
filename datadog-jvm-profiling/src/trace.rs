// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The aggregated form in which the sampler hands a collection window to
//! the encoder: a multiset of stacks, innermost frame first.

use crate::collections::identifiable::FxIndexMap;

/// One stack entry as delivered by the sampler.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum RawFrame {
    /// An address with no line-level debug info.
    Native { address: u64 },
    /// A frame in runtime-managed code: the method id the runtime assigned
    /// at load time plus the bytecode index of the call site.
    Managed { method_id: u64, bci: i32 },
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Trace {
    /// Innermost frame first.
    pub frames: Vec<RawFrame>,
    /// Caller-supplied classification, e.g. a thread-state string id from
    /// the vocabulary registered with the encoder. Zero means untagged.
    pub attr: i64,
}

/// Stacks seen during one collection window, keyed by identity, with an
/// occurrence count per stack. Counts may be driven to zero by callers that
/// pre-decrement; the encoder skips those entries.
#[derive(Default)]
pub struct TraceMultiset {
    traces: FxIndexMap<Trace, i64>,
}

impl TraceMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trace: Trace) {
        self.add_n(trace, 1);
    }

    pub fn add_n(&mut self, trace: Trace, count: i64) {
        *self.traces.entry(trace).or_insert(0) += count;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Trace, i64)> {
        self.traces.iter().map(|(trace, count)| (trace, *count))
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Drops all accumulated stacks, releasing their memory for the next
    /// collection window.
    pub fn clear(&mut self) {
        self.traces = FxIndexMap::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_frame_trace(address: u64) -> Trace {
        Trace {
            frames: vec![RawFrame::Native { address }],
            attr: 0,
        }
    }

    #[test]
    fn add_aggregates_identical_traces() {
        let mut traces = TraceMultiset::new();
        traces.add(one_frame_trace(0x1000));
        traces.add(one_frame_trace(0x1000));
        traces.add_n(one_frame_trace(0x2000), 5);

        assert_eq!(traces.len(), 2);
        let counts: Vec<i64> = traces.iter().map(|(_, count)| count).collect();
        assert_eq!(counts, vec![2, 5]);
    }

    #[test]
    fn attr_distinguishes_otherwise_equal_traces() {
        let mut traces = TraceMultiset::new();
        let mut tagged = one_frame_trace(0x1000);
        tagged.attr = 3;
        traces.add(one_frame_trace(0x1000));
        traces.add(tagged);
        assert_eq!(traces.len(), 2);
    }

    #[test]
    fn clear_releases_everything() {
        let mut traces = TraceMultiset::new();
        traces.add(one_frame_trace(0x1000));
        traces.clear();
        assert!(traces.is_empty());
    }
}
