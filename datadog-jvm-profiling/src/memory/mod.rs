// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide registry of executable memory ranges. The runtime's
//! code-load hooks feed it from arbitrary threads; the collector thread
//! queries it while resolving native frames, so every operation holds the
//! one mutex for the duration of the call.

use parking_lot::Mutex;

/// What a registered range holds, and the identity needed to symbolize an
/// address that falls inside it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RangeKind {
    /// JIT-compiled method code, identified by the runtime's method id.
    CompiledCode { method_id: u64 },
    /// A native library or other executable mapping. The name is an owned
    /// copy; the reporting hook's buffer may be stack-local.
    Native { name: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryRange {
    pub start: u64,
    pub length: u64,
    pub kind: RangeKind,
}

impl MemoryRange {
    #[inline]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address - self.start < self.length
    }
}

/// Tracked ranges in insertion order. Ranges may overlap (a compiled method
/// is registered inside the mapping that backs the code cache); `lookup`
/// resolves overlap as most-recently-inserted wins, which prefers the inner,
/// fresher claim.
#[derive(Default)]
pub struct MemoryIntervalIndex {
    ranges: Mutex<Vec<MemoryRange>>,
}

impl MemoryIntervalIndex {
    pub const fn new() -> Self {
        Self {
            ranges: Mutex::new(Vec::new()),
        }
    }

    pub fn add_compiled_range(&self, start: u64, length: u64, method_id: u64) {
        self.ranges.lock().push(MemoryRange {
            start,
            length,
            kind: RangeKind::CompiledCode { method_id },
        });
    }

    pub fn add_native_range(&self, start: u64, length: u64, name: &str) {
        self.ranges.lock().push(MemoryRange {
            start,
            length,
            kind: RangeKind::Native {
                name: name.to_owned(),
            },
        });
    }

    /// Removes the first range matching both the start address and the
    /// method identity. A miss means the range was already removed, which
    /// is not an error.
    pub fn remove_compiled_range(&self, start: u64, method_id: u64) {
        let mut ranges = self.ranges.lock();
        if let Some(index) = ranges.iter().position(|range| {
            range.start == start && range.kind == RangeKind::CompiledCode { method_id }
        }) {
            ranges.remove(index);
        }
    }

    /// The unload path for native ranges, mirroring the compiled-code one.
    pub fn remove_native_range(&self, start: u64, name: &str) {
        let mut ranges = self.ranges.lock();
        if let Some(index) = ranges.iter().position(|range| {
            range.start == start
                && matches!(&range.kind, RangeKind::Native { name: n } if n == name)
        }) {
            ranges.remove(index);
        }
    }

    /// Returns the most recently inserted range containing `address`.
    pub fn lookup(&self, address: u64) -> Option<MemoryRange> {
        self.ranges
            .lock()
            .iter()
            .rev()
            .find(|range| range.contains(address))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.ranges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn lookup_finds_containing_range() {
        let index = MemoryIntervalIndex::new();
        index.add_compiled_range(0x1000, 0x100, 7);
        index.add_native_range(0x8000, 0x2000, "libc.so.6");

        let range = index.lookup(0x10ff).expect("address to be tracked");
        assert_eq!(range.start, 0x1000);
        assert_eq!(range.kind, RangeKind::CompiledCode { method_id: 7 });

        let range = index.lookup(0x8000).expect("address to be tracked");
        assert_eq!(
            range.kind,
            RangeKind::Native {
                name: "libc.so.6".into()
            }
        );

        // One past the end of the compiled range.
        assert_eq!(index.lookup(0x1100), None);
        assert_eq!(index.lookup(0), None);
    }

    #[test]
    fn most_recently_inserted_wins() {
        let index = MemoryIntervalIndex::new();
        // An outer library mapping, then a compiled method inside it.
        index.add_native_range(0x4000, 0x4000, "code-cache");
        index.add_compiled_range(0x5000, 0x200, 42);

        let range = index.lookup(0x5010).expect("address to be tracked");
        assert_eq!(range.kind, RangeKind::CompiledCode { method_id: 42 });

        // Outside the inner range, the outer mapping still answers.
        let range = index.lookup(0x4010).expect("address to be tracked");
        assert_eq!(
            range.kind,
            RangeKind::Native {
                name: "code-cache".into()
            }
        );

        // Unloading the method re-exposes the outer mapping.
        index.remove_compiled_range(0x5000, 42);
        let range = index.lookup(0x5010).expect("address to be tracked");
        assert_eq!(
            range.kind,
            RangeKind::Native {
                name: "code-cache".into()
            }
        );
    }

    #[test]
    fn remove_compiled_range_requires_both_keys() {
        let index = MemoryIntervalIndex::new();
        index.add_compiled_range(0x1000, 0x100, 1);

        // Wrong method id, then wrong start: both are silent no-ops.
        index.remove_compiled_range(0x1000, 2);
        index.remove_compiled_range(0x2000, 1);
        assert_eq!(index.len(), 1);

        index.remove_compiled_range(0x1000, 1);
        assert_eq!(index.len(), 0);
        assert_eq!(index.lookup(0x1000), None);

        // Removing again is also a no-op.
        index.remove_compiled_range(0x1000, 1);
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn remove_native_range_mirrors_compiled_path() {
        let index = MemoryIntervalIndex::new();
        index.add_native_range(0x7000, 0x1000, "libfoo.so");
        index.add_native_range(0x9000, 0x1000, "libbar.so");

        index.remove_native_range(0x7000, "libbar.so");
        assert_eq!(index.len(), 2);

        index.remove_native_range(0x7000, "libfoo.so");
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(0x7000), None);
        assert!(index.lookup(0x9000).is_some());
    }

    #[test]
    fn native_name_is_an_owned_copy() {
        let index = MemoryIntervalIndex::new();
        {
            let transient = String::from("libtransient.so");
            index.add_native_range(0x1000, 0x100, &transient);
        }
        let range = index.lookup(0x1000).expect("address to be tracked");
        assert_eq!(
            range.kind,
            RangeKind::Native {
                name: "libtransient.so".into()
            }
        );
    }

    #[test]
    fn concurrent_loads_and_lookups() {
        let index = Arc::new(MemoryIntervalIndex::new());

        let writers: Vec<_> = (0u64..4)
            .map(|t| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for i in 0..64 {
                        index.add_compiled_range((t * 0x10000) + i * 0x100, 0x100, t);
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0u64..2)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for i in 0..256 {
                        // Any answer is fine; the point is that no lookup
                        // observes a partially constructed range.
                        if let Some(range) = index.lookup(i * 0x80) {
                            assert!(range.length > 0);
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
        assert_eq!(index.len(), 4 * 64);
    }

    /// Disjoint ranges laid out from random (start, length) pairs with gaps
    /// between them, so each probe point has exactly one possible owner.
    fn disjoint_ranges() -> impl Strategy<Value = Vec<(u64, u64)>> {
        prop::collection::vec((1u64..0x100, 1u64..0x100), 1..16).prop_map(|pairs| {
            let mut next = 0x1000u64;
            pairs
                .into_iter()
                .map(|(gap, length)| {
                    let start = next + gap;
                    next = start + length;
                    (start, length)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn lookup_is_exact_over_disjoint_ranges(ranges in disjoint_ranges()) {
            let index = MemoryIntervalIndex::new();
            for (i, (start, length)) in ranges.iter().enumerate() {
                index.add_compiled_range(*start, *length, i as u64);
            }

            for (i, (start, length)) in ranges.iter().enumerate() {
                for probe in [*start, start + length / 2, start + length - 1] {
                    let found = index.lookup(probe).expect("probe inside a range");
                    prop_assert_eq!(found.kind, RangeKind::CompiledCode { method_id: i as u64 });
                }
                prop_assert_eq!(index.lookup(start - 1), None);
                prop_assert_eq!(index.lookup(start + length), None);
            }
        }
    }
}
