// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::api;
use crate::memory::{MemoryIntervalIndex, MemoryRange, RangeKind};
use crate::pprof;
use crate::symbols::{normalize_signature, simplify_function_name, FrameResolver, FrameSymbols};
use crate::trace::{RawFrame, TraceMultiset};
use anyhow::Context;
use prost::Message;
use tracing::info;

/// Folds one finished collection window into a pprof profile. Single-use
/// and single-threaded: the encoder owns every dedup table for the lifetime
/// of one pass, and ids are only meaningful within that pass.
pub struct ProfileEncoder<'a> {
    resolver: &'a dyn FrameResolver,
    memory_index: &'a MemoryIntervalIndex,
    native_mappings: &'a [api::NativeMapping<'a>],
    strings: FxIndexSet<String>,
    functions: FxIndexSet<Function>,
    locations: FxIndexSet<Location>,
    mappings: Vec<Mapping>,
    samples: Vec<Sample>,
    sample_types: Vec<ValueType>,
    period: Option<(i64, ValueType)>,
    duration_nanos: i64,
    attr_key: StringId,
    total_count: i64,
    total_weight: i64,
}

impl<'a> ProfileEncoder<'a> {
    /// Creates an encoder whose string table starts with "" and then the
    /// given vocabulary, in order. Trace attributes and pre-decided label
    /// values reference these strings by their dense ids (1-based, in
    /// vocabulary order), so the vocabulary must match what the sampler
    /// tagged traces with.
    pub fn new(
        resolver: &'a dyn FrameResolver,
        memory_index: &'a MemoryIntervalIndex,
        native_mappings: &'a [api::NativeMapping<'a>],
        known_strings: &[&str],
    ) -> Self {
        let mut encoder = Self {
            resolver,
            memory_index,
            native_mappings,
            strings: Default::default(),
            functions: Default::default(),
            locations: Default::default(),
            mappings: Vec::new(),
            samples: Vec::new(),
            sample_types: Vec::new(),
            period: None,
            duration_nanos: 0,
            attr_key: StringId::ZERO,
            total_count: 0,
            total_weight: 0,
        };

        encoder.intern("");
        for string in known_strings {
            encoder.intern(string);
        }
        encoder.attr_key = encoder.intern("attr");
        encoder
    }

    /// Interns the `str` as a string, returning the id in the string table.
    fn intern(&mut self, str: &str) -> StringId {
        self.strings.dedup_ref(str)
    }

    /// Folds the window into the profile: period and sample-type
    /// declarations, one sample per non-zero trace, then the native
    /// mapping table.
    pub fn populate(
        &mut self,
        profile_type: &str,
        traces: &TraceMultiset,
        duration_nanos: i64,
        period_nanos: i64,
    ) {
        let type_id = self.intern(profile_type);
        let nanoseconds = self.intern("nanoseconds");
        let period_type = ValueType {
            r#type: type_id,
            unit: nanoseconds,
        };
        self.period = Some((period_nanos, period_type));
        self.sample_types = vec![
            ValueType {
                r#type: self.intern("sample"),
                unit: self.intern("count"),
            },
            period_type,
        ];
        self.duration_nanos = duration_nanos;

        for (trace, count) in traces.iter() {
            if count == 0 {
                // Callers may pre-decrement counts; an emptied entry is
                // not an error.
                continue;
            }
            let locations = trace
                .frames
                .iter()
                .map(|frame| self.location_id(frame))
                .collect();
            self.add_sample(locations, count, count.saturating_mul(period_nanos), trace.attr);
        }

        let native_mappings = self.native_mappings;
        for mapping in native_mappings {
            let filename = self.intern(mapping.filename);
            self.mappings.push(Mapping {
                memory_start: mapping.memory_start,
                memory_limit: mapping.memory_limit,
                filename,
            });
        }
    }

    /// Records a synthetic one-frame sample that is not derived from a
    /// captured stack, e.g. an aggregate GC-time counter.
    pub fn add_artificial_sample(&mut self, name: &str, count: i64, weight: i64, attr: i64) {
        let symbols = FrameSymbols {
            method_name: name.to_owned(),
            ..Default::default()
        };
        let location = self.symbol_location_id(&symbols);
        self.add_sample(vec![location], count, weight, attr);
    }

    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    pub fn total_weight(&self) -> i64 {
        self.total_weight
    }

    fn add_sample(&mut self, locations: Vec<LocationId>, count: i64, weight: i64, attr: i64) {
        self.total_count += count;
        self.total_weight += weight;
        self.samples.push(Sample {
            locations,
            count,
            weight,
            attr,
        });
    }

    fn location_id(&mut self, frame: &RawFrame) -> LocationId {
        match frame {
            RawFrame::Managed { method_id, bci } => {
                let symbols = self.resolver.resolve(*method_id, i64::from(*bci));
                self.symbol_location_id(&symbols)
            }
            RawFrame::Native { address } => self.native_location_id(*address),
        }
    }

    /// An address-only frame is classified through the interval index: if
    /// it falls in a compiled-code range, it is really a managed frame and
    /// is resolved as one. Everything else, including addresses the index
    /// has never heard of, keeps its raw address.
    fn native_location_id(&mut self, address: u64) -> LocationId {
        if let Some(MemoryRange {
            start,
            kind: RangeKind::CompiledCode { method_id },
            ..
        }) = self.memory_index.lookup(address)
        {
            let symbols = self.resolver.resolve(method_id, (address - start) as i64);
            if !symbols.is_empty() {
                return self.symbol_location_id(&symbols);
            }
        }
        self.locations.dedup(Location::address_only(address))
    }

    fn symbol_location_id(&mut self, symbols: &FrameSymbols) -> LocationId {
        let signature = normalize_signature(&symbols.signature);

        // Empty class and signature segments are omitted rather than left
        // as visible empty punctuation.
        let mut frame_name = String::with_capacity(
            symbols.class_name.len() + symbols.method_name.len() + signature.len() + 1,
        );
        if !symbols.class_name.is_empty() {
            frame_name.push_str(&symbols.class_name);
            frame_name.push('.');
        }
        frame_name.push_str(&symbols.method_name);
        frame_name.push_str(&signature);

        let name = self.intern(simplify_function_name(&frame_name));
        let system_name = self.intern(&frame_name);
        let filename = self.intern(&symbols.file_name);
        let function = self.functions.dedup(Function {
            name,
            system_name,
            filename,
        });

        self.locations
            .dedup(Location::symbolic(function, symbols.line_number))
    }

    /// Serializes the accumulated profile. This is the only hard failure
    /// of an encoding pass; everything upstream recovers locally.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        let (period, period_type) = match self.period {
            Some((value, value_type)) => (value, Some(value_type.into())),
            None => (0, None),
        };

        let profile = pprof::Profile {
            sample_types: self.sample_types.iter().map(|vt| (*vt).into()).collect(),
            samples: self.samples.iter().map(|sample| self.emit_sample(sample)).collect(),
            mappings: self
                .mappings
                .iter()
                .enumerate()
                .map(|(index, mapping)| pprof::Mapping {
                    id: (index + 1) as u64,
                    memory_start: mapping.memory_start,
                    memory_limit: mapping.memory_limit,
                    file_offset: 0,
                    filename: mapping.filename.to_raw_id(),
                    build_id: 0,
                })
                .collect(),
            locations: self
                .locations
                .iter()
                .enumerate()
                .map(|(offset, location)| pprof::Location {
                    id: LocationId::from_offset(offset).to_raw_id(),
                    mapping_id: 0,
                    address: location.address,
                    lines: match location.function {
                        Some(function) => vec![pprof::Line {
                            function_id: function.to_raw_id(),
                            line: location.line,
                        }],
                        None => vec![],
                    },
                })
                .collect(),
            functions: self
                .functions
                .iter()
                .enumerate()
                .map(|(offset, function)| pprof::Function {
                    id: FunctionId::from_offset(offset).to_raw_id(),
                    name: function.name.to_raw_id(),
                    system_name: function.system_name.to_raw_id(),
                    filename: function.filename.to_raw_id(),
                    start_line: 0,
                })
                .collect(),
            string_table: self.strings.iter().cloned().collect(),
            time_nanos: 0,
            duration_nanos: self.duration_nanos,
            period_type,
            period,
        };

        let mut buffer: Vec<u8> = Vec::new();
        profile
            .encode(&mut buffer)
            .context("failed to encode profile")?;
        Ok(buffer)
    }

    fn emit_sample(&self, sample: &Sample) -> pprof::Sample {
        let labels = if sample.attr != 0 {
            // The attribute is a string-table reference into the vocabulary
            // registered at construction.
            vec![pprof::Label {
                key: self.attr_key.to_raw_id(),
                str: sample.attr,
                num: 0,
                num_unit: 0,
            }]
        } else {
            vec![]
        };

        pprof::Sample {
            location_ids: sample.locations.iter().map(Id::to_raw_id).collect(),
            values: vec![sample.count, sample.weight],
            labels,
        }
    }
}

impl From<ValueType> for pprof::ValueType {
    fn from(vt: ValueType) -> Self {
        Self {
            r#type: vt.r#type.to_raw_id(),
            unit: vt.unit.to_raw_id(),
        }
    }
}

/// Encodes a finished window and releases it: builds one encoder over the
/// multiset, injects the extra counters as artificial samples, clears the
/// multiset before the output buffer is built, and returns the bytes.
#[allow(clippy::too_many_arguments)]
pub fn serialize_and_clear_traces(
    resolver: &dyn FrameResolver,
    memory_index: &MemoryIntervalIndex,
    native_mappings: &[api::NativeMapping<'_>],
    profile_type: &str,
    known_strings: &[&str],
    extra_counters: &[api::ExtraCounter<'_>],
    duration_nanos: i64,
    period_nanos: i64,
    traces: &mut TraceMultiset,
) -> anyhow::Result<Vec<u8>> {
    let mut encoder = ProfileEncoder::new(resolver, memory_index, native_mappings, known_strings);
    encoder.populate(profile_type, traces, duration_nanos, period_nanos);
    for counter in extra_counters {
        // TODO: track and report attributes for artificial samples.
        encoder.add_artificial_sample(
            counter.name,
            counter.value,
            counter.value.saturating_mul(period_nanos),
            0,
        );
    }

    info!(
        total_count = encoder.total_count(),
        total_weight = encoder.total_weight(),
        "collected a profile"
    );

    // The stacks are already folded into the dedup tables; release them
    // before the encode allocates the output buffer.
    traces.clear();
    encoder.serialize()
}
