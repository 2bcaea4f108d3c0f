// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;

/// One native memory region, kept in snapshot order. Mappings are emitted
/// once per encoding pass and are not deduplicated; the encoder is
/// single-use.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Mapping {
    pub memory_start: u64,
    pub memory_limit: u64,
    pub filename: StringId,
}
