// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;

/// A deduplicated call site. Managed frames carry a function and a line
/// with a zero address; native frames carry only the address. The two
/// shapes are disjoint, so one set serves both dedup spaces without
/// collisions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Location {
    pub function: Option<FunctionId>,
    pub address: u64,
    pub line: i64,
}

impl Location {
    pub fn symbolic(function: FunctionId, line: i64) -> Self {
        Self {
            function: Some(function),
            address: 0,
            line,
        }
    }

    pub fn address_only(address: u64) -> Self {
        Self {
            function: None,
            address,
            line: 0,
        }
    }
}

impl Item for Location {
    type Id = LocationId;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct LocationId(NonZeroU32);

impl Id for LocationId {
    type RawId = u64;

    fn from_offset(offset: usize) -> Self {
        #[allow(clippy::expect_used)]
        Self(small_non_zero_pprof_id(offset).expect("LocationId to fit into a u32"))
    }

    fn to_raw_id(&self) -> Self::RawId {
        self.0.get().into()
    }
}
