// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod function;
mod location;
mod mapping;
mod profile;
mod sample;
mod value_type;

pub use function::*;
pub use location::*;
pub use mapping::*;
pub use profile::*;
pub use sample::*;
pub use value_type::*;

use crate::collections::identifiable::*;
use std::num::NonZeroU32;

/// Offset into the string table. Unlike the other ids, zero is valid: it is
/// the empty string, which pprof requires at offset 0.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StringId(u32);

impl StringId {
    pub const ZERO: StringId = StringId(0);

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Id for StringId {
    type RawId = i64;

    fn from_offset(offset: usize) -> Self {
        #[allow(clippy::expect_used)]
        Self(offset.try_into().expect("StringId to fit into a u32"))
    }

    fn to_raw_id(&self) -> Self::RawId {
        self.0.into()
    }
}

impl Item for String {
    type Id = StringId;
}
