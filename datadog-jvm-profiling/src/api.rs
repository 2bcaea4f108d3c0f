// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Borrowed input types handed to the encoder by the surrounding agent.
//! Nothing here owns its strings; the encoder interns what it keeps.

/// One row of the native memory-map snapshot taken by the process-info
/// collaborator at collection time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NativeMapping<'a> {
    /// Address at which the region begins.
    pub memory_start: u64,
    /// The limit of the address range occupied by this region.
    pub memory_limit: u64,
    /// The object the region is loaded from, or a virtual abstraction
    /// like "[vdso]".
    pub filename: &'a str,
}

/// A synthetic counter to report alongside the real samples, e.g. time the
/// runtime spent in GC rather than in sampled code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtraCounter<'a> {
    pub name: &'a str,
    pub value: i64,
}
