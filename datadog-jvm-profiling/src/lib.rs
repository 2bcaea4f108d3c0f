// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod api;
pub mod collections;
pub mod internal;
pub mod memory;
pub mod pprof;
pub mod symbols;
pub mod trace;
