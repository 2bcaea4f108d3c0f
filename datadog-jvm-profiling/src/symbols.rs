// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The seam between the encoder and the runtime's symbol database, plus the
//! string fixups applied to resolved frames before they are interned.

/// Symbolic identity of one managed frame. Resolution failure is expressed
/// as empty fields, never as an error.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameSymbols {
    pub class_name: String,
    pub method_name: String,
    pub signature: String,
    pub file_name: String,
    pub line_number: i64,
}

impl FrameSymbols {
    /// True when resolution produced nothing usable. This is the resolver's
    /// only failure mode.
    pub fn is_empty(&self) -> bool {
        self.class_name.is_empty() && self.method_name.is_empty()
    }
}

/// Turns a (method id, program counter) pair into symbols. The counter is a
/// bytecode index for interpreted frames and a code offset for compiled
/// ones. Implemented by the surrounding agent on top of the runtime's
/// introspection interface.
pub trait FrameResolver {
    fn resolve(&self, method_id: u64, pc: i64) -> FrameSymbols;
}

/// Strips the parameter list from a frame name, leaving `Class.method`.
pub fn simplify_function_name(frame_name: &str) -> &str {
    match frame_name.find('(') {
        Some(index) => &frame_name[..index],
        None => frame_name,
    }
}

/// Rewrites a JVM method descriptor like `(Ljava/lang/String;[I)V` into the
/// display form `(java.lang.String, int[])`. The return type is dropped.
/// Anything that does not parse as a descriptor is passed through unchanged,
/// so already-canonical signatures survive a second pass.
pub fn normalize_signature(signature: &str) -> String {
    match parse_descriptor(signature) {
        Some(normalized) => normalized,
        None => signature.to_owned(),
    }
}

fn parse_descriptor(signature: &str) -> Option<String> {
    let inner = signature.strip_prefix('(')?;
    let (params, _return_type) = inner.split_once(')')?;

    let mut out = String::with_capacity(signature.len());
    out.push('(');

    let mut chars = params.chars();
    let mut first = true;
    loop {
        let mut dimensions = 0usize;
        let mut c = match chars.next() {
            Some(c) => c,
            None => break,
        };
        while c == '[' {
            dimensions += 1;
            c = chars.next()?;
        }

        if !first {
            out.push_str(", ");
        }
        first = false;

        match c {
            'B' => out.push_str("byte"),
            'C' => out.push_str("char"),
            'D' => out.push_str("double"),
            'F' => out.push_str("float"),
            'I' => out.push_str("int"),
            'J' => out.push_str("long"),
            'S' => out.push_str("short"),
            'Z' => out.push_str("boolean"),
            'L' => {
                let mut matched = false;
                for c in chars.by_ref() {
                    if c == ';' {
                        matched = true;
                        break;
                    }
                    out.push(if c == '/' { '.' } else { c });
                }
                if !matched {
                    return None;
                }
            }
            _ => return None,
        }

        for _ in 0..dimensions {
            out.push_str("[]");
        }
    }

    out.push(')');
    Some(out)
}
