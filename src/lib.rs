// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Lazy, zero-copy reading and validation of the WebAssembly binary format.
//!
//! Every decoded entity borrows from the input buffer and carries the byte
//! range it was parsed from, so diagnostics can always point at bytes.
//! Sections are exposed as restartable lazy sequences: a module need not be
//! fully decoded to inspect part of it. A configurable [`Features`] set
//! controls which post-MVP proposals the reader and validator accept.
//!
//! All errors, from both the reader and the validator, flow through a
//! caller-supplied [`ErrorSink`]; the final verdict is a single boolean.
//!
//! ```
//! use veneer::{BufferedErrors, Features, validate_module};
//!
//! let mut errors = BufferedErrors::new();
//! assert!(validate_module(b"\0asm\x01\0\0\0", Features::default(), &mut errors));
//! assert!(errors.is_empty());
//! ```

mod at;
mod errors;
mod features;

pub mod decode;
pub mod types;
pub mod validate;

pub use at::{At, Location, Span};
pub use decode::{DecodeContext, LazyModule, parse_module};
pub use errors::{BufferedErrors, Diagnostic, ErrorSink, NopErrors};
pub use features::Features;
pub use validate::{Context, validate};

/// Parses and validates a module in one call, reporting every problem
/// through `errors`.
///
/// For finer-grained access (walking individual sections, reusing a parsed
/// module), use [`parse_module`] and [`validate`] directly.
pub fn validate_module(bytes: &[u8], features: Features, errors: &mut dyn ErrorSink) -> bool {
    let module = {
        let mut cx = DecodeContext::new(features, &mut *errors);
        parse_module(bytes, &mut cx)
    };
    let Some(module) = module else {
        return false;
    };
    let mut context = Context::new(features, errors);
    validate(&module, &mut context)
}
