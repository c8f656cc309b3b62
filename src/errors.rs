// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Error reporting through a caller-supplied sink.
//!
//! Both the reader and the validator report every problem as a located
//! message through an [`ErrorSink`]; neither aborts the surrounding walk on
//! its own. A sink also receives a stack of context descriptors ("import",
//! "element segment", ...) pushed around each decoding or validation site so
//! it can qualify messages.

use crate::at::Location;

/// Receives located diagnostics and context-scope notifications.
///
/// The context stack nests: a `push_context` is always paired with a
/// `pop_context`, including on early exits (see
/// [`DecodeContext::with_context`](crate::decode::DecodeContext::with_context)).
pub trait ErrorSink {
    /// Reports an error at the given location. `message` is already rendered;
    /// the current context stack is implied.
    fn on_error(&mut self, loc: Location, message: String);

    /// Enters a named context covering the value starting at `loc`.
    fn push_context(&mut self, loc: Location, desc: &'static str) {
        let _ = (loc, desc);
    }

    /// Leaves the innermost context.
    fn pop_context(&mut self) {}
}

/// A sink that discards everything.
pub struct NopErrors;

impl ErrorSink for NopErrors {
    fn on_error(&mut self, _: Location, _: String) {}
}

/// A single collected diagnostic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    /// Where in the module the problem is.
    pub loc: Location,
    /// The rendered message, without context qualification.
    pub message: String,
    /// The context descriptors that were active, outermost first.
    pub contexts: Vec<&'static str>,
}

impl Diagnostic {
    /// Renders the diagnostic with its context stack prepended, in the form
    /// `0x23: import: global type: <message>`.
    pub fn to_string_with_contexts(&self) -> String {
        let mut out = format!("{:#x}: ", self.loc.start);
        for context in &self.contexts {
            out.push_str(context);
            out.push_str(": ");
        }
        out.push_str(&self.message);
        out
    }
}

/// A sink that buffers diagnostics for later inspection, qualifying each with
/// the context stack active at the time it was reported.
#[derive(Default)]
pub struct BufferedErrors {
    contexts: Vec<&'static str>,
    diagnostics: Vec<Diagnostic>,
}

impl BufferedErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// The collected diagnostics, ordered by their location in the module.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<_> = self.diagnostics.iter().collect();
        sorted.sort_by_key(|d| d.loc);
        sorted
    }

    /// The diagnostics in the order they were reported.
    pub fn as_reported(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl ErrorSink for BufferedErrors {
    fn on_error(&mut self, loc: Location, message: String) {
        self.diagnostics.push(Diagnostic {
            loc,
            message,
            contexts: self.contexts.clone(),
        });
    }

    fn push_context(&mut self, _: Location, desc: &'static str) {
        self.contexts.push(desc);
    }

    fn pop_context(&mut self) {
        debug_assert!(!self.contexts.is_empty());
        self.contexts.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_errors_qualify_with_contexts() {
        let mut errors = BufferedErrors::new();
        errors.push_context(Location::new(0, 4), "import");
        errors.push_context(Location::new(1, 2), "global type");
        errors.on_error(Location::new(1, 2), "bad".to_string());
        errors.pop_context();
        errors.pop_context();
        errors.on_error(Location::new(8, 9), "worse".to_string());

        let diagnostics = errors.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[0].to_string_with_contexts(),
            "0x1: import: global type: bad"
        );
        assert_eq!(diagnostics[1].contexts, Vec::<&str>::new());
    }

    #[test]
    fn diagnostics_are_ordered_by_location() {
        let mut errors = BufferedErrors::new();
        errors.on_error(Location::new(9, 10), "second".to_string());
        errors.on_error(Location::new(3, 4), "first".to_string());

        let diagnostics = errors.diagnostics();
        assert_eq!(diagnostics[0].message, "first");
        assert_eq!(diagnostics[1].message, "second");
    }
}
