// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! WebAssembly binary format reading.
//!
//! The reader is zero-copy and lazy: it walks a borrowed byte span, decoding
//! entities on demand and never duplicating payload bytes. Read failures are
//! reported once through the [`ErrorSink`] and terminate the surrounding
//! lazy sequence; they are never fatal to sibling sequences.

mod custom;
mod decodable_impls;
mod lazy;
mod leb128;
mod module;

pub use custom::*;
pub use lazy::*;
pub use module::*;

use thiserror::Error;

use crate::at::{At, Location, Span};
use crate::errors::ErrorSink;
use crate::features::Features;
use crate::types::Opcode;

use leb128::LebError;

/// Represents the ways decoding can fail. Every value is rendered and handed
/// to the error sink at the point of failure.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReadError {
    #[error("Unexpected end of input while reading {desc}")]
    UnexpectedEnd { desc: &'static str },
    #[error("Invalid LEB128 encoding of {desc}")]
    InvalidLeb128 { desc: &'static str },
    #[error("Invalid {desc}: {byte:#04x}")]
    BadTag { desc: &'static str, byte: u8 },
    #[error("Invalid {desc} flags: {flags:#x}")]
    BadFlags { desc: &'static str, flags: u32 },
    #[error("Invalid UTF-8 encoding of {desc}")]
    InvalidUtf8 { desc: &'static str },
    #[error("Length {len} of {desc} exceeds the {remaining} remaining bytes")]
    LengthOutOfBounds {
        desc: &'static str,
        len: u32,
        remaining: usize,
    },
    #[error("Found {count} trailing bytes after {desc}")]
    TrailingBytes { desc: &'static str, count: usize },
    #[error("Invalid magic number {magic:#010x}")]
    BadMagic { magic: u32 },
    #[error("Unknown binary version {version}")]
    BadVersion { version: u32 },
    #[error("Unknown opcode {opcode:#x}")]
    UnknownOpcode { opcode: u32 },
    #[error("Opcode {opcode:?} requires the {feature} feature")]
    DisabledOpcode { opcode: Opcode, feature: &'static str },
    #[error("{what} requires the {feature} feature")]
    RequiresFeature {
        what: &'static str,
        feature: &'static str,
    },
    #[error("Duplicate section {id:?}")]
    DuplicateSection { id: crate::types::SectionId },
    #[error("Section {id:?} out of order, must appear before {last:?}")]
    OutOfOrderSection {
        id: crate::types::SectionId,
        last: crate::types::SectionId,
    },
    #[error("Invalid linking metadata version {version}, expected {expected}")]
    BadLinkingVersion { version: u32, expected: u32 },
}

/// Everything the reader consults while decoding: the enabled features and
/// the sink that receives read errors.
pub struct DecodeContext<'e> {
    pub features: Features,
    pub errors: &'e mut dyn ErrorSink,
}

impl<'e> DecodeContext<'e> {
    pub fn new(features: Features, errors: &'e mut dyn ErrorSink) -> Self {
        Self { features, errors }
    }

    /// Reports a read error at the given location.
    pub(crate) fn report(&mut self, loc: Location, error: ReadError) {
        self.errors.on_error(loc, error.to_string());
    }

    // Pushes a context frame around a call, popping it on every exit path.
    pub(crate) fn with_context<R>(
        &mut self,
        loc: Location,
        desc: &'static str,
        f: impl FnOnce(&mut Self) -> Option<R>,
    ) -> Option<R> {
        self.errors.push_context(loc, desc);
        let result = f(self);
        self.errors.pop_context();
        result
    }
}

/// A cursor over a [`Span`]. Primitives consume bytes from the front and
/// return located values; the cursor holds no other state, and on a reported
/// failure its position is unspecified.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    span: Span<'a>,
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(span: Span<'a>) -> Self {
        Self { span, pos: 0 }
    }

    /// The absolute module offset of the next byte to be read.
    pub fn pos(&self) -> usize {
        self.span.offset() + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.span.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unconsumed rest of the span, consuming it.
    pub(crate) fn rest(&mut self) -> Span<'a> {
        let rest = self.span.slice(self.pos, self.span.len());
        self.pos = self.span.len();
        rest
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.span.as_bytes().get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    // Wraps a value parsed since `start` with its location.
    pub(crate) fn locate<T>(&self, start: usize, value: T) -> At<T> {
        At::new(value, Location::new(start, self.pos()))
    }

    // The location of a failure that began at `start`.
    fn error_loc(&self, start: usize) -> Location {
        Location::new(start, self.pos())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<u8>> {
        let start = self.pos();
        match self.next_byte() {
            Some(byte) => Some(self.locate(start, byte)),
            None => {
                cx.report(self.error_loc(start), ReadError::UnexpectedEnd { desc });
                None
            }
        }
    }

    fn read_leb<T: leb128::Leb128>(
        &mut self,
        desc: &'static str,
        cx: &mut DecodeContext<'_>,
    ) -> Option<At<T>> {
        let start = self.pos();
        match leb128::read(|| self.next_byte()) {
            Ok(value) => Some(self.locate(start, value)),
            Err(err) => {
                let error = match err {
                    LebError::UnexpectedEnd => ReadError::UnexpectedEnd { desc },
                    LebError::Overflow => ReadError::InvalidLeb128 { desc },
                };
                cx.report(self.error_loc(start), error);
                None
            }
        }
    }

    /// Reads a LEB128-encoded u32.
    pub fn read_u32(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<u32>> {
        self.read_leb(desc, cx)
    }

    /// Reads a LEB128-encoded u64.
    pub fn read_u64(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<u64>> {
        self.read_leb(desc, cx)
    }

    /// Reads a LEB128-encoded s32.
    pub fn read_s32(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<i32>> {
        self.read_leb(desc, cx)
    }

    /// Reads a LEB128-encoded s64.
    pub fn read_s64(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<i64>> {
        self.read_leb(desc, cx)
    }

    /// Reads a signed 33-bit LEB128 value (block types).
    pub fn read_s33(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<i64>> {
        let start = self.pos();
        match leb128::read_s33(|| self.next_byte()) {
            Ok(value) => Some(self.locate(start, value)),
            Err(err) => {
                let error = match err {
                    LebError::UnexpectedEnd => ReadError::UnexpectedEnd { desc },
                    LebError::Overflow => ReadError::InvalidLeb128 { desc },
                };
                cx.report(self.error_loc(start), error);
                None
            }
        }
    }

    /// Reads a little-endian f32.
    pub fn read_f32(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<f32>> {
        let bytes = self.read_array::<4>(desc, cx)?;
        Some(bytes.map(f32::from_le_bytes))
    }

    /// Reads a little-endian f64.
    pub fn read_f64(&mut self, desc: &'static str, cx: &mut DecodeContext<'_>) -> Option<At<f64>> {
        let bytes = self.read_array::<8>(desc, cx)?;
        Some(bytes.map(f64::from_le_bytes))
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(
        &mut self,
        desc: &'static str,
        cx: &mut DecodeContext<'_>,
    ) -> Option<At<[u8; N]>> {
        let start = self.pos();
        if self.remaining() < N {
            self.pos = self.span.len();
            cx.report(self.error_loc(start), ReadError::UnexpectedEnd { desc });
            return None;
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.span.as_bytes()[self.pos..self.pos + N]);
        self.pos += N;
        Some(self.locate(start, bytes))
    }

    /// Reads a length-prefixed sub-span and advances the cursor past it.
    pub fn read_sized_span(
        &mut self,
        desc: &'static str,
        cx: &mut DecodeContext<'_>,
    ) -> Option<At<Span<'a>>> {
        let start = self.pos();
        let len = self.read_u32(desc, cx)?;
        if (*len as usize) > self.remaining() {
            cx.report(
                len.loc(),
                ReadError::LengthOutOfBounds {
                    desc,
                    len: *len,
                    remaining: self.remaining(),
                },
            );
            return None;
        }
        let span = self.span.slice(self.pos, self.pos + (*len as usize));
        self.pos += *len as usize;
        Some(self.locate(start, span))
    }

    /// Reads a length-prefixed, UTF-8-validated name.
    pub fn read_name(
        &mut self,
        desc: &'static str,
        cx: &mut DecodeContext<'_>,
    ) -> Option<At<&'a str>> {
        let start = self.pos();
        let bytes = self.read_sized_span(desc, cx)?;
        match str::from_utf8(bytes.as_bytes()) {
            Ok(name) => Some(self.locate(start, name)),
            Err(_) => {
                cx.report(bytes.loc(), ReadError::InvalidUtf8 { desc });
                None
            }
        }
    }

    /// Decodes an entity, pushing its context descriptor for the duration.
    pub(crate) fn read<T: Decode<'a>>(&mut self, cx: &mut DecodeContext<'_>) -> Option<At<T>> {
        let loc = Location::new(self.pos(), self.pos());
        cx.with_context(loc, T::DESC, |cx| T::decode(self, cx))
    }
}

/// Types that can be decoded from the front of a byte span.
///
/// This is the uniform entity-reader interface: parse the fields in encoding
/// order and return the value located at the byte range it came from. On
/// failure, the implementation reports through the sink and returns `None`;
/// it is the caller's responsibility to stop iterating.
pub trait Decode<'a>: Sized {
    /// The context descriptor pushed around this entity's decoding.
    const DESC: &'static str;

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BufferedErrors;

    fn reader(bytes: &[u8]) -> Reader<'_> {
        Reader::new(Span::new(bytes))
    }

    #[test]
    fn primitives_track_locations() {
        let bytes = [0x07, 0xe5, 0x8e, 0x26, 0x2a];
        let mut errors = BufferedErrors::new();
        let mut cx = DecodeContext::new(Features::mvp(), &mut errors);
        let mut r = reader(&bytes);

        let byte = r.read_u8("byte", &mut cx).unwrap();
        assert_eq!(*byte, 7);
        assert_eq!(byte.loc(), Location::new(0, 1));

        let value = r.read_u32("value", &mut cx).unwrap();
        assert_eq!(*value, 624485);
        assert_eq!(value.loc(), Location::new(1, 4));

        assert_eq!(r.remaining(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn eof_is_reported_once_per_primitive() {
        let mut errors = BufferedErrors::new();
        let mut cx = DecodeContext::new(Features::mvp(), &mut errors);
        let mut r = reader(&[]);
        assert!(r.read_u8("tag", &mut cx).is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.as_reported()[0].message,
            "Unexpected end of input while reading tag"
        );
    }

    #[test]
    fn names_must_be_utf8() {
        // Length 2, then an invalid UTF-8 sequence.
        let bytes = [0x02, 0xff, 0xfe];
        let mut errors = BufferedErrors::new();
        let mut cx = DecodeContext::new(Features::mvp(), &mut errors);
        let mut r = reader(&bytes);
        assert!(r.read_name("name", &mut cx).is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "Invalid UTF-8 encoding of name"
        );
    }

    #[test]
    fn sized_spans_respect_remaining_input() {
        let bytes = [0x05, 0x00, 0x00];
        let mut errors = BufferedErrors::new();
        let mut cx = DecodeContext::new(Features::mvp(), &mut errors);
        let mut r = reader(&bytes);
        assert!(r.read_sized_span("contents", &mut cx).is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "Length 5 of contents exceeds the 2 remaining bytes"
        );
    }
}
