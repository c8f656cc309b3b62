// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! WebAssembly module validation.
//!
//! The validator consumes the lazily decoded sections of a [`LazyModule`] in
//! the canonical order, accumulating the module's declarations in a
//! [`Context`] and checking every structural and typing rule along the way.
//! Validation errors never stop the walk; they are reported through the
//! sink and folded into the final verdict. Read errors terminate the section
//! that produced them, and the walk continues with whatever comes next.
//!
//! The per-opcode type checking of function bodies is out of scope here;
//! [`begin_code`] sets up everything such a checker needs.

mod expr;
mod validate_impls;

pub use expr::{CodeContext, ConstantExpressionKind, ControlFrame, begin_code};

use std::collections::HashSet;

use thiserror::Error;

use crate::at::{At, Location};
use crate::decode::{Decode, DecodeContext, LazyModule, LazySection};
use crate::errors::ErrorSink;
use crate::features::Features;
use crate::types::{
    EventType, FunctionType, GlobalType, KnownSection, MemoryType, Section, SectionId, TableType,
};

/// Represents the rules a module can break. Every value is rendered and
/// handed to the error sink where it is detected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid {desc} {index}, must be less than {max}")]
    IndexOutOfBounds {
        desc: &'static str,
        index: u32,
        max: u32,
    },
    #[error("A constant expression must be a single instruction")]
    ConstantExpressionTooLong,
    #[error("An element expression must be a single instruction")]
    ElementExpressionTooLong,
    #[error("A constant expression cannot contain a mutable global")]
    MutableGlobalInConstantExpression,
    #[error("Invalid instruction in constant expression: {opcode:?}")]
    InvalidConstantInstruction { opcode: crate::types::Opcode },
    #[error("Invalid instruction in element expression: {opcode:?}")]
    InvalidElementInstruction { opcode: crate::types::Opcode },
    #[error("Expected value type {expected}, got {actual}")]
    ValueTypeMismatch {
        expected: crate::types::ValueType,
        actual: crate::types::ValueType,
    },
    #[error("Expected element type {expected}, got {actual}")]
    ElementTypeMismatch {
        expected: crate::types::ReferenceType,
        actual: crate::types::ReferenceType,
    },
    #[error("Duplicate export name {name}")]
    DuplicateExportName { name: String },
    #[error("Mutable globals cannot be imported")]
    MutableGlobalImported,
    #[error("Mutable globals cannot be exported")]
    MutableGlobalExported,
    #[error("Expected result type count of 0 or 1, got {count}")]
    TooManyResults { count: usize },
    #[error("Expected an empty exception result type, got {count} results")]
    NonEmptyEventResultType { count: usize },
    #[error("Too many memories, must be 1 or fewer")]
    TooManyMemories,
    #[error("Too many tables, must be 1 or fewer")]
    TooManyTables,
    #[error("Memories cannot be shared")]
    SharedMemoryDisabled,
    #[error("Tables cannot be shared")]
    SharedTable,
    #[error("Expected minimum {min} to be <= {max}")]
    LimitsMinOverMax { min: u32, max: u32 },
    #[error("Expected minimum {min} to be <= {cap}")]
    LimitsMinOverCap { min: u32, cap: u32 },
    #[error("Expected maximum {max} to be <= {cap}")]
    LimitsMaxOverCap { max: u32, cap: u32 },
    #[error("Expected start function to have 0 params, got {count}")]
    StartFunctionParams { count: usize },
    #[error("Expected start function to have 0 results, got {count}")]
    StartFunctionResults { count: usize },
    #[error("Undeclared function reference {index}")]
    UndeclaredFunctionReference { index: u32 },
    #[error("Expected {functions} code entries, got {codes}")]
    CodeCountMismatch { functions: usize, codes: usize },
    #[error("Unexpected code entry, only {count} functions are defined")]
    UnexpectedCode { count: usize },
    #[error("Too many locals: {count}")]
    TooManyLocals { count: u64 },
    #[error("Unbalanced end instruction in function body")]
    UnbalancedEnd,
    #[error("Function body is missing its terminating end instruction")]
    UnterminatedBody,
}

/// Everything the validator accumulates while walking one module. The entity
/// arrays grow append-only, with imported entries preceding defined ones, so
/// `imported_function_count` and `imported_global_count` are prefix lengths
/// into `functions` and `globals`.
///
/// A context lives for exactly one validation call.
pub struct Context<'a, 'e> {
    pub types: Vec<At<FunctionType>>,
    pub functions: Vec<At<crate::types::Function>>,
    pub tables: Vec<At<TableType>>,
    pub memories: Vec<At<MemoryType>>,
    pub globals: Vec<At<GlobalType>>,
    pub events: Vec<At<EventType>>,
    /// The element type of every element segment seen, in order.
    pub element_segments: Vec<crate::types::ReferenceType>,
    pub imported_function_count: usize,
    pub imported_global_count: usize,
    pub export_names: HashSet<&'a str>,
    /// Function indexes legalized for `ref.func` by element segments.
    pub declared_functions: HashSet<u32>,
    /// `ref.func` operands from global initializers, checked against
    /// `declared_functions` once the whole module has been walked.
    pub deferred_function_references: Vec<At<u32>>,
    /// The data count section's value, if one was present. Exposed for the
    /// function-body checker, which owns the cross-checks against the data
    /// section and the `memory.init`/`data.drop` operands.
    pub declared_data_count: Option<At<u32>>,
    pub features: Features,
    pub errors: &'e mut dyn ErrorSink,

    code_count: usize,
}

impl<'a, 'e> Context<'a, 'e> {
    pub fn new(features: Features, errors: &'e mut dyn ErrorSink) -> Self {
        Self {
            types: Vec::new(),
            functions: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            events: Vec::new(),
            element_segments: Vec::new(),
            imported_function_count: 0,
            imported_global_count: 0,
            export_names: HashSet::new(),
            declared_functions: HashSet::new(),
            deferred_function_references: Vec::new(),
            declared_data_count: None,
            features,
            errors,
            code_count: 0,
        }
    }

    // A decode context sharing this context's features and sink, for the
    // stretches where the validator drives the reader.
    pub(crate) fn decode_context(&mut self) -> DecodeContext<'_> {
        DecodeContext::new(self.features, &mut *self.errors)
    }

    pub(crate) fn report(&mut self, loc: Location, error: ValidationError) {
        self.errors.on_error(loc, error.to_string());
    }

    // Pushes a context frame around a call, popping it on every exit path.
    pub(crate) fn with_context<R>(
        &mut self,
        loc: Location,
        desc: &'static str,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.errors.push_context(loc, desc);
        let result = f(self);
        self.errors.pop_context();
        result
    }

    pub(crate) fn next_code_index(&mut self) -> usize {
        let index = self.imported_function_count + self.code_count;
        self.code_count += 1;
        index
    }
}

// The per-entity validation interface. The lifetime ties entities borrowing
// from the module buffer (names, in particular) to the context that records
// them.
pub(crate) trait Validate<'a> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool;
}

// Checks an index against the exclusive bound `max`, reporting with the
// given description on failure.
pub(crate) fn validate_index(
    index: At<u32>,
    max: usize,
    desc: &'static str,
    cx: &mut Context<'_, '_>,
) -> bool {
    if (*index as usize) >= max {
        cx.report(
            index.loc(),
            ValidationError::IndexOutOfBounds {
                desc,
                index: *index,
                max: max.min(u32::MAX as usize) as u32,
            },
        );
        return false;
    }
    true
}

/// Validates a module against the given context, reporting every problem
/// through the context's sink. The verdict is the AND of every per-entity
/// verdict; read errors also make it false.
///
/// Custom sections carry no semantics and are skipped.
pub fn validate<'a>(module: &LazyModule<'a>, cx: &mut Context<'a, '_>) -> bool {
    let mut valid = true;
    let mut sections = module.sections();
    loop {
        let section = {
            let mut dcx = cx.decode_context();
            sections.next(&mut dcx)
        };
        let Some(section) = section else {
            break;
        };
        match section {
            Section::Known(known) => valid &= validate_known_section(&known, cx),
            Section::Custom(_) => {}
        }
    }
    // Malformed, duplicated, or out-of-order section frames were reported by
    // the walker; they still fail the module.
    valid &= !sections.had_error();
    valid &= end_module(module.loc(), cx);
    valid
}

fn validate_known_section<'a>(section: &At<KnownSection<'a>>, cx: &mut Context<'a, '_>) -> bool {
    match *section.id {
        SectionId::Custom => unreachable!("custom sections are handled by the walker"),
        SectionId::Type => validate_entries::<FunctionType>(section, cx),
        SectionId::Import => validate_entries::<crate::types::Import<'a>>(section, cx),
        SectionId::Function => validate_entries::<crate::types::Function>(section, cx),
        SectionId::Table => validate_entries::<crate::types::Table>(section, cx),
        SectionId::Memory => validate_entries::<crate::types::Memory>(section, cx),
        SectionId::Global => validate_entries::<crate::types::Global>(section, cx),
        SectionId::Event => validate_entries::<crate::types::Event>(section, cx),
        SectionId::Export => validate_entries::<crate::types::Export<'a>>(section, cx),
        SectionId::Start => {
            let start = {
                let mut dcx = cx.decode_context();
                crate::decode::read_start_section(section, &mut dcx)
            };
            match start {
                Some(start) => start.validate(cx),
                None => false,
            }
        }
        SectionId::Element => validate_entries::<crate::types::ElementSegment>(section, cx),
        SectionId::DataCount => {
            let data_count = {
                let mut dcx = cx.decode_context();
                crate::decode::read_data_count_section(section, &mut dcx)
            };
            match data_count {
                Some(data_count) => data_count.validate(cx),
                None => false,
            }
        }
        SectionId::Code => validate_entries::<crate::types::Code<'a>>(section, cx),
        SectionId::Data => validate_entries::<crate::types::DataSegment<'a>>(section, cx),
    }
}

// Walks a count-prefixed section, validating each entry as it is decoded.
fn validate_entries<'a, T>(section: &At<KnownSection<'a>>, cx: &mut Context<'a, '_>) -> bool
where
    T: Decode<'a>,
    At<T>: Validate<'a>,
{
    let lazy = {
        let mut dcx = cx.decode_context();
        LazySection::<T>::read(section.data, &mut dcx)
    };
    let Some(lazy) = lazy else {
        return false;
    };

    let mut valid = true;
    let mut entries = lazy.entries();
    loop {
        let entry = {
            let mut dcx = cx.decode_context();
            entries.next(&mut dcx)
        };
        let Some(entry) = entry else {
            break;
        };
        valid &= entry.validate(cx);
    }
    valid & entries.finished()
}

// The end-of-module sweep: resolves every check that had to wait for the
// whole module.
fn end_module(module_loc: Location, cx: &mut Context<'_, '_>) -> bool {
    let end = Location::new(module_loc.end, module_loc.end);
    let mut valid = true;

    // Global initializers may reference functions only if an element segment
    // declared them. The globals came first, so the check lands here.
    let deferred = std::mem::take(&mut cx.deferred_function_references);
    for index in &deferred {
        if !cx.declared_functions.contains(&**index) {
            cx.report(
                index.loc(),
                ValidationError::UndeclaredFunctionReference { index: **index },
            );
            valid = false;
        }
    }
    cx.deferred_function_references = deferred;

    let defined_functions = cx.functions.len() - cx.imported_function_count;
    if cx.code_count != defined_functions {
        cx.report(
            end,
            ValidationError::CodeCountMismatch {
                functions: defined_functions,
                codes: cx.code_count,
            },
        );
        valid = false;
    }

    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parse_module;
    use crate::errors::BufferedErrors;
    use crate::validate_module;

    // Builds a module as header + (id, contents) sections. Lengths are
    // single-byte LEBs, which is plenty for these fixtures.
    fn module(sections: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut bytes = b"\0asm\x01\0\0\0".to_vec();
        for (id, contents) in sections {
            assert!(contents.len() < 0x80);
            bytes.push(*id);
            bytes.push(contents.len() as u8);
            bytes.extend_from_slice(contents);
        }
        bytes
    }

    // A count-prefixed section body.
    fn entries(items: &[&[u8]]) -> Vec<u8> {
        let mut bytes = vec![items.len() as u8];
        for item in items {
            bytes.extend_from_slice(item);
        }
        bytes
    }

    fn check(bytes: &[u8], features: Features) -> (bool, BufferedErrors) {
        let mut errors = BufferedErrors::new();
        let verdict = validate_module(bytes, features, &mut errors);
        (verdict, errors)
    }

    fn reference_types() -> Features {
        Features {
            reference_types: true,
            ..Features::mvp()
        }
    }

    const VOID_TYPE: &[u8] = &[0x60, 0x00, 0x00];
    const EMPTY_BODY: &[u8] = &[0x02, 0x00, 0x0b];

    #[test]
    fn smallest_valid_module() {
        let (verdict, errors) = check(b"\0asm\x01\0\0\0", Features::mvp());
        assert!(verdict);
        assert!(errors.is_empty());
    }

    #[test]
    fn bad_magic() {
        let (verdict, errors) = check(b"\x01asm\x01\0\0\0", Features::mvp());
        assert!(!verdict);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_reported()[0].loc.start, 0);
    }

    #[test]
    fn identity_function_module() {
        let bytes = module(&[
            (1, entries(&[&[0x60, 0x01, 0x7f, 0x01, 0x7f]])),
            (3, entries(&[&[0x00]])),
            (10, entries(&[&[0x04, 0x00, 0x20, 0x00, 0x0b]])),
        ]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(verdict, "{:?}", errors.as_reported());
        assert!(errors.is_empty());
    }

    #[test]
    fn constant_expression_cannot_use_a_mutable_global() {
        let bytes = module(&[
            // import "env" "g" (global (mut i32))
            (
                2,
                entries(&[&[0x03, b'e', b'n', b'v', 0x01, b'g', 0x03, 0x7f, 0x01]]),
            ),
            // global i32 (const), init: global.get 0
            (6, entries(&[&[0x7f, 0x00, 0x23, 0x00, 0x0b]])),
        ]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(errors.len(), 1);

        let diagnostic = &errors.as_reported()[0];
        assert_eq!(
            diagnostic.message,
            "A constant expression cannot contain a mutable global"
        );
        // The diagnostic points at the global.get immediate.
        let immediate_offset = bytes
            .windows(3)
            .position(|window| window == [0x23, 0x00, 0x0b])
            .unwrap()
            + 1;
        assert_eq!(
            diagnostic.loc,
            Location::new(immediate_offset, immediate_offset + 1)
        );
    }

    #[test]
    fn duplicate_export_names() {
        let export: &[u8] = &[0x01, b'x', 0x00, 0x00];
        let bytes = module(&[
            (1, entries(&[VOID_TYPE])),
            (3, entries(&[&[0x00]])),
            (7, entries(&[export, export])),
            (10, entries(&[EMPTY_BODY])),
        ]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_reported()[0].message, "Duplicate export name x");
    }

    #[test]
    fn deferred_function_reference_is_legalized_by_an_element_segment() {
        let sections: Vec<(u8, Vec<u8>)> = vec![
            (1, entries(&[VOID_TYPE])),
            (3, entries(&[&[0x00], &[0x00], &[0x00], &[0x00]])),
            // global funcref (const), init: ref.func 3
            (6, entries(&[&[0x70, 0x00, 0xd2, 0x03, 0x0b]])),
            // declared element segment over functions: [3]
            (9, entries(&[&[0x03, 0x00, 0x01, 0x03]])),
            (10, entries(&[EMPTY_BODY, EMPTY_BODY, EMPTY_BODY, EMPTY_BODY])),
        ];

        let bytes = module(&sections);
        let (verdict, errors) = check(&bytes, reference_types());
        assert!(verdict, "{:?}", errors.as_reported());

        // Without the element segment, the reference stays undeclared.
        let without_elements: Vec<_> = sections
            .iter()
            .filter(|(id, _)| *id != 9)
            .cloned()
            .collect();
        let bytes = module(&without_elements);
        let (verdict, errors) = check(&bytes, reference_types());
        assert!(!verdict);
        assert_eq!(errors.len(), 1);

        let diagnostic = &errors.as_reported()[0];
        assert_eq!(diagnostic.message, "Undeclared function reference 3");
        let immediate_offset = bytes
            .windows(3)
            .position(|window| window == [0xd2, 0x03, 0x0b])
            .unwrap()
            + 1;
        assert_eq!(diagnostic.loc.start, immediate_offset);
    }

    #[test]
    fn start_function_signature() {
        let bytes = module(&[
            (1, entries(&[&[0x60, 0x01, 0x7f, 0x00]])),
            (3, entries(&[&[0x00]])),
            (8, vec![0x00]),
            (10, entries(&[EMPTY_BODY])),
        ]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.as_reported()[0].message,
            "Expected start function to have 0 params, got 1"
        );
    }

    #[test]
    fn memory_page_bounds() {
        // min = 65537 is over the cap.
        let bytes = module(&[(5, entries(&[&[0x00, 0x81, 0x80, 0x04]]))]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Expected minimum 65537 to be <= 65536"
        );

        // min = max = 65536 is exactly at the cap.
        let bytes = module(&[(
            5,
            entries(&[&[0x01, 0x80, 0x80, 0x04, 0x80, 0x80, 0x04]]),
        )]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(verdict, "{:?}", errors.as_reported());
    }

    #[test]
    fn at_most_one_memory() {
        let bytes = module(&[(5, entries(&[&[0x00, 0x00], &[0x00, 0x00]]))]);
        let (verdict, errors) = check(&bytes, Features::all());
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Too many memories, must be 1 or fewer"
        );
    }

    #[test]
    fn multiple_tables_require_reference_types() {
        let table: &[u8] = &[0x70, 0x00, 0x00];
        let bytes = module(&[(4, entries(&[table, table]))]);

        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Too many tables, must be 1 or fewer"
        );

        let (verdict, _) = check(&bytes, reference_types());
        assert!(verdict);
    }

    #[test]
    fn shared_memories_require_threads() {
        let bytes = module(&[(5, entries(&[&[0x03, 0x01, 0x02]]))]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(errors.as_reported()[0].message, "Memories cannot be shared");

        let (verdict, _) = check(&bytes, Features::all());
        assert!(verdict);
    }

    #[test]
    fn multi_value_results_require_the_feature() {
        // () -> (i32, i32)
        let bytes = module(&[(1, entries(&[&[0x60, 0x00, 0x02, 0x7f, 0x7f]]))]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Expected result type count of 0 or 1, got 2"
        );

        let (verdict, _) = check(&bytes, Features::all());
        assert!(verdict);
    }

    #[test]
    fn data_count_is_recorded_for_the_body_checker() {
        let features = Features {
            bulk_memory: true,
            ..Features::mvp()
        };
        // The declared count disagrees with the data section; the mismatch
        // is the body checker's to flag, so the module passes here and the
        // count is surfaced on the context.
        let bytes = module(&[
            (5, entries(&[&[0x00, 0x01]])),
            (12, vec![0x02]),
            // One active data segment: offset i32.const 0, one byte.
            (11, entries(&[&[0x00, 0x41, 0x00, 0x0b, 0x01, 0xaa]])),
        ]);

        let mut errors = BufferedErrors::new();
        let module = {
            let mut dcx = DecodeContext::new(features, &mut errors);
            parse_module(&bytes, &mut dcx).unwrap()
        };
        let mut cx = Context::new(features, &mut errors);
        assert!(validate(&module, &mut cx));
        let declared_data_count = cx.declared_data_count.map(|count| *count);
        drop(cx);
        assert!(errors.is_empty());
        assert_eq!(declared_data_count, Some(2));
    }

    #[test]
    fn event_element_kind_is_bounded_by_the_event_count() {
        // A declared element segment listing event 0, with no events
        // declared. The format does not really define this, but the index is
        // still checked against the event index space.
        let features = Features {
            reference_types: true,
            exceptions: true,
            ..Features::mvp()
        };
        let bytes = module(&[(9, entries(&[&[0x03, 0x04, 0x01, 0x00]]))]);
        let (verdict, errors) = check(&bytes, features);
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Invalid index 0, must be less than 0"
        );
    }

    #[test]
    fn imports_prefix_the_index_spaces() {
        let bytes = module(&[
            (1, entries(&[VOID_TYPE])),
            // import "m" "f" (func (type 0))
            (2, entries(&[&[0x01, b'm', 0x01, b'f', 0x00, 0x00]])),
            (3, entries(&[&[0x00]])),
            (7, entries(&[&[0x01, b'g', 0x00, 0x01]])),
            (10, entries(&[EMPTY_BODY])),
        ]);

        let mut errors = BufferedErrors::new();
        let module = {
            let mut dcx = DecodeContext::new(Features::mvp(), &mut errors);
            parse_module(&bytes, &mut dcx).unwrap()
        };
        let mut cx = Context::new(Features::mvp(), &mut errors);
        assert!(validate(&module, &mut cx));

        assert_eq!(cx.imported_function_count, 1);
        assert_eq!(cx.functions.len(), 2);
        assert!(cx.imported_function_count <= cx.functions.len());
        assert!(cx.export_names.contains("g"));
    }

    #[test]
    fn validation_is_deterministic() {
        let bytes = module(&[
            (
                2,
                entries(&[&[0x03, b'e', b'n', b'v', 0x01, b'g', 0x03, 0x7f, 0x01]]),
            ),
            (6, entries(&[&[0x7f, 0x00, 0x23, 0x00, 0x0b]])),
        ]);
        let (first_verdict, first_errors) = check(&bytes, Features::mvp());
        let (second_verdict, second_errors) = check(&bytes, Features::mvp());
        assert_eq!(first_verdict, second_verdict);
        assert_eq!(first_errors.as_reported(), second_errors.as_reported());
    }

    #[test]
    fn event_sections_populate_the_context() {
        let features = Features {
            exceptions: true,
            ..Features::mvp()
        };
        // An event whose type has a (non-empty) result is rejected.
        let bytes = module(&[
            (1, entries(&[&[0x60, 0x00, 0x01, 0x7f]])),
            (13, entries(&[&[0x00, 0x00]])),
        ]);
        let (verdict, errors) = check(&bytes, features);
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Expected an empty exception result type, got 1 results"
        );

        // With an empty result type the same module is fine.
        let bytes = module(&[
            (1, entries(&[VOID_TYPE])),
            (13, entries(&[&[0x00, 0x00]])),
        ]);
        let (verdict, errors) = check(&bytes, features);
        assert!(verdict, "{:?}", errors.as_reported());
    }

    #[test]
    fn out_of_order_sections_fail_the_module() {
        let bytes = module(&[(7, entries(&[])), (5, entries(&[]))]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.as_reported()[0].message,
            "Section Memory out of order, must appear before Export"
        );
    }

    #[test]
    fn function_and_code_counts_must_agree() {
        let bytes = module(&[(1, entries(&[VOID_TYPE])), (3, entries(&[&[0x00]]))]);
        let (verdict, errors) = check(&bytes, Features::mvp());
        assert!(!verdict);
        assert_eq!(
            errors.as_reported()[0].message,
            "Expected 1 code entries, got 0"
        );
    }
}
