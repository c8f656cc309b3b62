// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Constant and element expression validation, and the set-up contract for
//! function-body checking.

use crate::at::{At, Location};
use crate::types::{
    BlockType, ConstantExpression, ElementExpression, Immediate, Instruction, Mutability, Opcode,
    ReferenceType, ValueType,
};

use super::{Context, ValidationError, validate_index};

/// Where a constant expression appears. Global initializers defer their
/// `ref.func` range checks to the end of the module, since the legalizing
/// element segment comes later (or not at all).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstantExpressionKind {
    GlobalInit,
    Other,
}

// Checks that `actual` matches the expected value type exactly.
fn validate_value_type(
    actual: At<ValueType>,
    expected: ValueType,
    cx: &mut Context<'_, '_>,
) -> bool {
    if *actual != expected {
        cx.report(
            actual.loc(),
            ValidationError::ValueTypeMismatch {
                expected,
                actual: *actual,
            },
        );
        return false;
    }
    true
}

// Checks that `actual` matches the expected reference type exactly.
fn validate_reference_type(
    actual: At<ReferenceType>,
    expected: ReferenceType,
    cx: &mut Context<'_, '_>,
) -> bool {
    if *actual != expected {
        cx.report(
            actual.loc(),
            ValidationError::ElementTypeMismatch {
                expected,
                actual: *actual,
            },
        );
        return false;
    }
    true
}

// Validates a constant expression: exactly one producing instruction, of an
// allowed opcode, whose result type equals `expected`. Globals referenced by
// `global.get` must be imported (`max_global_index` caps the usable prefix)
// and immutable.
pub(crate) fn validate_constant_expression(
    expr: &At<ConstantExpression>,
    kind: ConstantExpressionKind,
    expected: ValueType,
    max_global_index: usize,
    cx: &mut Context<'_, '_>,
) -> bool {
    cx.with_context(expr.loc(), "constant expression", |cx| {
        if expr.instructions.len() != 1 {
            cx.report(expr.loc(), ValidationError::ConstantExpressionTooLong);
            return false;
        }

        let mut valid = true;
        let instruction = &expr.instructions[0];
        let actual = match *instruction.opcode {
            Opcode::I32Const => ValueType::I32,
            Opcode::I64Const => ValueType::I64,
            Opcode::F32Const => ValueType::F32,
            Opcode::F64Const => ValueType::F64,

            Opcode::GlobalGet => {
                let Some(index) = instruction.index_immediate() else {
                    return false;
                };
                if !validate_index(index, max_global_index, "global index", cx) {
                    return false;
                }
                let global = cx.globals[*index as usize];
                if *global.mutability == Mutability::Var {
                    cx.report(
                        index.loc(),
                        ValidationError::MutableGlobalInConstantExpression,
                    );
                    valid = false;
                }
                *global.valtype
            }

            Opcode::RefNull => {
                let Some(reftype) = instruction.reference_type_immediate() else {
                    return false;
                };
                ValueType::from(*reftype)
            }

            Opcode::RefFunc => {
                let Some(index) = instruction.index_immediate() else {
                    return false;
                };
                if kind == ConstantExpressionKind::GlobalInit {
                    // ref.func indexes cannot be range-checked until the
                    // element section has declared them.
                    cx.deferred_function_references.push(index);
                    return valid;
                }
                if !validate_index(index, cx.functions.len(), "function index", cx) {
                    return false;
                }
                ValueType::FuncRef
            }

            opcode => {
                cx.report(
                    instruction.loc(),
                    ValidationError::InvalidConstantInstruction { opcode },
                );
                return false;
            }
        };

        valid &= validate_value_type(At::new(actual, instruction.loc()), expected, cx);
        valid
    })
}

// Validates an element expression: exactly one producing instruction of
// reference type, matching `expected`. `ref.func` operands become declared
// functions.
pub(crate) fn validate_element_expression(
    expr: &At<ElementExpression>,
    expected: ReferenceType,
    cx: &mut Context<'_, '_>,
) -> bool {
    cx.with_context(expr.loc(), "element expression", |cx| {
        if expr.instructions.len() != 1 {
            cx.report(expr.loc(), ValidationError::ElementExpressionTooLong);
            return false;
        }

        let mut valid = true;
        let instruction = &expr.instructions[0];
        let actual = match *instruction.opcode {
            Opcode::RefNull => {
                let Some(reftype) = instruction.reference_type_immediate() else {
                    return false;
                };
                *reftype
            }

            Opcode::RefFunc => {
                let Some(index) = instruction.index_immediate() else {
                    return false;
                };
                if !validate_index(index, cx.functions.len(), "function index", cx) {
                    valid = false;
                }
                cx.declared_functions.insert(*index);
                ReferenceType::FuncRef
            }

            opcode => {
                cx.report(
                    instruction.loc(),
                    ValidationError::InvalidElementInstruction { opcode },
                );
                return false;
            }
        };

        valid &= validate_reference_type(At::new(actual, instruction.loc()), expected, cx);
        valid
    })
}

/// One frame of the control stack a function-body checker maintains.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlFrame {
    /// The types produced at this frame's label.
    pub label_types: Vec<ValueType>,
}

/// The per-body state a function-body checker starts from: the declared
/// locals (parameters first), an empty operand stack, and a control stack
/// holding one frame labeled with the function's results.
///
/// The opcode-by-opcode operand typing belongs to the body checker; this
/// type only maintains the structure that checker is seeded with, plus the
/// frame balance that decides whether the body ends where it should.
#[derive(Clone, Debug)]
pub struct CodeContext {
    pub locals: Vec<ValueType>,
    pub operands: Vec<ValueType>,
    pub frames: Vec<ControlFrame>,
}

/// Opens the body-validation context for the next code entry: resolves which
/// function the entry belongs to and seeds a [`CodeContext`] from its type.
pub fn begin_code(loc: Location, cx: &mut Context<'_, '_>) -> Option<CodeContext> {
    let index = cx.next_code_index();
    if index >= cx.functions.len() {
        let count = cx.functions.len();
        cx.report(loc, ValidationError::UnexpectedCode { count });
        return None;
    }
    let type_index = **cx.functions[index].type_index as usize;
    // An out-of-range type index was already reported when the function
    // section was validated.
    let entry = cx.types.get(type_index)?;
    Some(CodeContext {
        locals: entry.params.clone(),
        operands: Vec::new(),
        frames: vec![ControlFrame {
            label_types: entry.results.clone(),
        }],
    })
}

impl CodeContext {
    /// Appends one run of declared locals.
    pub fn declare_locals(&mut self, count: u32, valtype: ValueType) {
        self.locals
            .extend(core::iter::repeat_n(valtype, count as usize));
    }

    // Feeds one instruction through the structural part of body checking:
    // frame balance. Typing is the body checker's job.
    pub(crate) fn step(&mut self, instruction: &At<Instruction>, cx: &mut Context<'_, '_>) -> bool {
        match *instruction.opcode {
            Opcode::Block | Opcode::Loop | Opcode::If | Opcode::Try => {
                let label_types = match &instruction.immediate {
                    Immediate::Block(block_type) => match **block_type {
                        BlockType::Void => Vec::new(),
                        BlockType::Result(valtype) => vec![valtype],
                        BlockType::TypeIndex(index) => cx
                            .types
                            .get(*index as usize)
                            .map(|entry| entry.results.clone())
                            .unwrap_or_default(),
                    },
                    _ => Vec::new(),
                };
                self.frames.push(ControlFrame { label_types });
                true
            }
            Opcode::End => {
                if self.frames.pop().is_none() {
                    cx.report(instruction.loc(), ValidationError::UnbalancedEnd);
                    return false;
                }
                true
            }
            _ => true,
        }
    }

    // The body has been fully decoded; exactly the implicit function frame
    // must have been popped by the final `end`.
    pub(crate) fn finish(&self, loc: Location, cx: &mut Context<'_, '_>) -> bool {
        if !self.frames.is_empty() {
            cx.report(loc, ValidationError::UnterminatedBody);
            return false;
        }
        true
    }
}
