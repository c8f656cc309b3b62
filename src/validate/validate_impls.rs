// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Validate trait implementations for WebAssembly entities.
//!
//! The rules here mirror the section order: each implementation may consult
//! anything an earlier section put into the context, and appends whatever
//! later sections will need.

use crate::at::At;
use crate::decode::LazyExpression;
use crate::types::*;

use super::expr::{
    ConstantExpressionKind, begin_code, validate_constant_expression, validate_element_expression,
};
use super::{Context, Validate, ValidationError, validate_index};

// The WebAssembly limit on memory size, in 64 KiB pages.
const MAX_MEMORY_PAGES: u32 = 65536;

fn validate_limits(limits: &At<Limits>, cap: u32, cx: &mut Context<'_, '_>) -> bool {
    cx.with_context(limits.loc(), "limits", |cx| {
        let mut valid = true;
        if *limits.min > cap {
            cx.report(
                limits.min.loc(),
                ValidationError::LimitsMinOverCap {
                    min: *limits.min,
                    cap,
                },
            );
            valid = false;
        }
        if let Some(max) = limits.max {
            if *max > cap {
                cx.report(max.loc(), ValidationError::LimitsMaxOverCap { max: *max, cap });
                valid = false;
            }
            if *limits.min > *max {
                cx.report(
                    limits.min.loc(),
                    ValidationError::LimitsMinOverMax {
                        min: *limits.min,
                        max: *max,
                    },
                );
                valid = false;
            }
        }
        valid
    })
}

fn validate_table_type(table_type: &At<TableType>, cx: &mut Context<'_, '_>) -> bool {
    cx.with_context(table_type.loc(), "table type", |cx| {
        let mut valid = validate_limits(&table_type.limits, u32::MAX, cx);
        if table_type.limits.shared == Shared::Yes {
            cx.report(table_type.loc(), ValidationError::SharedTable);
            valid = false;
        }
        valid
    })
}

fn validate_memory_type(memory_type: &At<MemoryType>, cx: &mut Context<'_, '_>) -> bool {
    cx.with_context(memory_type.loc(), "memory type", |cx| {
        let mut valid = validate_limits(&memory_type.limits, MAX_MEMORY_PAGES, cx);
        if memory_type.limits.shared == Shared::Yes && !cx.features.threads {
            cx.report(memory_type.loc(), ValidationError::SharedMemoryDisabled);
            valid = false;
        }
        valid
    })
}

fn validate_event_type(event_type: &At<EventType>, cx: &mut Context<'_, '_>) -> bool {
    cx.with_context(event_type.loc(), "event type", |cx| {
        cx.events.push(*event_type);
        let type_index = event_type.type_index.map(|index| *index);
        if !validate_index(type_index, cx.types.len(), "event type index", cx) {
            return false;
        }
        let results = cx.types[*type_index as usize].results.len();
        if results != 0 {
            cx.report(
                event_type.loc(),
                ValidationError::NonEmptyEventResultType { count: results },
            );
            return false;
        }
        true
    })
}

impl<'a> Validate<'a> for At<FunctionType> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "type entry", |cx| {
            cx.types.push(self.clone());
            if self.results.len() > 1 && !cx.features.multi_value {
                cx.report(
                    self.loc(),
                    ValidationError::TooManyResults {
                        count: self.results.len(),
                    },
                );
                return false;
            }
            true
        })
    }
}

impl<'a> Validate<'a> for At<Import<'a>> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "import", |cx| match self.desc {
            ImportDesc::Function(type_index) => {
                let function = At::new(Function { type_index }, self.loc());
                let valid = function.validate(cx);
                cx.imported_function_count += 1;
                valid
            }
            ImportDesc::Table(table_type) => {
                At::new(Table { table_type }, self.loc()).validate(cx)
            }
            ImportDesc::Memory(memory_type) => {
                At::new(Memory { memory_type }, self.loc()).validate(cx)
            }
            ImportDesc::Global(global_type) => {
                cx.globals.push(global_type);
                cx.imported_global_count += 1;
                if *global_type.mutability == Mutability::Var && !cx.features.mutable_globals {
                    cx.report(global_type.loc(), ValidationError::MutableGlobalImported);
                    return false;
                }
                true
            }
            ImportDesc::Event(event_type) => {
                At::new(Event { event_type }, self.loc()).validate(cx)
            }
        })
    }
}

impl<'a> Validate<'a> for At<Function> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "function", |cx| {
            cx.functions.push(*self);
            let type_index = self.type_index.map(|index| *index);
            validate_index(type_index, cx.types.len(), "function type index", cx)
        })
    }
}

impl<'a> Validate<'a> for At<Table> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "table", |cx| {
            cx.tables.push(self.table_type);
            let mut valid = validate_table_type(&self.table_type, cx);
            if cx.tables.len() > 1 && !cx.features.reference_types {
                cx.report(self.loc(), ValidationError::TooManyTables);
                valid = false;
            }
            valid
        })
    }
}

impl<'a> Validate<'a> for At<Memory> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "memory", |cx| {
            cx.memories.push(self.memory_type);
            let mut valid = validate_memory_type(&self.memory_type, cx);
            if cx.memories.len() > 1 {
                cx.report(self.loc(), ValidationError::TooManyMemories);
                valid = false;
            }
            valid
        })
    }
}

impl<'a> Validate<'a> for At<Global> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "global", |cx| {
            cx.globals.push(self.global_type);
            // Only imported globals are in scope for this initializer:
            // defined globals cannot reference each other or themselves.
            validate_constant_expression(
                &self.init,
                ConstantExpressionKind::GlobalInit,
                *self.global_type.valtype,
                cx.imported_global_count,
                cx,
            )
        })
    }
}

impl<'a> Validate<'a> for At<Event> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "event", |cx| {
            validate_event_type(&self.event_type, cx)
        })
    }
}

impl<'a> Validate<'a> for At<Export<'a>> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "export", |cx| {
            let mut valid = true;
            if !cx.export_names.insert(*self.name) {
                cx.report(
                    self.loc(),
                    ValidationError::DuplicateExportName {
                        name: self.name.to_string(),
                    },
                );
                valid = false;
            }

            valid &= match *self.kind {
                ExternalKind::Function => {
                    validate_index(self.index, cx.functions.len(), "function index", cx)
                }
                ExternalKind::Table => {
                    validate_index(self.index, cx.tables.len(), "table index", cx)
                }
                ExternalKind::Memory => {
                    validate_index(self.index, cx.memories.len(), "memory index", cx)
                }
                ExternalKind::Global => {
                    if validate_index(self.index, cx.globals.len(), "global index", cx) {
                        let global = cx.globals[*self.index as usize];
                        if *global.mutability == Mutability::Var && !cx.features.mutable_globals {
                            cx.report(
                                self.index.loc(),
                                ValidationError::MutableGlobalExported,
                            );
                            false
                        } else {
                            true
                        }
                    } else {
                        false
                    }
                }
                ExternalKind::Event => {
                    validate_index(self.index, cx.events.len(), "event index", cx)
                }
            };
            valid
        })
    }
}

impl<'a> Validate<'a> for At<Start> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "start", |cx| {
            let func_index = self.func_index.map(|index| *index);
            if !validate_index(func_index, cx.functions.len(), "function index", cx) {
                return false;
            }

            let mut valid = true;
            let function = cx.functions[*func_index as usize];
            if let Some(entry) = cx.types.get(**function.type_index as usize) {
                let (params, results) = (entry.params.len(), entry.results.len());
                if params != 0 {
                    cx.report(
                        self.loc(),
                        ValidationError::StartFunctionParams { count: params },
                    );
                    valid = false;
                }
                if results != 0 {
                    cx.report(
                        self.loc(),
                        ValidationError::StartFunctionResults { count: results },
                    );
                    valid = false;
                }
            }
            valid
        })
    }
}

impl<'a> Validate<'a> for At<ElementSegment> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "element segment", |cx| {
            cx.element_segments.push(self.elemtype());
            let mut valid = true;

            if let Some(table_index) = self.table_index {
                valid &= validate_index(
                    table_index.map(|index| *index),
                    cx.tables.len(),
                    "table index",
                    cx,
                );
            }
            if let Some(offset) = &self.offset {
                valid &= validate_constant_expression(
                    offset,
                    ConstantExpressionKind::GlobalInit,
                    ValueType::I32,
                    cx.globals.len(),
                    cx,
                );
            }

            match &self.elements {
                ElementPayload::Indexes { kind, list } => {
                    let max_index = match **kind {
                        ExternalKind::Function => cx.functions.len(),
                        ExternalKind::Table => cx.tables.len(),
                        ExternalKind::Memory => cx.memories.len(),
                        ExternalKind::Global => cx.globals.len(),
                        ExternalKind::Event => cx.events.len(),
                    };
                    for index in list {
                        valid &= validate_index(*index, max_index, "index", cx);
                        if **kind == ExternalKind::Function {
                            cx.declared_functions.insert(**index);
                        }
                    }
                }
                ElementPayload::Expressions { elemtype, list } => {
                    for expr in list {
                        valid &= validate_element_expression(expr, **elemtype, cx);
                    }
                }
            }
            valid
        })
    }
}

impl<'a> Validate<'a> for At<DataCount> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.declared_data_count = Some(self.count);
        true
    }
}

impl<'a> Validate<'a> for At<DataSegment<'a>> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "data segment", |cx| {
            let mut valid = true;
            if let Some(memory_index) = self.memory_index {
                valid &= validate_index(
                    memory_index.map(|index| *index),
                    cx.memories.len(),
                    "memory index",
                    cx,
                );
            }
            if let Some(offset) = &self.offset {
                valid &= validate_constant_expression(
                    offset,
                    ConstantExpressionKind::Other,
                    ValueType::I32,
                    cx.globals.len(),
                    cx,
                );
            }
            valid
        })
    }
}

impl<'a> Validate<'a> for At<Code<'a>> {
    fn validate(&self, cx: &mut Context<'a, '_>) -> bool {
        cx.with_context(self.loc(), "code", |cx| {
            let Some(mut body) = begin_code(self.loc(), cx) else {
                return false;
            };

            let mut valid = true;
            let mut total = body.locals.len() as u64;
            for locals in &self.locals {
                total += u64::from(*locals.count);
                if total > u64::from(u32::MAX) {
                    cx.report(locals.loc(), ValidationError::TooManyLocals { count: total });
                    valid = false;
                    break;
                }
                body.declare_locals(*locals.count, *locals.valtype);
            }

            let expression = LazyExpression::new(self.body.into_value());
            let mut instructions = expression.instructions();
            let mut read_ok = true;
            loop {
                let instruction = {
                    let mut dcx = cx.decode_context();
                    let instruction = instructions.next(&mut dcx);
                    if instruction.is_none() {
                        read_ok = !instructions.failed();
                    }
                    instruction
                };
                let Some(instruction) = instruction else {
                    break;
                };
                valid &= body.step(&instruction, cx);
            }

            if read_ok {
                valid &= body.finish(self.body.loc(), cx);
            } else {
                valid = false;
            }
            valid
        })
    }
}
