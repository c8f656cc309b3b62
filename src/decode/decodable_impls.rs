// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Decode trait implementations for WebAssembly entities.

use crate::at::{At, Location};
use crate::types::*;

use super::{Decode, DecodeContext, ReadError, Reader};

macro_rules! impl_decode_for_u8_enum {
    ($type:ty, $desc:expr) => {
        impl<'a> Decode<'a> for $type {
            const DESC: &'static str = $desc;

            fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
                let byte = reader.read_u8($desc, cx)?;
                match Self::try_from(*byte) {
                    Ok(value) => Some(At::new(value, byte.loc())),
                    Err(_) => {
                        cx.report(
                            byte.loc(),
                            ReadError::BadTag {
                                desc: $desc,
                                byte: *byte,
                            },
                        );
                        None
                    }
                }
            }
        }
    };
}
pub(crate) use impl_decode_for_u8_enum;

macro_rules! impl_decode_for_index {
    ($type:ty, $desc:expr) => {
        impl<'a> Decode<'a> for $type {
            const DESC: &'static str = $desc;

            fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
                Some(reader.read_u32($desc, cx)?.map(Self::new))
            }
        }
    };
}

impl_decode_for_u8_enum!(ValueType, "value type");
impl_decode_for_u8_enum!(ReferenceType, "reference type");
impl_decode_for_u8_enum!(Mutability, "mutability");
impl_decode_for_u8_enum!(ExternalKind, "external kind");
impl_decode_for_u8_enum!(EventAttribute, "event attribute");

impl_decode_for_index!(TypeIdx, "type index");
impl_decode_for_index!(FuncIdx, "function index");
impl_decode_for_index!(TableIdx, "table index");
impl_decode_for_index!(MemIdx, "memory index");
impl_decode_for_index!(GlobalIdx, "global index");
impl_decode_for_index!(EventIdx, "event index");
impl_decode_for_index!(ElemIdx, "element index");
impl_decode_for_index!(DataIdx, "data index");
impl_decode_for_index!(LocalIdx, "local index");
impl_decode_for_index!(LabelIdx, "label index");

// Reads a count-prefixed vector of entities.
pub(crate) fn read_vec<'a, T: Decode<'a>>(
    reader: &mut Reader<'a>,
    cx: &mut DecodeContext<'_>,
    desc: &'static str,
) -> Option<Vec<At<T>>> {
    let count = reader.read_u32(desc, cx)?;
    let mut items = Vec::new();
    for _ in 0..*count {
        items.push(reader.read::<T>(cx)?);
    }
    Some(items)
}

impl<'a> Decode<'a> for FunctionType {
    const DESC: &'static str = "function type";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        const FUNCTION_TYPE_TAG: u8 = 0x60;

        let start = reader.pos();
        let tag = reader.read_u8("function type tag", cx)?;
        if *tag != FUNCTION_TYPE_TAG {
            cx.report(
                tag.loc(),
                ReadError::BadTag {
                    desc: "function type tag",
                    byte: *tag,
                },
            );
            return None;
        }
        let params = read_vec::<ValueType>(reader, cx, "parameter count")?;
        let results = read_vec::<ValueType>(reader, cx, "result count")?;
        Some(reader.locate(
            start,
            Self {
                params: params.into_iter().map(At::into_value).collect(),
                results: results.into_iter().map(At::into_value).collect(),
            },
        ))
    }
}

impl<'a> Decode<'a> for Limits {
    const DESC: &'static str = "limits";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let flags = reader.read_u8("limits flags", cx)?;
        let (shared, has_max) = match *flags {
            0x00 => (Shared::No, false),
            0x01 => (Shared::No, true),
            0x03 => (Shared::Yes, true),
            byte => {
                cx.report(
                    flags.loc(),
                    ReadError::BadTag {
                        desc: "limits flags",
                        byte,
                    },
                );
                return None;
            }
        };
        let min = reader.read_u32("limits minimum", cx)?;
        let max = if has_max {
            Some(reader.read_u32("limits maximum", cx)?)
        } else {
            None
        };
        Some(reader.locate(start, Self { min, max, shared }))
    }
}

impl<'a> Decode<'a> for TableType {
    const DESC: &'static str = "table type";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let elemtype = reader.read::<ReferenceType>(cx)?;
        let limits = reader.read::<Limits>(cx)?;
        Some(reader.locate(start, Self { elemtype, limits }))
    }
}

impl<'a> Decode<'a> for MemoryType {
    const DESC: &'static str = "memory type";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let limits = reader.read::<Limits>(cx)?;
        Some(reader.locate(start, Self { limits }))
    }
}

impl<'a> Decode<'a> for GlobalType {
    const DESC: &'static str = "global type";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let valtype = reader.read::<ValueType>(cx)?;
        let mutability = reader.read::<Mutability>(cx)?;
        Some(reader.locate(
            start,
            Self {
                valtype,
                mutability,
            },
        ))
    }
}

impl<'a> Decode<'a> for EventType {
    const DESC: &'static str = "event type";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let attribute = reader.read::<EventAttribute>(cx)?;
        let type_index = reader.read::<TypeIdx>(cx)?;
        Some(reader.locate(
            start,
            Self {
                attribute,
                type_index,
            },
        ))
    }
}

impl<'a> Decode<'a> for Import<'a> {
    const DESC: &'static str = "import";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let module = reader.read_name("module name", cx)?;
        let name = reader.read_name("import name", cx)?;
        let kind = reader.read::<ExternalKind>(cx)?;
        let desc = match *kind {
            ExternalKind::Function => ImportDesc::Function(reader.read::<TypeIdx>(cx)?),
            ExternalKind::Table => ImportDesc::Table(reader.read::<TableType>(cx)?),
            ExternalKind::Memory => ImportDesc::Memory(reader.read::<MemoryType>(cx)?),
            ExternalKind::Global => ImportDesc::Global(reader.read::<GlobalType>(cx)?),
            ExternalKind::Event => {
                if !cx.features.exceptions {
                    cx.report(
                        kind.loc(),
                        ReadError::RequiresFeature {
                            what: "An event import",
                            feature: "exceptions",
                        },
                    );
                    return None;
                }
                ImportDesc::Event(reader.read::<EventType>(cx)?)
            }
        };
        Some(reader.locate(start, Self { module, name, desc }))
    }
}

impl<'a> Decode<'a> for Function {
    const DESC: &'static str = "function";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let type_index = reader.read::<TypeIdx>(cx)?;
        Some(reader.locate(start, Self { type_index }))
    }
}

impl<'a> Decode<'a> for Table {
    const DESC: &'static str = "table";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let table_type = reader.read::<TableType>(cx)?;
        Some(reader.locate(start, Self { table_type }))
    }
}

impl<'a> Decode<'a> for Memory {
    const DESC: &'static str = "memory";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let memory_type = reader.read::<MemoryType>(cx)?;
        Some(reader.locate(start, Self { memory_type }))
    }
}

impl<'a> Decode<'a> for Global {
    const DESC: &'static str = "global";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let global_type = reader.read::<GlobalType>(cx)?;
        let init = reader.read::<ConstantExpression>(cx)?;
        Some(reader.locate(start, Self { global_type, init }))
    }
}

impl<'a> Decode<'a> for Event {
    const DESC: &'static str = "event";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let event_type = reader.read::<EventType>(cx)?;
        Some(reader.locate(start, Self { event_type }))
    }
}

impl<'a> Decode<'a> for Export<'a> {
    const DESC: &'static str = "export";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let name = reader.read_name("export name", cx)?;
        let kind = reader.read::<ExternalKind>(cx)?;
        let index = reader.read_u32("export index", cx)?;
        Some(reader.locate(start, Self { kind, name, index }))
    }
}

impl<'a> Decode<'a> for Start {
    const DESC: &'static str = "start";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let func_index = reader.read::<FuncIdx>(cx)?;
        Some(reader.locate(start, Self { func_index }))
    }
}

// Reads instructions up to and including the terminating `end`, which is not
// included in the returned sequence.
fn read_expression_instructions<'a>(
    reader: &mut Reader<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<Vec<At<Instruction>>> {
    let mut instructions = Vec::new();
    loop {
        let instruction = reader.read::<Instruction>(cx)?;
        if *instruction.opcode == Opcode::End {
            return Some(instructions);
        }
        instructions.push(instruction);
    }
}

impl<'a> Decode<'a> for ConstantExpression {
    const DESC: &'static str = "constant expression";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let instructions = read_expression_instructions(reader, cx)?;
        Some(reader.locate(start, Self { instructions }))
    }
}

impl<'a> Decode<'a> for ElementExpression {
    const DESC: &'static str = "element expression";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let instructions = read_expression_instructions(reader, cx)?;
        Some(reader.locate(start, Self { instructions }))
    }
}

impl<'a> Decode<'a> for ElementSegment {
    const DESC: &'static str = "element segment";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let flags = reader.read_u32("element segment flags", cx)?;
        if *flags != 0 && !cx.features.bulk_memory && !cx.features.reference_types {
            cx.report(
                flags.loc(),
                ReadError::RequiresFeature {
                    what: "This element segment form",
                    feature: "bulk_memory",
                },
            );
            return None;
        }

        // The flags word is a bitfield: bit 0 selects passive/declared over
        // active, bit 1 selects an explicit table index (active) or the
        // declared mode (passive), and bit 2 selects expressions over
        // indexes.
        let segment = match *flags {
            0 | 2 => {
                let table_index = if *flags == 2 {
                    Some(reader.read::<TableIdx>(cx)?)
                } else {
                    Some(At::new(TableIdx::new(0), flags.loc()))
                };
                let offset = reader.read::<ConstantExpression>(cx)?;
                let kind = if *flags == 2 {
                    reader.read::<ExternalKind>(cx)?
                } else {
                    At::new(ExternalKind::Function, flags.loc())
                };
                Self {
                    mode: SegmentMode::Active,
                    table_index,
                    offset: Some(offset),
                    elements: ElementPayload::Indexes {
                        kind,
                        list: read_vec::<u32>(reader, cx, "index count")?,
                    },
                }
            }
            1 | 3 => Self {
                mode: if *flags == 1 {
                    SegmentMode::Passive
                } else {
                    SegmentMode::Declared
                },
                table_index: None,
                offset: None,
                elements: ElementPayload::Indexes {
                    kind: reader.read::<ExternalKind>(cx)?,
                    list: read_vec::<u32>(reader, cx, "index count")?,
                },
            },
            4 | 6 => {
                let table_index = if *flags == 6 {
                    Some(reader.read::<TableIdx>(cx)?)
                } else {
                    Some(At::new(TableIdx::new(0), flags.loc()))
                };
                let offset = reader.read::<ConstantExpression>(cx)?;
                let elemtype = if *flags == 6 {
                    reader.read::<ReferenceType>(cx)?
                } else {
                    At::new(ReferenceType::FuncRef, flags.loc())
                };
                Self {
                    mode: SegmentMode::Active,
                    table_index,
                    offset: Some(offset),
                    elements: ElementPayload::Expressions {
                        elemtype,
                        list: read_vec::<ElementExpression>(reader, cx, "expression count")?,
                    },
                }
            }
            5 | 7 => Self {
                mode: if *flags == 5 {
                    SegmentMode::Passive
                } else {
                    SegmentMode::Declared
                },
                table_index: None,
                offset: None,
                elements: ElementPayload::Expressions {
                    elemtype: reader.read::<ReferenceType>(cx)?,
                    list: read_vec::<ElementExpression>(reader, cx, "expression count")?,
                },
            },
            other => {
                cx.report(
                    flags.loc(),
                    ReadError::BadFlags {
                        desc: "element segment",
                        flags: other,
                    },
                );
                return None;
            }
        };
        Some(reader.locate(start, segment))
    }
}

impl<'a> Decode<'a> for DataSegment<'a> {
    const DESC: &'static str = "data segment";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let flags = reader.read_u32("data segment flags", cx)?;
        if *flags != 0 && !cx.features.bulk_memory {
            cx.report(
                flags.loc(),
                ReadError::RequiresFeature {
                    what: "This data segment form",
                    feature: "bulk_memory",
                },
            );
            return None;
        }

        let segment = match *flags {
            0 | 2 => {
                let memory_index = if *flags == 2 {
                    Some(reader.read::<MemIdx>(cx)?)
                } else {
                    Some(At::new(MemIdx::new(0), flags.loc()))
                };
                let offset = reader.read::<ConstantExpression>(cx)?;
                let init = reader.read_sized_span("data segment contents", cx)?;
                Self {
                    mode: SegmentMode::Active,
                    memory_index,
                    offset: Some(offset),
                    init,
                }
            }
            1 => Self {
                mode: SegmentMode::Passive,
                memory_index: None,
                offset: None,
                init: reader.read_sized_span("data segment contents", cx)?,
            },
            other => {
                cx.report(
                    flags.loc(),
                    ReadError::BadFlags {
                        desc: "data segment",
                        flags: other,
                    },
                );
                return None;
            }
        };
        Some(reader.locate(start, segment))
    }
}

impl<'a> Decode<'a> for DataCount {
    const DESC: &'static str = "data count";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let count = reader.read_u32("data count", cx)?;
        Some(reader.locate(start, Self { count }))
    }
}

impl<'a> Decode<'a> for Locals {
    const DESC: &'static str = "locals";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let count = reader.read_u32("locals count", cx)?;
        let valtype = reader.read::<ValueType>(cx)?;
        Some(reader.locate(start, Self { count, valtype }))
    }
}

impl<'a> Decode<'a> for Code<'a> {
    const DESC: &'static str = "code";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let contents = reader.read_sized_span("code", cx)?;
        let mut body_reader = Reader::new(contents.into_value());
        let locals = read_vec::<Locals>(&mut body_reader, cx, "locals declaration count")?;
        let body = body_reader.rest();
        Some(reader.locate(
            start,
            Self {
                locals,
                body: At::new(body, body.loc()),
            },
        ))
    }
}

impl<'a> Decode<'a> for u32 {
    const DESC: &'static str = "index";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        reader.read_u32("index", cx)
    }
}

impl<'a> Decode<'a> for BlockType {
    const DESC: &'static str = "block type";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        const VOID_TAG: u8 = 0x40;

        let value = reader.read_s33("block type", cx)?;
        let block_type = if *value < 0 {
            // Negative one-byte values map back onto the raw type byte.
            let byte = (*value & 0x7f) as u8;
            if byte == VOID_TAG {
                BlockType::Void
            } else {
                match ValueType::try_from(byte) {
                    Ok(valtype) => BlockType::Result(valtype),
                    Err(_) => {
                        cx.report(
                            value.loc(),
                            ReadError::BadTag {
                                desc: "block type",
                                byte,
                            },
                        );
                        return None;
                    }
                }
            }
        } else {
            if !cx.features.multi_value {
                cx.report(
                    value.loc(),
                    ReadError::RequiresFeature {
                        what: "A block type index",
                        feature: "multi_value",
                    },
                );
                return None;
            }
            BlockType::TypeIndex(TypeIdx::new(*value as u32))
        };
        Some(At::new(block_type, value.loc()))
    }
}

fn read_mem_arg<'a>(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<MemArg>> {
    let start = reader.pos();
    let align_log2 = reader.read_u32("alignment", cx)?;
    let offset = reader.read_u32("offset", cx)?;
    Some(reader.locate(start, MemArg { align_log2, offset }))
}

fn read_immediate<'a>(
    reader: &mut Reader<'a>,
    cx: &mut DecodeContext<'_>,
    opcode: Opcode,
) -> Option<Immediate> {
    let start = reader.pos();
    let immediate = match opcode.immediate_kind() {
        ImmediateKind::None => Immediate::None,
        ImmediateKind::BlockType => Immediate::Block(reader.read::<BlockType>(cx)?),
        ImmediateKind::Index => Immediate::Index(reader.read_u32("index", cx)?),
        ImmediateKind::CallIndirect => {
            let type_index = reader.read::<TypeIdx>(cx)?;
            let table_index = reader.read_u32("table index", cx)?;
            Immediate::CallIndirect(reader.locate(
                start,
                CallIndirectImmediate {
                    type_index,
                    table_index,
                },
            ))
        }
        ImmediateKind::BrTable => {
            let targets = read_vec::<u32>(reader, cx, "target count")?;
            let default_target = reader.read_u32("default target", cx)?;
            Immediate::BrTable(reader.locate(
                start,
                BrTableImmediate {
                    targets,
                    default_target,
                },
            ))
        }
        ImmediateKind::BrOnExn => {
            let target = reader.read_u32("target", cx)?;
            let event_index = reader.read_u32("event index", cx)?;
            Immediate::BrOnExn(reader.locate(
                start,
                BrOnExnImmediate {
                    target,
                    event_index,
                },
            ))
        }
        ImmediateKind::U8 => Immediate::U8(reader.read_u8("reserved byte", cx)?),
        ImmediateKind::MemArg => Immediate::MemArg(read_mem_arg(reader, cx)?),
        ImmediateKind::S32 => Immediate::S32(reader.read_s32("i32 constant", cx)?),
        ImmediateKind::S64 => Immediate::S64(reader.read_s64("i64 constant", cx)?),
        ImmediateKind::F32 => Immediate::F32(reader.read_f32("f32 constant", cx)?),
        ImmediateKind::F64 => Immediate::F64(reader.read_f64("f64 constant", cx)?),
        ImmediateKind::V128 => Immediate::V128(reader.read_array::<16>("v128 constant", cx)?),
        ImmediateKind::RefType => Immediate::RefType(reader.read::<ReferenceType>(cx)?),
        ImmediateKind::SelectT => {
            let types = read_vec::<ValueType>(reader, cx, "type count")?;
            Immediate::SelectT(reader.locate(
                start,
                types.into_iter().map(At::into_value).collect(),
            ))
        }
        ImmediateKind::Init => {
            let segment = reader.read_u32("segment index", cx)?;
            let destination = reader.read_u8("destination index", cx)?;
            Immediate::Init(reader.locate(
                start,
                InitImmediate {
                    segment,
                    destination,
                },
            ))
        }
        ImmediateKind::Copy => {
            let src = reader.read_u8("source index", cx)?;
            let dst = reader.read_u8("destination index", cx)?;
            Immediate::Copy(reader.locate(start, CopyImmediate { src, dst }))
        }
        ImmediateKind::Shuffle => Immediate::Shuffle(reader.read_array::<16>("lanes", cx)?),
        ImmediateKind::SimdLane => Immediate::SimdLane(reader.read_u8("lane", cx)?),
        ImmediateKind::SimdMemLane => {
            let mem_arg = read_mem_arg(reader, cx)?;
            let lane = reader.read_u8("lane", cx)?;
            Immediate::MemArgLane(mem_arg, lane)
        }
    };
    Some(immediate)
}

impl<'a> Decode<'a> for Instruction {
    const DESC: &'static str = "instruction";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let prefix = reader.read_u8("opcode", cx)?;
        let code = match *prefix {
            BULK_PREFIX | SIMD_PREFIX | ATOMIC_PREFIX => {
                let sub = reader.read_u32("opcode", cx)?;
                if *sub > 0xff {
                    cx.report(
                        Location::new(start, reader.pos()),
                        ReadError::UnknownOpcode { opcode: *sub },
                    );
                    return None;
                }
                (u32::from(*prefix) << 8) | *sub
            }
            byte => u32::from(byte),
        };
        let opcode_loc = Location::new(start, reader.pos());
        let opcode = match Opcode::try_from(code) {
            Ok(opcode) => At::new(opcode, opcode_loc),
            Err(_) => {
                cx.report(opcode_loc, ReadError::UnknownOpcode { opcode: code });
                return None;
            }
        };
        if let Some(feature) = opcode.missing_feature(&cx.features) {
            cx.report(
                opcode_loc,
                ReadError::DisabledOpcode {
                    opcode: *opcode,
                    feature,
                },
            );
            return None;
        }
        let immediate = read_immediate(reader, cx, *opcode)?;
        Some(reader.locate(start, Self { opcode, immediate }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at::{Location, Span};
    use crate::errors::BufferedErrors;
    use crate::features::Features;

    fn decode_one<'a, T: Decode<'a>>(
        bytes: &'a [u8],
        features: Features,
    ) -> (Option<At<T>>, BufferedErrors) {
        let mut errors = BufferedErrors::new();
        let value = {
            let mut cx = DecodeContext::new(features, &mut errors);
            let mut reader = Reader::new(Span::new(bytes));
            reader.read::<T>(&mut cx)
        };
        (value, errors)
    }

    #[test]
    fn function_type() {
        // (i32, i64) -> (f32)
        let bytes = [0x60, 0x02, 0x7f, 0x7e, 0x01, 0x7d];
        let (ty, errors) = decode_one::<FunctionType>(&bytes, Features::mvp());
        let ty = ty.unwrap();
        assert!(errors.is_empty());
        assert_eq!(ty.params, vec![ValueType::I32, ValueType::I64]);
        assert_eq!(ty.results, vec![ValueType::F32]);
        assert_eq!(ty.loc(), Location::new(0, 6));
    }

    #[test]
    fn function_type_requires_its_tag() {
        let bytes = [0x5f, 0x00, 0x00];
        let (ty, errors) = decode_one::<FunctionType>(&bytes, Features::mvp());
        assert!(ty.is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "Invalid function type tag: 0x5f"
        );
    }

    #[test]
    fn limits_flags() {
        let (limits, _) = decode_one::<Limits>(&[0x00, 0x01], Features::mvp());
        let limits = limits.unwrap();
        assert_eq!(*limits.min, 1);
        assert_eq!(limits.max, None);
        assert_eq!(limits.shared, Shared::No);

        let (limits, _) = decode_one::<Limits>(&[0x01, 0x01, 0x02], Features::mvp());
        let limits = limits.unwrap();
        assert_eq!(limits.max.map(|max| *max), Some(2));

        let (limits, _) = decode_one::<Limits>(&[0x03, 0x01, 0x02], Features::all());
        assert_eq!(limits.unwrap().shared, Shared::Yes);

        let (limits, errors) = decode_one::<Limits>(&[0x02, 0x01], Features::mvp());
        assert!(limits.is_none());
        assert_eq!(errors.as_reported()[0].message, "Invalid limits flags: 0x02");
    }

    #[test]
    fn import_with_global_descriptor() {
        // "env" "g" (global i32 mut)
        let bytes = [
            0x03, b'e', b'n', b'v', 0x01, b'g', 0x03, 0x7f, 0x01,
        ];
        let (import, errors) = decode_one::<Import<'_>>(&bytes, Features::mvp());
        let import = import.unwrap();
        assert!(errors.is_empty());
        assert_eq!(*import.module, "env");
        assert_eq!(*import.name, "g");
        let ImportDesc::Global(global_type) = import.desc else {
            panic!("expected a global import");
        };
        assert_eq!(*global_type.valtype, ValueType::I32);
        assert_eq!(*global_type.mutability, Mutability::Var);
    }

    #[test]
    fn event_imports_require_exceptions() {
        let bytes = [0x01, b'm', 0x01, b'e', 0x04, 0x00, 0x00];
        let (import, errors) = decode_one::<Import<'_>>(&bytes, Features::mvp());
        assert!(import.is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "An event import requires the exceptions feature"
        );

        let (import, _) = decode_one::<Import<'_>>(&bytes, Features::all());
        assert!(matches!(import.unwrap().desc, ImportDesc::Event(_)));
    }

    #[test]
    fn constant_expression_stops_at_end() {
        // i32.const 42; end
        let bytes = [0x41, 0x2a, 0x0b];
        let (expr, errors) = decode_one::<ConstantExpression>(&bytes, Features::mvp());
        let expr = expr.unwrap();
        assert!(errors.is_empty());
        assert_eq!(expr.instructions.len(), 1);
        assert_eq!(*expr.instructions[0].opcode, Opcode::I32Const);
        assert_eq!(
            expr.instructions[0].immediate,
            Immediate::S32(At::new(42, Location::new(1, 2)))
        );
        assert_eq!(expr.loc(), Location::new(0, 3));
    }

    #[test]
    fn unterminated_expression_is_a_read_error() {
        let bytes = [0x41, 0x2a];
        let (expr, errors) = decode_one::<ConstantExpression>(&bytes, Features::mvp());
        assert!(expr.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn instructions_gate_on_features() {
        // ref.func 3
        let bytes = [0xd2, 0x03];
        let (instruction, errors) = decode_one::<Instruction>(&bytes, Features::mvp());
        assert!(instruction.is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "Opcode RefFunc requires the reference_types feature"
        );

        let (instruction, _) = decode_one::<Instruction>(&bytes, Features::all());
        let instruction = instruction.unwrap();
        assert_eq!(*instruction.opcode, Opcode::RefFunc);
        assert_eq!(instruction.index_immediate().map(|idx| *idx), Some(3));
    }

    #[test]
    fn prefixed_instructions() {
        // memory.init 2 0
        let bytes = [0xfc, 0x08, 0x02, 0x00];
        let (instruction, _) = decode_one::<Instruction>(&bytes, Features::all());
        let instruction = instruction.unwrap();
        assert_eq!(*instruction.opcode, Opcode::MemoryInit);
        let Immediate::Init(init) = &instruction.immediate else {
            panic!("expected an init immediate");
        };
        assert_eq!(*init.segment, 2);
        assert_eq!(*init.destination, 0);

        // An undefined 0xfc subopcode.
        let bytes = [0xfc, 0x7f];
        let (instruction, errors) = decode_one::<Instruction>(&bytes, Features::all());
        assert!(instruction.is_none());
        assert_eq!(errors.as_reported()[0].message, "Unknown opcode 0xfc7f");
    }

    #[test]
    fn block_types() {
        let (bt, _) = decode_one::<BlockType>(&[0x40], Features::mvp());
        assert_eq!(*bt.unwrap(), BlockType::Void);

        let (bt, _) = decode_one::<BlockType>(&[0x7f], Features::mvp());
        assert_eq!(*bt.unwrap(), BlockType::Result(ValueType::I32));

        let (bt, errors) = decode_one::<BlockType>(&[0x01], Features::mvp());
        assert!(bt.is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "A block type index requires the multi_value feature"
        );

        let (bt, _) = decode_one::<BlockType>(&[0x01], Features::all());
        assert_eq!(*bt.unwrap(), BlockType::TypeIndex(TypeIdx::new(1)));
    }

    #[test]
    fn element_segment_forms() {
        // Flag 0: active, offset i32.const 0, [func 1, func 2]
        let bytes = [0x00, 0x41, 0x00, 0x0b, 0x02, 0x01, 0x02];
        let (segment, errors) = decode_one::<ElementSegment>(&bytes, Features::mvp());
        let segment = segment.unwrap();
        assert!(errors.is_empty());
        assert_eq!(segment.mode, SegmentMode::Active);
        assert_eq!(segment.table_index.map(|idx| *idx), Some(TableIdx::new(0)));
        assert_eq!(segment.elemtype(), ReferenceType::FuncRef);
        let ElementPayload::Indexes { kind, list } = &segment.elements else {
            panic!("expected an index payload");
        };
        assert_eq!(**kind, ExternalKind::Function);
        assert_eq!(list.iter().map(|idx| **idx).collect::<Vec<_>>(), vec![1, 2]);

        // Flag 1 (passive) requires bulk memory.
        let bytes = [0x01, 0x00, 0x00];
        let (segment, errors) = decode_one::<ElementSegment>(&bytes, Features::mvp());
        assert!(segment.is_none());
        assert_eq!(
            errors.as_reported()[0].message,
            "This element segment form requires the bulk_memory feature"
        );

        // Flag 5: passive expressions, funcref, [ref.null funcref]
        let bytes = [0x05, 0x70, 0x01, 0xd0, 0x70, 0x0b];
        let (segment, errors) = decode_one::<ElementSegment>(&bytes, Features::all());
        let segment = segment.unwrap();
        assert!(errors.is_empty());
        assert_eq!(segment.mode, SegmentMode::Passive);
        assert_eq!(segment.elemtype(), ReferenceType::FuncRef);
        let ElementPayload::Expressions { list, .. } = &segment.elements else {
            panic!("expected an expression payload");
        };
        assert_eq!(list.len(), 1);
        assert_eq!(*list[0].instructions[0].opcode, Opcode::RefNull);
    }

    #[test]
    fn located_entities_reparse_to_equal_values() {
        // Two function types back to back; re-parsing the second one's byte
        // range from its recorded location yields an equal value.
        let bytes = [
            0x60, 0x01, 0x7f, 0x01, 0x7f, //
            0x60, 0x02, 0x7e, 0x7c, 0x00,
        ];
        let mut errors = BufferedErrors::new();
        let mut cx = DecodeContext::new(Features::mvp(), &mut errors);
        let mut reader = Reader::new(Span::new(&bytes));
        let _first = reader.read::<FunctionType>(&mut cx).unwrap();
        let second = reader.read::<FunctionType>(&mut cx).unwrap();

        let loc = second.loc();
        let reparse_span = Span::with_offset(&bytes[loc.start..loc.end], loc.start);
        let mut reader = Reader::new(reparse_span);
        let reparsed = reader.read::<FunctionType>(&mut cx).unwrap();
        assert_eq!(second, reparsed);
        assert_eq!(second.loc(), reparsed.loc());
        assert!(errors.is_empty());
    }

    #[test]
    fn code_splits_locals_from_body() {
        // size 6: 1 locals run (2 x i64); local.get 0; end
        let bytes = [0x06, 0x01, 0x02, 0x7e, 0x20, 0x00, 0x0b];
        let (code, errors) = decode_one::<Code<'_>>(&bytes, Features::mvp());
        let code = code.unwrap();
        assert!(errors.is_empty());
        assert_eq!(code.locals.len(), 1);
        assert_eq!(*code.locals[0].count, 2);
        assert_eq!(*code.locals[0].valtype, ValueType::I64);
        assert_eq!(code.body.as_bytes(), &[0x20, 0x00, 0x0b]);
        assert_eq!(code.body.loc(), Location::new(4, 7));
    }
}
