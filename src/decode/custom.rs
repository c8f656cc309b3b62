// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Walkers for the tool-convention custom sections: "linking", "reloc.*",
//! and "name".

use crate::at::{At, Span};
use crate::types::*;

use super::decodable_impls::{impl_decode_for_u8_enum, read_vec};
use super::{Decode, DecodeContext, LazySection, ReadError, Reader};

/// The linking metadata version this crate understands.
pub const LINKING_VERSION: u32 = 2;

/// The "linking" custom section: a version followed by subsections.
#[derive(Clone, Copy, Debug)]
pub struct LinkingSection<'a> {
    pub version: At<u32>,
    subsections: Span<'a>,
}

/// Reads the version prefix of a "linking" custom section and exposes its
/// subsections.
pub fn read_linking_section<'a>(
    section: &CustomSection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LinkingSection<'a>> {
    let mut reader = Reader::new(section.data);
    let version = reader.read_u32("linking version", cx)?;
    if *version != LINKING_VERSION {
        cx.report(
            version.loc(),
            ReadError::BadLinkingVersion {
                version: *version,
                expected: LINKING_VERSION,
            },
        );
        return None;
    }
    Some(LinkingSection {
        version,
        subsections: reader.rest(),
    })
}

impl<'a> LinkingSection<'a> {
    /// A fresh traversal over the subsections. Subsections with ids this
    /// crate does not know are still yielded; their spans are simply opaque.
    pub fn subsections(&self) -> LinkingSubsections<'a> {
        LinkingSubsections {
            reader: Reader::new(self.subsections),
            failed: false,
        }
    }
}

/// One traversal over the subsections of a [`LinkingSection`].
pub struct LinkingSubsections<'a> {
    reader: Reader<'a>,
    failed: bool,
}

impl<'a> LinkingSubsections<'a> {
    pub fn next(&mut self, cx: &mut DecodeContext<'_>) -> Option<LinkingSubsection<'a>> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let result = (|| {
            let id = self.reader.read_u8("linking subsection id", cx)?;
            let data = self.reader.read_sized_span("linking subsection", cx)?;
            Some(LinkingSubsection {
                id,
                data: data.into_value(),
            })
        })();
        if result.is_none() {
            self.failed = true;
        }
        result
    }
}

// Requires that `subsection` carries the expected id, then wraps its span as
// a lazy sequence. Passing a subsection of the wrong kind is a caller bug.
fn typed_subsection<'a, T: Decode<'a>>(
    subsection: &LinkingSubsection<'a>,
    id: LinkingSubsectionId,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, T>> {
    debug_assert_eq!(subsection.known_id(), Some(id));
    LazySection::read(subsection.data, cx)
}

/// The entries of a segment-info subsection.
pub fn read_segment_infos<'a>(
    subsection: &LinkingSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, SegmentInfo<'a>>> {
    typed_subsection(subsection, LinkingSubsectionId::SegmentInfo, cx)
}

/// The entries of an init-functions subsection.
pub fn read_init_functions<'a>(
    subsection: &LinkingSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, InitFunction>> {
    typed_subsection(subsection, LinkingSubsectionId::InitFunctions, cx)
}

/// The entries of a COMDAT-info subsection.
pub fn read_comdats<'a>(
    subsection: &LinkingSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, Comdat<'a>>> {
    typed_subsection(subsection, LinkingSubsectionId::ComdatInfo, cx)
}

/// The entries of a symbol-table subsection.
pub fn read_symbol_table<'a>(
    subsection: &LinkingSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, SymbolInfo<'a>>> {
    typed_subsection(subsection, LinkingSubsectionId::SymbolTable, cx)
}

impl<'a> Decode<'a> for SegmentInfo<'a> {
    const DESC: &'static str = "segment info";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let name = reader.read_name("segment name", cx)?;
        let align_log2 = reader.read_u32("segment alignment", cx)?;
        let flags = reader.read_u32("segment flags", cx)?;
        Some(reader.locate(
            start,
            Self {
                name,
                align_log2,
                flags,
            },
        ))
    }
}

impl<'a> Decode<'a> for InitFunction {
    const DESC: &'static str = "init function";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let priority = reader.read_u32("priority", cx)?;
        let symbol_index = reader.read_u32("symbol index", cx)?;
        Some(reader.locate(
            start,
            Self {
                priority,
                symbol_index,
            },
        ))
    }
}

impl_decode_for_u8_enum!(ComdatSymbolKind, "comdat symbol kind");
impl_decode_for_u8_enum!(SymbolInfoKind, "symbol kind");
impl_decode_for_u8_enum!(RelocationType, "relocation type");

impl<'a> Decode<'a> for ComdatSymbol {
    const DESC: &'static str = "comdat symbol";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let kind = reader.read::<ComdatSymbolKind>(cx)?;
        let index = reader.read_u32("symbol index", cx)?;
        Some(reader.locate(start, Self { kind, index }))
    }
}

impl<'a> Decode<'a> for Comdat<'a> {
    const DESC: &'static str = "comdat";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let name = reader.read_name("comdat name", cx)?;
        let flags = reader.read_u32("comdat flags", cx)?;
        let symbols = read_vec::<ComdatSymbol>(reader, cx, "symbol count")?;
        Some(reader.locate(
            start,
            Self {
                name,
                flags,
                symbols,
            },
        ))
    }
}

impl<'a> Decode<'a> for SymbolInfo<'a> {
    const DESC: &'static str = "symbol";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let kind = reader.read::<SymbolInfoKind>(cx)?;
        let flags = reader.read_u32("symbol flags", cx)?.map(SymbolFlags);
        let info = match *kind {
            SymbolInfoKind::Function | SymbolInfoKind::Global | SymbolInfoKind::Event => {
                let index = reader.read_u32("symbol target index", cx)?;
                // Defined symbols are named inline; undefined ones borrow the
                // import's names unless an explicit name is present.
                let name = if !flags.is_undefined() || flags.has_explicit_name() {
                    Some(reader.read_name("symbol name", cx)?)
                } else {
                    None
                };
                SymbolInfo::Base {
                    kind,
                    flags,
                    index,
                    name,
                }
            }
            SymbolInfoKind::Data => {
                let name = reader.read_name("symbol name", cx)?;
                let definition = if !flags.is_undefined() {
                    Some(DataSymbolDefinition {
                        segment_index: reader.read_u32("segment index", cx)?,
                        offset: reader.read_u32("segment offset", cx)?,
                        size: reader.read_u32("symbol size", cx)?,
                    })
                } else {
                    None
                };
                SymbolInfo::Data {
                    flags,
                    name,
                    definition,
                }
            }
            SymbolInfoKind::Section => SymbolInfo::Section {
                flags,
                section_index: reader.read_u32("section index", cx)?,
            },
        };
        Some(reader.locate(start, info))
    }
}

/// A "reloc.*" custom section: the index of the section the relocations
/// apply to, followed by the entries.
#[derive(Clone, Copy, Debug)]
pub struct RelocationSection<'a> {
    pub section_index: At<u32>,
    pub entries: LazySection<'a, RelocationEntry>,
}

/// Reads the header of a "reloc.*" custom section.
pub fn read_relocation_section<'a>(
    section: &CustomSection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<RelocationSection<'a>> {
    let mut reader = Reader::new(section.data);
    let section_index = reader.read_u32("target section index", cx)?;
    let entries = LazySection::read(reader.rest(), cx)?;
    Some(RelocationSection {
        section_index,
        entries,
    })
}

impl<'a> Decode<'a> for RelocationEntry {
    const DESC: &'static str = "relocation";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let ty = reader.read::<RelocationType>(cx)?;
        let offset = reader.read_u32("relocation offset", cx)?;
        let index = reader.read_u32("relocation index", cx)?;
        let addend = if ty.has_addend() {
            Some(reader.read_s32("relocation addend", cx)?)
        } else {
            None
        };
        Some(reader.locate(
            start,
            Self {
                ty,
                offset,
                index,
                addend,
            },
        ))
    }
}

/// The "name" custom section, exposed as a traversal over its subsections.
#[derive(Clone, Copy, Debug)]
pub struct NameSection<'a> {
    subsections: Span<'a>,
}

/// Wraps a "name" custom section.
pub fn read_name_section<'a>(section: &CustomSection<'a>) -> NameSection<'a> {
    NameSection {
        subsections: section.data,
    }
}

impl<'a> NameSection<'a> {
    /// A fresh traversal over the subsections.
    pub fn subsections(&self) -> NameSubsections<'a> {
        NameSubsections {
            reader: Reader::new(self.subsections),
            failed: false,
        }
    }
}

/// One traversal over the subsections of a [`NameSection`].
pub struct NameSubsections<'a> {
    reader: Reader<'a>,
    failed: bool,
}

impl<'a> NameSubsections<'a> {
    pub fn next(&mut self, cx: &mut DecodeContext<'_>) -> Option<NameSubsection<'a>> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let result = (|| {
            let id = self.reader.read_u8("name subsection id", cx)?;
            let data = self.reader.read_sized_span("name subsection", cx)?;
            Some(NameSubsection {
                id,
                data: data.into_value(),
            })
        })();
        if result.is_none() {
            self.failed = true;
        }
        result
    }
}

/// Reads a module-name subsection.
pub fn read_module_name<'a>(
    subsection: &NameSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<At<&'a str>> {
    debug_assert_eq!(subsection.known_id(), Some(NameSubsectionId::ModuleName));
    Reader::new(subsection.data).read_name("module name", cx)
}

/// The name map of a function-names subsection.
pub fn read_function_names<'a>(
    subsection: &NameSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, NameAssoc<'a>>> {
    debug_assert_eq!(subsection.known_id(), Some(NameSubsectionId::FunctionNames));
    LazySection::read(subsection.data, cx)
}

/// The indirect name map of a local-names subsection.
pub fn read_local_names<'a>(
    subsection: &NameSubsection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<LazySection<'a, IndirectNameAssoc<'a>>> {
    debug_assert_eq!(subsection.known_id(), Some(NameSubsectionId::LocalNames));
    LazySection::read(subsection.data, cx)
}

impl<'a> Decode<'a> for NameAssoc<'a> {
    const DESC: &'static str = "name assoc";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let index = reader.read_u32("index", cx)?;
        let name = reader.read_name("name", cx)?;
        Some(reader.locate(start, Self { index, name }))
    }
}

impl<'a> Decode<'a> for IndirectNameAssoc<'a> {
    const DESC: &'static str = "indirect name assoc";

    fn decode(reader: &mut Reader<'a>, cx: &mut DecodeContext<'_>) -> Option<At<Self>> {
        let start = reader.pos();
        let index = reader.read_u32("function index", cx)?;
        let names = read_vec::<NameAssoc>(reader, cx, "name count")?;
        Some(reader.locate(start, Self { index, names }))
    }
}
