// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Entities carried by the tool-convention custom sections: "linking",
//! "reloc.*", and "name".

use num_enum::TryFromPrimitive;

use crate::at::{At, Span};

/// The subsections of the "linking" custom section. Unknown ids are
/// tolerated and skipped by the walker.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum LinkingSubsectionId {
    SegmentInfo = 5,
    InitFunctions = 6,
    ComdatInfo = 7,
    SymbolTable = 8,
}

/// One subsection of the "linking" custom section, uninterpreted. The id is
/// kept raw so unknown subsections can be surfaced and skipped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LinkingSubsection<'a> {
    pub id: At<u8>,
    pub data: Span<'a>,
}

impl LinkingSubsection<'_> {
    /// The subsection id, if it is one this crate knows how to interpret.
    pub fn known_id(&self) -> Option<LinkingSubsectionId> {
        LinkingSubsectionId::try_from(*self.id).ok()
    }
}

/// Extra metadata about a data segment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SegmentInfo<'a> {
    pub name: At<&'a str>,
    pub align_log2: At<u32>,
    pub flags: At<u32>,
}

/// An entry of the init-functions subsection: a symbol to call at start-up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InitFunction {
    pub priority: At<u32>,
    /// Symbol index (not a function index).
    pub symbol_index: At<u32>,
}

/// The kind of a symbol listed in a COMDAT group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum ComdatSymbolKind {
    Data = 0,
    Function = 1,
    Global = 2,
    Event = 3,
    Table = 4,
    Section = 5,
}

/// One symbol belonging to a COMDAT group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ComdatSymbol {
    pub kind: At<ComdatSymbolKind>,
    pub index: At<u32>,
}

/// A COMDAT group: a named set of symbols of which only one instance may be
/// retained at link time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comdat<'a> {
    pub name: At<&'a str>,
    pub flags: At<u32>,
    pub symbols: Vec<At<ComdatSymbol>>,
}

/// The kind of a symbol-table entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum SymbolInfoKind {
    Function = 0,
    Data = 1,
    Global = 2,
    Section = 3,
    Event = 4,
}

/// The WASM_SYM_* flag word attached to every symbol.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SymbolFlags(pub u32);

impl SymbolFlags {
    pub const BINDING_WEAK: u32 = 0x01;
    pub const BINDING_LOCAL: u32 = 0x02;
    pub const VISIBILITY_HIDDEN: u32 = 0x04;
    pub const UNDEFINED: u32 = 0x10;
    pub const EXPORTED: u32 = 0x20;
    pub const EXPLICIT_NAME: u32 = 0x40;
    pub const NO_STRIP: u32 = 0x80;

    pub fn is_weak(&self) -> bool {
        self.0 & Self::BINDING_WEAK != 0
    }

    pub fn is_local(&self) -> bool {
        self.0 & Self::BINDING_LOCAL != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.0 & Self::VISIBILITY_HIDDEN != 0
    }

    pub fn is_undefined(&self) -> bool {
        self.0 & Self::UNDEFINED != 0
    }

    pub fn is_exported(&self) -> bool {
        self.0 & Self::EXPORTED != 0
    }

    pub fn has_explicit_name(&self) -> bool {
        self.0 & Self::EXPLICIT_NAME != 0
    }

    pub fn is_no_strip(&self) -> bool {
        self.0 & Self::NO_STRIP != 0
    }
}

/// The defined part of a data symbol.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DataSymbolDefinition {
    /// Index of the data segment holding the symbol.
    pub segment_index: At<u32>,
    pub offset: At<u32>,
    pub size: At<u32>,
}

/// One entry of the symbol table subsection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolInfo<'a> {
    /// A function, global, or event symbol: the index of the entity, plus a
    /// name when the symbol is defined or carries an explicit one.
    Base {
        kind: At<SymbolInfoKind>,
        flags: At<SymbolFlags>,
        index: At<u32>,
        name: Option<At<&'a str>>,
    },
    /// A data symbol: always named; segment/offset/size only when defined.
    Data {
        flags: At<SymbolFlags>,
        name: At<&'a str>,
        definition: Option<DataSymbolDefinition>,
    },
    /// A section symbol.
    Section {
        flags: At<SymbolFlags>,
        section_index: At<u32>,
    },
}

impl SymbolInfo<'_> {
    pub fn flags(&self) -> At<SymbolFlags> {
        match self {
            SymbolInfo::Base { flags, .. }
            | SymbolInfo::Data { flags, .. }
            | SymbolInfo::Section { flags, .. } => *flags,
        }
    }
}

/// The relocation kinds of the MVP tool conventions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum RelocationType {
    FunctionIndexLeb = 0,
    TableIndexSleb = 1,
    TableIndexI32 = 2,
    MemoryAddrLeb = 3,
    MemoryAddrSleb = 4,
    MemoryAddrI32 = 5,
    TypeIndexLeb = 6,
    GlobalIndexLeb = 7,
    FunctionOffsetI32 = 8,
    SectionOffsetI32 = 9,
    EventIndexLeb = 10,
}

impl RelocationType {
    /// Whether entries of this kind carry an addend field.
    pub fn has_addend(self) -> bool {
        matches!(
            self,
            RelocationType::MemoryAddrLeb
                | RelocationType::MemoryAddrSleb
                | RelocationType::MemoryAddrI32
                | RelocationType::FunctionOffsetI32
                | RelocationType::SectionOffsetI32
        )
    }
}

/// One entry of a "reloc.*" custom section.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelocationEntry {
    pub ty: At<RelocationType>,
    /// Offset of the value being relocated, relative to the start of the
    /// target section's contents.
    pub offset: At<u32>,
    /// Index of the symbol (or, in older producers, the entity) the value
    /// refers to.
    pub index: At<u32>,
    /// Present only for the kinds reported by [`RelocationType::has_addend`].
    pub addend: Option<At<i32>>,
}

/// The subsections of the "name" custom section.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum NameSubsectionId {
    ModuleName = 0,
    FunctionNames = 1,
    LocalNames = 2,
}

/// One subsection of the "name" custom section, uninterpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NameSubsection<'a> {
    pub id: At<u8>,
    pub data: Span<'a>,
}

impl NameSubsection<'_> {
    /// The subsection id, if it is one this crate knows how to interpret.
    pub fn known_id(&self) -> Option<NameSubsectionId> {
        NameSubsectionId::try_from(*self.id).ok()
    }
}

/// One entry of a name map: an index paired with its name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NameAssoc<'a> {
    pub index: At<u32>,
    pub name: At<&'a str>,
}

/// One entry of the local-names subsection: a function index paired with a
/// name map over its locals.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndirectNameAssoc<'a> {
    pub index: At<u32>,
    pub names: Vec<At<NameAssoc<'a>>>,
}
