// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The module walker: header verification and section framing.

use crate::at::{At, Location, Span};
use crate::types::{
    Code, CustomSection, DataCount, DataSegment, ElementSegment, Event, Export, Function,
    FunctionType, Global, Import, KnownSection, Memory, Section, SectionId, Start, Table,
};

use super::{Decode, DecodeContext, LazySection, ReadError, Reader};

const MAGIC: u32 = 0x6d73_6100; // '\0asm', little-endian
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 8;

/// A module whose header has been verified but whose sections have not been
/// decoded. Traversing [`LazyModule::sections`] parses section frames on
/// demand; the entities inside each frame stay undecoded until a
/// section-specific lazy sequence walks them.
#[derive(Clone, Copy, Debug)]
pub struct LazyModule<'a> {
    sections: Span<'a>,
}

/// Verifies the 8-byte module header and returns a lazy view of the rest.
///
/// The features in `cx` govern which constructs the per-section readers will
/// later accept; the walk itself is feature-independent.
pub fn parse_module<'a>(bytes: &'a [u8], cx: &mut DecodeContext<'_>) -> Option<LazyModule<'a>> {
    let span = Span::new(bytes);
    let mut reader = Reader::new(span);

    let magic = reader.read_array::<4>("magic number", cx)?;
    let magic_value = u32::from_le_bytes(magic.into_value());
    if magic_value != MAGIC {
        cx.report(magic.loc(), ReadError::BadMagic { magic: magic_value });
        return None;
    }

    let version = reader.read_array::<4>("version", cx)?;
    let version_value = u32::from_le_bytes(version.into_value());
    if version_value != VERSION {
        cx.report(
            version.loc(),
            ReadError::BadVersion {
                version: version_value,
            },
        );
        return None;
    }

    Some(LazyModule {
        sections: span.slice(HEADER_SIZE, span.len()),
    })
}

impl<'a> LazyModule<'a> {
    /// The byte range the module's sections cover (everything after the
    /// header).
    pub fn loc(&self) -> Location {
        self.sections.loc()
    }

    /// A fresh traversal over the module's sections.
    pub fn sections(&self) -> Sections<'a> {
        Sections {
            reader: Reader::new(self.sections),
            last_known: None,
            failed: false,
            had_error: false,
        }
    }

    /// A fresh traversal as a standard iterator.
    pub fn iter<'c, 'e>(&self, cx: &'c mut DecodeContext<'e>) -> SectionsIter<'a, 'c, 'e> {
        SectionsIter {
            sections: self.sections(),
            cx,
        }
    }
}

/// One traversal over a module's sections.
///
/// Known sections must appear at most once and in the canonical order (the
/// `PartialOrd` on [`SectionId`]); a section violating that is reported and
/// skipped, and the walk resumes at the next frame. Custom sections may
/// appear anywhere.
pub struct Sections<'a> {
    reader: Reader<'a>,
    last_known: Option<SectionId>,
    failed: bool,
    had_error: bool,
}

impl<'a> Sections<'a> {
    /// Whether any section frame was malformed, duplicated, or out of order
    /// so far in this traversal.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn next(&mut self, cx: &mut DecodeContext<'_>) -> Option<Section<'a>> {
        loop {
            if self.failed || self.reader.is_empty() {
                return None;
            }

            let start = self.reader.pos();
            let id_byte = match self.reader.read_u8("section id", cx) {
                Some(byte) => byte,
                None => {
                    self.failed = true;
                    self.had_error = true;
                    return None;
                }
            };
            let id = match SectionId::try_from(*id_byte) {
                Ok(id) => At::new(id, id_byte.loc()),
                Err(_) => {
                    cx.report(
                        id_byte.loc(),
                        ReadError::BadTag {
                            desc: "section id",
                            byte: *id_byte,
                        },
                    );
                    self.failed = true;
                    self.had_error = true;
                    return None;
                }
            };
            let data = match self.reader.read_sized_span("section contents", cx) {
                Some(data) => data,
                None => {
                    self.failed = true;
                    self.had_error = true;
                    return None;
                }
            };
            let loc = Location::new(start, self.reader.pos());

            if *id == SectionId::Custom {
                let mut contents = Reader::new(data.into_value());
                let Some(name) = contents.read_name("custom section name", cx) else {
                    // The frame is intact, so the walk can continue with the
                    // next section.
                    self.had_error = true;
                    continue;
                };
                let section = CustomSection {
                    name,
                    data: contents.rest(),
                };
                return Some(Section::Custom(At::new(section, loc)));
            }

            // The section-order state machine: a known id must be strictly
            // greater than the last known id seen. On violation the section
            // is skipped and the previous state is kept.
            if let Some(last) = self.last_known {
                if *id == last {
                    cx.report(id.loc(), ReadError::DuplicateSection { id: *id });
                    self.had_error = true;
                    continue;
                }
                if *id < last {
                    cx.report(
                        id.loc(),
                        ReadError::OutOfOrderSection { id: *id, last },
                    );
                    self.had_error = true;
                    continue;
                }
            }
            self.last_known = Some(*id);

            let section = KnownSection {
                id,
                data: data.into_value(),
            };
            return Some(Section::Known(At::new(section, loc)));
        }
    }
}

/// The lazily decoded entries of a type section.
pub type TypeSection<'a> = LazySection<'a, FunctionType>;
/// The lazily decoded entries of an import section.
pub type ImportSection<'a> = LazySection<'a, Import<'a>>;
/// The lazily decoded entries of a function section.
pub type FunctionSection<'a> = LazySection<'a, Function>;
/// The lazily decoded entries of a table section.
pub type TableSection<'a> = LazySection<'a, Table>;
/// The lazily decoded entries of a memory section.
pub type MemorySection<'a> = LazySection<'a, Memory>;
/// The lazily decoded entries of a global section.
pub type GlobalSection<'a> = LazySection<'a, Global>;
/// The lazily decoded entries of an event section.
pub type EventSection<'a> = LazySection<'a, Event>;
/// The lazily decoded entries of an export section.
pub type ExportSection<'a> = LazySection<'a, Export<'a>>;
/// The lazily decoded entries of an element section.
pub type ElementSection<'a> = LazySection<'a, ElementSegment>;
/// The lazily decoded entries of a code section.
pub type CodeSection<'a> = LazySection<'a, Code<'a>>;
/// The lazily decoded entries of a data section.
pub type DataSection<'a> = LazySection<'a, DataSegment<'a>>;

macro_rules! section_reader {
    (
        $(#[$meta:meta])*
        $name:ident, $section:ident<$lifetime:lifetime>, $id:path
    ) => {
        $(#[$meta])*
        pub fn $name<$lifetime>(
            section: &KnownSection<$lifetime>,
            cx: &mut DecodeContext<'_>,
        ) -> Option<$section<$lifetime>> {
            debug_assert_eq!(*section.id, $id);
            LazySection::read(section.data, cx)
        }
    };
}

section_reader!(
    /// Wraps a type section's contents as a lazy sequence.
    read_type_section, TypeSection<'a>, SectionId::Type
);
section_reader!(
    /// Wraps an import section's contents as a lazy sequence.
    read_import_section, ImportSection<'a>, SectionId::Import
);
section_reader!(
    /// Wraps a function section's contents as a lazy sequence.
    read_function_section, FunctionSection<'a>, SectionId::Function
);
section_reader!(
    /// Wraps a table section's contents as a lazy sequence.
    read_table_section, TableSection<'a>, SectionId::Table
);
section_reader!(
    /// Wraps a memory section's contents as a lazy sequence.
    read_memory_section, MemorySection<'a>, SectionId::Memory
);
section_reader!(
    /// Wraps a global section's contents as a lazy sequence.
    read_global_section, GlobalSection<'a>, SectionId::Global
);
section_reader!(
    /// Wraps an event section's contents as a lazy sequence.
    read_event_section, EventSection<'a>, SectionId::Event
);
section_reader!(
    /// Wraps an export section's contents as a lazy sequence.
    read_export_section, ExportSection<'a>, SectionId::Export
);
section_reader!(
    /// Wraps an element section's contents as a lazy sequence.
    read_element_section, ElementSection<'a>, SectionId::Element
);
section_reader!(
    /// Wraps a code section's contents as a lazy sequence.
    read_code_section, CodeSection<'a>, SectionId::Code
);
section_reader!(
    /// Wraps a data section's contents as a lazy sequence.
    read_data_section, DataSection<'a>, SectionId::Data
);

// Reads the single entity of a one-entity section, rejecting trailing bytes.
fn read_single<'a, T: Decode<'a>>(
    section: &KnownSection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<At<T>> {
    let mut reader = Reader::new(section.data);
    let entity = reader.read::<T>(cx)?;
    if !reader.is_empty() {
        let rest = reader.rest();
        cx.report(
            rest.loc(),
            ReadError::TrailingBytes {
                desc: T::DESC,
                count: rest.len(),
            },
        );
        return None;
    }
    Some(entity)
}

/// Reads a start section's single entry.
pub fn read_start_section<'a>(
    section: &KnownSection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<At<Start>> {
    debug_assert_eq!(*section.id, SectionId::Start);
    read_single(section, cx)
}

/// Reads a data count section's single entry.
pub fn read_data_count_section<'a>(
    section: &KnownSection<'a>,
    cx: &mut DecodeContext<'_>,
) -> Option<At<DataCount>> {
    debug_assert_eq!(*section.id, SectionId::DataCount);
    read_single(section, cx)
}

/// Iterator adapter over [`Sections`].
pub struct SectionsIter<'a, 'c, 'e> {
    sections: Sections<'a>,
    cx: &'c mut DecodeContext<'e>,
}

impl<'a> Iterator for SectionsIter<'a, '_, '_> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.sections.next(self.cx)
    }
}
