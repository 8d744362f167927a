//! NSO module header and segment access
//!
//! # Format Overview
//!
//! - Bytes 0x00-0x03: "NSO0" magic
//! - Bytes 0x0C-0x0F: Flags (bits 0-2: text/ro/data segment is LZ4 compressed)
//! - Bytes 0x10-0x3B: Segment headers (file offset, memory offset, size),
//!   interleaved with the module name offset/size and bss size
//! - Bytes 0x40-0x5F: Build id
//! - Bytes 0x60-0x6B: Compressed (on-disk) segment sizes
//! - Bytes 0xA0-0xFF: SHA-256 of each decompressed segment
//!
//! The read-only segment starts with a module path record: a zero word, a
//! length word, then the NUL-terminated module name at offset 8.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::build_id::BuildId;
use crate::marker::{read_cstr, read_marker_string};
use crate::vfs::{read_exact_at, File};
use crate::{Error, Result, BUILD_MARKER};

/// Magic bytes for NSO format: "NSO0"
pub const NSO_MAGIC: [u8; 4] = *b"NSO0";

/// Header size in bytes
pub const HEADER_SIZE: usize = 0x100;

/// Offset of the module name inside the read-only segment
pub const MODULE_NAME_OFFSET: usize = 8;

/// Decompressed segments larger than this are rejected as corrupt
const MAX_SEGMENT_SIZE: usize = 512 * 1024 * 1024;

/// The three loadable segments of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Ro,
    Data,
}

impl SegmentKind {
    fn index(self) -> usize {
        match self {
            SegmentKind::Text => 0,
            SegmentKind::Ro => 1,
            SegmentKind::Data => 2,
        }
    }
}

/// Placement of one segment in the file and in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub file_offset: u32,
    pub memory_offset: u32,
    /// Decompressed size
    pub size: u32,
    /// Size as stored in the file
    pub file_size: u32,
    pub compressed: bool,
}

/// Parsed NSO header
#[derive(Debug, Clone)]
pub struct NsoHeader {
    pub version: u32,
    pub flags: u32,
    pub build_id: BuildId,
    pub segments: [Segment; 3],
    pub bss_size: u32,
}

impl NsoHeader {
    /// Read and validate the header at the start of `file`.
    pub fn read(file: &mut dyn File) -> Result<Self> {
        let size = file.size()?;
        if size < HEADER_SIZE as u64 {
            return Err(Error::ShortRead {
                expected: HEADER_SIZE,
                actual: size as usize,
            });
        }

        let mut raw = [0u8; HEADER_SIZE];
        read_exact_at(file, 0, &mut raw)?;
        Self::parse(&raw)
    }

    /// Parse a header from its raw bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(Error::ShortRead {
                expected: HEADER_SIZE,
                actual: raw.len(),
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&raw[0..4]);
        if magic != NSO_MAGIC {
            return Err(Error::InvalidNsoMagic(magic));
        }

        let mut cursor = Cursor::new(&raw[4..]);
        let version = cursor.read_u32::<LittleEndian>()?;
        let _reserved = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;

        // Segment headers are interleaved with one extra word each
        let mut placements = [(0u32, 0u32, 0u32); 3];
        let mut extras = [0u32; 3];
        for (placement, extra) in placements.iter_mut().zip(extras.iter_mut()) {
            let file_offset = cursor.read_u32::<LittleEndian>()?;
            let memory_offset = cursor.read_u32::<LittleEndian>()?;
            let size = cursor.read_u32::<LittleEndian>()?;
            *placement = (file_offset, memory_offset, size);
            *extra = cursor.read_u32::<LittleEndian>()?;
        }
        let bss_size = extras[2];

        let mut id = [0u8; 32];
        id.copy_from_slice(&raw[0x40..0x60]);

        let mut cursor = Cursor::new(&raw[0x60..0x6c]);
        let mut file_sizes = [0u32; 3];
        for file_size in file_sizes.iter_mut() {
            *file_size = cursor.read_u32::<LittleEndian>()?;
        }

        let segments = std::array::from_fn(|i| {
            let (file_offset, memory_offset, size) = placements[i];
            Segment {
                file_offset,
                memory_offset,
                size,
                file_size: file_sizes[i],
                compressed: flags & (1 << i) != 0,
            }
        });

        Ok(Self {
            version,
            flags,
            build_id: BuildId(id),
            segments,
            bss_size,
        })
    }

    pub fn segment(&self, kind: SegmentKind) -> &Segment {
        &self.segments[kind.index()]
    }

    /// Read a segment from `file`, decompressing it if needed.
    pub fn read_segment(&self, file: &mut dyn File, kind: SegmentKind) -> Result<Vec<u8>> {
        let segment = self.segment(kind);
        let size = segment.size as usize;
        if size > MAX_SEGMENT_SIZE {
            return Err(Error::InvalidSegment(format!(
                "{:?} segment size {:#x} is too large",
                kind, size
            )));
        }

        let stored_size = if segment.compressed {
            segment.file_size as usize
        } else {
            size
        };
        if stored_size > MAX_SEGMENT_SIZE {
            return Err(Error::InvalidSegment(format!(
                "{:?} segment stored size {:#x} is too large",
                kind, stored_size
            )));
        }

        let mut stored = vec![0u8; stored_size];
        read_exact_at(file, u64::from(segment.file_offset), &mut stored)?;

        if !segment.compressed {
            return Ok(stored);
        }

        let data = lz4_flex::block::decompress(&stored, size)?;
        if data.len() != size {
            return Err(Error::DecompressionSize {
                expected: size,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

/// Module name from a decompressed read-only segment.
pub fn module_name(rodata: &[u8]) -> String {
    if rodata.len() <= MODULE_NAME_OFFSET {
        return String::new();
    }
    read_cstr(&rodata[MODULE_NAME_OFFSET..])
}

/// SDK build string from a decompressed read-only segment.
pub fn build_string(rodata: &[u8]) -> Option<String> {
    read_marker_string(rodata, BUILD_MARKER)
}
