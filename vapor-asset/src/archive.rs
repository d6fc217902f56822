//! `.vscene_lod` container: an 8-byte header followed by a bincode payload.
//!
//! | Offset | Field   | Type              |
//! |--------|---------|-------------------|
//! | 0      | magic   | `b"VLOD"`         |
//! | 4      | version | `u32` little-endian |
//! | 8      | payload | bincode `SceneData` |
//!
//! Only [`ARCHIVE_VERSION`] is accepted on read; there is no migration.

use bytemuck::{Pod, Zeroable};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::processor::SceneData;

pub const ARCHIVE_MAGIC: [u8; 4] = *b"VLOD";
pub const ARCHIVE_VERSION: u32 = 1;
pub const ARCHIVE_EXTENSION: &str = "vscene_lod";

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ArchiveHeader {
    pub magic: [u8; 4],
    pub version: u32,
}

pub const HEADER_SIZE: usize = std::mem::size_of::<ArchiveHeader>();

impl ArchiveHeader {
    fn current() -> Self {
        Self {
            magic: ARCHIVE_MAGIC,
            version: ARCHIVE_VERSION.to_le(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Archive is truncated: {len} bytes, header needs {}", HEADER_SIZE)]
    Truncated { len: usize },
    #[error("Invalid archive magic {found:?}, expected {:?}", ARCHIVE_MAGIC)]
    BadMagic { found: [u8; 4] },
    #[error("Unsupported archive version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Failed to encode scene: {0}")]
    Encode(#[source] bincode::Error),
    #[error("Failed to decode scene: {0}")]
    Decode(#[source] bincode::Error),
}

impl ArchiveError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serializes `scene` into a header-prefixed buffer.
pub fn encode_scene(scene: &SceneData) -> Result<Vec<u8>, ArchiveError> {
    let mut bytes = Vec::from(bytemuck::bytes_of(&ArchiveHeader::current()));
    bincode::serialize_into(&mut bytes, scene).map_err(ArchiveError::Encode)?;
    Ok(bytes)
}

/// Checks the header, then deserializes the payload.
pub fn decode_scene(bytes: &[u8]) -> Result<SceneData, ArchiveError> {
    let header = read_header(bytes)?;
    if header.magic != ARCHIVE_MAGIC {
        return Err(ArchiveError::BadMagic {
            found: header.magic,
        });
    }
    let version = u32::from_le(header.version);
    if version != ARCHIVE_VERSION {
        return Err(ArchiveError::UnsupportedVersion {
            found: version,
            expected: ARCHIVE_VERSION,
        });
    }

    bincode::deserialize(&bytes[HEADER_SIZE..]).map_err(ArchiveError::Decode)
}

fn read_header(bytes: &[u8]) -> Result<ArchiveHeader, ArchiveError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ArchiveError::Truncated { len: bytes.len() });
    }
    Ok(bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]))
}

/// Truncates or creates `path` and writes the archive.
pub fn write_scene<P: AsRef<Path>>(path: P, scene: &SceneData) -> Result<(), ArchiveError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);

    writer
        .write_all(bytemuck::bytes_of(&ArchiveHeader::current()))
        .map_err(|e| ArchiveError::io(path, e))?;
    bincode::serialize_into(&mut writer, scene).map_err(|e| match *e {
        // Payloads larger than the buffer hit the file from inside bincode.
        bincode::ErrorKind::Io(source) => ArchiveError::io(path, source),
        other => ArchiveError::Encode(Box::new(other)),
    })?;
    writer.flush().map_err(|e| ArchiveError::io(path, e))?;
    Ok(())
}

pub fn read_scene<P: AsRef<Path>>(path: P) -> Result<SceneData, ArchiveError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    // SAFETY: the map is read-only and dropped before returning; the archive
    // is not expected to be modified while it is being read.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ArchiveError::io(path, e))?;
    decode_scene(&mmap)
}
