//! Graph file format
//!
//! Layout:
//! ```text
//! magic "SLGR" u32 LE | version u16 LE | reserved u16 | payload_len u64 LE
//! payload (serde_json)
//! crc64 u64 LE over header + payload
//! ```

use crc::{Crc, CRC_64_GO_ISO};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PersistError;
use crate::graph::Graph;

const MAGIC: u32 = 0x52474C53; // "SLGR"
const VERSION: u16 = 1;
const HEADER_LEN: usize = 16;
const FOOTER_LEN: usize = 8;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

/// How much of a saved graph to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadLevel {
    /// Everything, including the annotation log
    #[default]
    Full,
    /// Topology and flags only
    Basic,
}

fn header(payload_len: u64) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    header[4..6].copy_from_slice(&VERSION.to_le_bytes());
    // 6..8 reserved
    header[8..16].copy_from_slice(&payload_len.to_le_bytes());
    header
}

fn truncated() -> PersistError {
    PersistError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        "graph file is truncated",
    ))
}

/// Sibling path the graph is written to before being renamed into place
fn staging_path(path: &Path) -> PathBuf {
    let mut staged = OsString::from(path.as_os_str());
    staged.push(".tmp");
    PathBuf::from(staged)
}

fn write_framed(path: &Path, header: &[u8], payload: &[u8], crc: u64) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(header)?;
    writer.write_all(payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()
}

impl Graph {
    /// Write the graph to `path`. The file appears only once it is complete:
    /// the bytes go to a `.tmp` sibling that is renamed over `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        let payload = serde_json::to_vec(self)?;
        let header = header(payload.len() as u64);

        let mut digest = CRC64.digest();
        digest.update(&header);
        digest.update(&payload);
        let crc = digest.finalize();

        let staged = staging_path(path);
        let written = write_framed(&staged, &header, &payload, crc)
            .and_then(|()| std::fs::rename(&staged, path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&staged);
            return Err(e.into());
        }

        debug!(
            path = %path.display(),
            bytes = HEADER_LEN + payload.len() + FOOTER_LEN,
            crc = format_args!("{crc:016x}"),
            "wrote graph file"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, level: LoadLevel) -> Result<Graph, PersistError> {
        let bytes = std::fs::read(path.as_ref())?;
        if bytes.len() < HEADER_LEN + FOOTER_LEN {
            if bytes.len() >= 4 {
                let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                if magic != MAGIC {
                    return Err(PersistError::BadMagic(magic));
                }
            }
            return Err(truncated());
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != MAGIC {
            return Err(PersistError::BadMagic(magic));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[8..16]);
        let payload_len = usize::try_from(u64::from_le_bytes(len_bytes)).map_err(|_| truncated())?;

        let content_end = HEADER_LEN
            .checked_add(payload_len)
            .filter(|end| end.checked_add(FOOTER_LEN) == Some(bytes.len()))
            .ok_or_else(truncated)?;

        let mut footer = [0u8; FOOTER_LEN];
        footer.copy_from_slice(&bytes[content_end..]);
        let expected = u64::from_le_bytes(footer);
        let found = CRC64.checksum(&bytes[..content_end]);
        if expected != found {
            return Err(PersistError::CrcMismatch { expected, found });
        }

        let mut graph: Graph = serde_json::from_slice(&bytes[HEADER_LEN..content_end])?;
        if level == LoadLevel::Basic {
            graph.clear_annotations();
        }
        debug!(
            path = %path.as_ref().display(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            ?level,
            "loaded graph file"
        );
        Ok(graph)
    }
}
