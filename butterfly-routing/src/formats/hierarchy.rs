//! `*.ch` format - persisted contraction hierarchy
//!
//! ```text
//! header (32 bytes)
//!   magic u32 "BFCH" | version u16 | flags u16 (bit 0: edge-based)
//!   n_vertices u32 | n_edges u32 | n_payload_words u64 | reserved [u8; 8]
//! body (little-endian u32 arrays)
//!   ranks[n_vertices] | offsets[n_vertices + 1] | neighbors[n_edges]
//!   payload_offsets[n_edges + 1] | payloads[n_payload_words]
//! footer
//!   body_crc u64 | file_crc u64 (header + body)
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use butterfly_common::{Error, Result};
use crc::{Crc, CRC_64_GO_ISO};
use tracing::debug;

use crate::graph::Hierarchy;

static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

const MAGIC: u32 = 0x4246_4348; // "BFCH"
const VERSION: u16 = 1;
const FLAG_EDGE_BASED: u16 = 1;
const HEADER_LEN: usize = 32;
const FOOTER_LEN: usize = 16;

pub struct HierarchyFile;

impl HierarchyFile {
    pub fn write<P: AsRef<Path>>(path: P, hierarchy: &Hierarchy) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        let mut body_digest = CRC64.digest();
        let mut file_digest = CRC64.digest();

        let flags = if hierarchy.edge_based { FLAG_EDGE_BASED } else { 0 };
        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&flags.to_le_bytes());
        header.extend_from_slice(&hierarchy.vertex_count().to_le_bytes());
        header.extend_from_slice(&hierarchy.edge_count().to_le_bytes());
        header.extend_from_slice(&(hierarchy.payloads.len() as u64).to_le_bytes());
        header.extend_from_slice(&[0u8; 8]);
        writer.write_all(&header)?;
        file_digest.update(&header);

        let sections: [&[u32]; 5] = [
            &hierarchy.ranks,
            &hierarchy.offsets,
            &hierarchy.neighbors,
            &hierarchy.payload_offsets,
            &hierarchy.payloads,
        ];
        for section in sections {
            for &word in section {
                let bytes = word.to_le_bytes();
                writer.write_all(&bytes)?;
                body_digest.update(&bytes);
                file_digest.update(&bytes);
            }
        }

        writer.write_all(&body_digest.finalize().to_le_bytes())?;
        writer.write_all(&file_digest.finalize().to_le_bytes())?;
        writer.flush()?;

        debug!(
            path = %path.display(),
            vertices = hierarchy.vertex_count(),
            edges = hierarchy.edge_count(),
            "hierarchy written"
        );
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Hierarchy> {
        let path = path.as_ref();
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        let bad = |reason: String| Error::invalid_format(path, reason);

        if bytes.len() < HEADER_LEN + FOOTER_LEN {
            return Err(bad(format!("file too short ({} bytes)", bytes.len())));
        }

        let magic = le_u32(&bytes[0..4]);
        if magic != MAGIC {
            return Err(bad(format!(
                "invalid magic: expected 0x{MAGIC:08X}, got 0x{magic:08X}"
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(bad(format!(
                "unsupported version: expected {VERSION}, got {version}"
            )));
        }
        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        let n_vertices = le_u32(&bytes[8..12]) as u64;
        let n_edges = le_u32(&bytes[12..16]) as u64;
        let n_words = le_u64(&bytes[16..24]);

        // Vertex and edge counts are u32, only the payload count can overflow
        let expected = (2 * n_vertices + 2 * n_edges + 2)
            .checked_add(n_words)
            .and_then(|words| words.checked_mul(4))
            .and_then(|len| len.checked_add((HEADER_LEN + FOOTER_LEN) as u64))
            .ok_or_else(|| bad("header sizes overflow".into()))?;
        if bytes.len() as u64 != expected {
            return Err(bad(format!(
                "size mismatch: header implies {expected} bytes, file has {}",
                bytes.len()
            )));
        }

        let body_end = bytes.len() - FOOTER_LEN;
        let body = &bytes[HEADER_LEN..body_end];
        let stored_body_crc = le_u64(&bytes[body_end..body_end + 8]);
        let stored_file_crc = le_u64(&bytes[body_end + 8..]);
        if CRC64.checksum(body) != stored_body_crc {
            return Err(bad("body checksum mismatch".into()));
        }
        if CRC64.checksum(&bytes[..body_end]) != stored_file_crc {
            return Err(bad("file checksum mismatch".into()));
        }

        let mut words = body.chunks_exact(4).map(le_u32);
        let mut take = |count: u64| -> Vec<u32> { words.by_ref().take(count as usize).collect() };
        let ranks = take(n_vertices);
        let offsets = take(n_vertices + 1);
        let neighbors = take(n_edges);
        let payload_offsets = take(n_edges + 1);
        let payloads = take(n_words);

        let hierarchy = Hierarchy::from_parts(
            flags & FLAG_EDGE_BASED != 0,
            ranks,
            offsets,
            neighbors,
            payload_offsets,
            payloads,
        )
        .map_err(|e| match e {
            Error::InvalidFormat { reason, .. } => bad(reason),
            other => other,
        })?;

        debug!(
            path = %path.display(),
            vertices = hierarchy.vertex_count(),
            edges = hierarchy.edge_count(),
            "hierarchy loaded"
        );
        Ok(hierarchy)
    }
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u64(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
