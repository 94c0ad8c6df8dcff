//! Compact edge payload encoding
//!
//! Layout (little-endian `u32` words):
//! ```text
//! word 0  weight (f32 bits)
//! word 1  meta: bits 0-1 direction, bit 2 shortcut,
//!               bits 8-15 len(via_seq1), bits 16-23 len(via_seq2)
//! word 2  contracted_via            (only when the shortcut bit is set)
//! then    via_seq1 words, via_seq2 words
//! ```

use butterfly_common::{Error, Result};

use super::{Direction, EdgeData, VertexId};

const DIRECTION_MASK: u32 = 0b11;
const SHORTCUT_BIT: u32 = 1 << 2;
const SEQ1_SHIFT: u32 = 8;
const SEQ2_SHIFT: u32 = 16;
const SEQ_LEN_MASK: u32 = 0xFF;

/// Longest via sequence a payload can carry
pub const MAX_VIA_SEQUENCE: usize = SEQ_LEN_MASK as usize;

/// Zero-copy view over an encoded payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView<'a> {
    pub weight: f32,
    pub direction: Direction,
    pub contracted_via: Option<VertexId>,
    pub via_seq1: &'a [VertexId],
    pub via_seq2: &'a [VertexId],
}

impl EdgeView<'_> {
    #[inline]
    pub fn is_shortcut(&self) -> bool {
        self.contracted_via.is_some()
    }

    #[inline]
    pub fn near_owner(&self, neighbor: VertexId) -> VertexId {
        self.via_seq1.first().copied().unwrap_or(neighbor)
    }

    #[inline]
    pub fn near_neighbor(&self, owner: VertexId) -> VertexId {
        self.via_seq2.first().copied().unwrap_or(owner)
    }

    pub fn to_data(&self) -> EdgeData {
        EdgeData {
            weight: self.weight,
            direction: self.direction,
            contracted_via: self.contracted_via,
            via_seq1: self.via_seq1.to_vec(),
            via_seq2: self.via_seq2.to_vec(),
        }
    }
}

/// Number of words `data` occupies once encoded
pub fn encoded_len(data: &EdgeData) -> usize {
    2 + usize::from(data.is_shortcut()) + data.via_seq1.len() + data.via_seq2.len()
}

/// Append the encoding of `data` to `out`
pub fn encode(data: &EdgeData, out: &mut Vec<u32>) -> Result<()> {
    if data.via_seq1.len() > MAX_VIA_SEQUENCE {
        return Err(Error::MalformedEdge {
            reason: "via_seq1 too long",
            len: data.via_seq1.len(),
        });
    }
    if data.via_seq2.len() > MAX_VIA_SEQUENCE {
        return Err(Error::MalformedEdge {
            reason: "via_seq2 too long",
            len: data.via_seq2.len(),
        });
    }

    let mut meta = data.direction.code();
    if data.is_shortcut() {
        meta |= SHORTCUT_BIT;
    }
    meta |= (data.via_seq1.len() as u32) << SEQ1_SHIFT;
    meta |= (data.via_seq2.len() as u32) << SEQ2_SHIFT;

    out.reserve(encoded_len(data));
    out.push(data.weight.to_bits());
    out.push(meta);
    if let Some(via) = data.contracted_via {
        out.push(via);
    }
    out.extend_from_slice(&data.via_seq1);
    out.extend_from_slice(&data.via_seq2);
    Ok(())
}

/// Decode one payload. The slice must hold exactly one edge.
pub fn decode(words: &[u32]) -> Result<EdgeView<'_>> {
    if words.len() < 2 {
        return Err(Error::MalformedEdge {
            reason: "payload shorter than header",
            len: words.len(),
        });
    }

    let meta = words[1];
    let direction = Direction::from_code(meta & DIRECTION_MASK).ok_or(Error::MalformedEdge {
        reason: "invalid direction bits",
        len: words.len(),
    })?;
    let shortcut = meta & SHORTCUT_BIT != 0;
    let len1 = ((meta >> SEQ1_SHIFT) & SEQ_LEN_MASK) as usize;
    let len2 = ((meta >> SEQ2_SHIFT) & SEQ_LEN_MASK) as usize;

    let head = 2 + usize::from(shortcut);
    if words.len() != head + len1 + len2 {
        return Err(Error::MalformedEdge {
            reason: "payload length does not match header",
            len: words.len(),
        });
    }

    let contracted_via = shortcut.then(|| words[2]);
    let (via_seq1, via_seq2) = words[head..].split_at(len1);

    Ok(EdgeView {
        weight: f32::from_bits(words[0]),
        direction,
        contracted_via,
        via_seq1,
        via_seq2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_edge_is_two_words() {
        let mut out = Vec::new();
        encode(&EdgeData::original(2.5, Direction::Both), &mut out).unwrap();
        assert_eq!(out.len(), 2);

        let view = decode(&out).unwrap();
        assert_eq!(view.weight, 2.5);
        assert_eq!(view.direction, Direction::Both);
        assert!(!view.is_shortcut());
        assert!(view.via_seq1.is_empty());
    }

    #[test]
    fn test_shortcut_with_sequences() {
        let data = EdgeData::shortcut(7.0, Direction::Backward, 42, vec![3], vec![9, 8]);
        let mut out = Vec::new();
        encode(&data, &mut out).unwrap();
        assert_eq!(out.len(), encoded_len(&data));

        let view = decode(&out).unwrap();
        assert_eq!(view.contracted_via, Some(42));
        assert_eq!(view.via_seq1, &[3]);
        assert_eq!(view.via_seq2, &[9, 8]);
        assert_eq!(view.to_data(), data);
    }

    #[test]
    fn test_payload_length_mismatch() {
        let mut out = Vec::new();
        encode(&EdgeData::shortcut(1.0, Direction::Forward, 1, vec![2], vec![]), &mut out).unwrap();

        let truncated = &out[..out.len() - 1];
        assert!(matches!(
            decode(truncated),
            Err(Error::MalformedEdge { .. })
        ));

        out.push(0);
        assert!(matches!(decode(&out), Err(Error::MalformedEdge { .. })));
    }

    #[test]
    fn test_invalid_direction_bits() {
        let words = [1.0f32.to_bits(), 0];
        assert!(matches!(decode(&words), Err(Error::MalformedEdge { .. })));
    }

    #[test]
    fn test_sequence_too_long() {
        let data = EdgeData::shortcut(1.0, Direction::Forward, 0, vec![0; 256], vec![]);
        assert!(encode(&data, &mut Vec::new()).is_err());
    }
}
