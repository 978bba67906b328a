//! MPEG-2 descriptor loops, kept opaque apart from a few convenience readers.

use crate::constants::*;
use crate::error::{ParseError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub tag:  u8,
    pub data: Vec<u8>,
}

impl Descriptor {
    /// ISO-639 codes of an ISO_639_language_descriptor (tag 0x0A).
    pub fn languages(&self) -> Vec<String> {
        if self.tag != DESC_ISO_639_LANGUAGE {
            return Vec::new();
        }
        self.data
            .chunks_exact(4)
            .map(|c| String::from_utf8_lossy(&c[..3]).into_owned())
            .collect()
    }

    /// format_identifier of a registration_descriptor (tag 0x05).
    pub fn registration_id(&self) -> Option<[u8; 4]> {
        if self.tag != DESC_REGISTRATION || self.data.len() < 4 {
            return None;
        }
        Some([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(self.tag);
        out.push(self.data.len() as u8);
        out.extend_from_slice(&self.data);
    }
}

/// Splits a descriptor loop into its entries.
pub fn parse_descriptors(mut b: &[u8]) -> Result<Vec<Descriptor>> {
    let mut out = Vec::new();
    while !b.is_empty() {
        ParseError::check_len(b, 2)?;
        let tag = b[0];
        let len = b[1] as usize;
        ParseError::check_len(b, 2 + len)?;
        out.push(Descriptor { tag, data: b[2..2 + len].to_vec() });
        b = &b[2 + len..];
    }
    Ok(out)
}

pub(crate) fn descriptors_len(descriptors: &[Descriptor]) -> usize {
    descriptors.iter().map(|d| 2 + d.data.len()).sum()
}
