use std::collections::HashMap;

use tracing::debug;

use crate::constants::{ARRAY_HEADER_LEN, PRIMER_ENTRY_LEN};
use crate::error::{ParseError, Result};
use crate::mxf::types::read_u32;
use crate::mxf::ul::Ul;

/// Local tag to UL mapping for one partition's header metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimerPack {
    mappings: HashMap<u16, Ul>,
}

impl PrimerPack {
    /// Parses the primer value. On any error nothing is kept.
    pub fn parse(data: &[u8]) -> Result<Self> {
        ParseError::check_len(data, ARRAY_HEADER_LEN)?;
        let count = read_u32(&data[0..4])? as usize;
        let entry_len = read_u32(&data[4..8])?;
        if entry_len != PRIMER_ENTRY_LEN {
            return Err(ParseError::invalid(format!("primer entry size {entry_len}, expected 18")));
        }
        let needed = count
            .checked_mul(PRIMER_ENTRY_LEN as usize)
            .and_then(|n| n.checked_add(ARRAY_HEADER_LEN))
            .ok_or_else(|| ParseError::invalid("primer size overflow"))?;
        ParseError::check_len(data, needed)?;

        let mut mappings = HashMap::with_capacity(count);
        for entry in data[ARRAY_HEADER_LEN..needed].chunks_exact(PRIMER_ENTRY_LEN as usize) {
            let tag = u16::from_be_bytes([entry[0], entry[1]]);
            let ul = Ul::from_slice(&entry[2..]).ok_or_else(|| ParseError::invalid("primer UL"))?;
            // first occurrence wins
            if mappings.contains_key(&tag) {
                debug!(tag = format_args!("0x{tag:04x}"), "duplicate primer entry ignored");
                continue;
            }
            mappings.insert(tag, ul);
        }
        Ok(Self { mappings })
    }

    pub fn lookup(&self, tag: u16) -> Option<&Ul> {
        self.mappings.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
