// psi/section.rs
//! Complete PSI sections, their long-form header and CRC-32 (MPEG-2).

use bitstream_io::{BigEndian, BitRead, BitReader};
use bytes::Bytes;
use crc::{Crc, CRC_32_MPEG_2};

use crate::constants::*;
use crate::error::{ParseError, Result};

pub(crate) const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// A reassembled section, from `table_id` through the CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub table_id: u8,
    pub pid:      u16,
    pub data:     Bytes,
}

/// Fields of the `section_syntax_indicator == 1` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub table_id:            u8,
    pub section_length:      u16,
    /// transport_stream_id for the PAT, program_number for the PMT
    pub table_id_extension:  u16,
    pub version:             u8,
    pub current_next:        bool,
    pub section_number:      u8,
    pub last_section_number: u8,
}

impl Section {
    /// Wraps `data`, which must hold exactly `3 + section_length` bytes.
    pub fn new(pid: u16, data: Bytes) -> Result<Self> {
        ParseError::check_len(&data, SECTION_HEADER_LEN)?;
        let declared = SECTION_HEADER_LEN + section_length(&data);
        ParseError::check_len(&data, declared)?;
        if data.len() != declared {
            return Err(ParseError::invalid(format!(
                "section holds {} bytes, header declares {declared}",
                data.len()
            )));
        }
        Ok(Self { table_id: data[0], pid, data })
    }

    pub fn section_syntax_indicator(&self) -> bool {
        self.data.get(1).is_some_and(|b| b & 0x80 != 0)
    }

    /// Long-form header, `None` for short-form sections.
    pub fn header(&self) -> Result<Option<SectionHeader>> {
        if !self.section_syntax_indicator() {
            return Ok(None);
        }
        SectionHeader::parse(&self.data).map(Some)
    }

    /// Bytes between the long-form header and the CRC.
    pub fn body(&self) -> Result<&[u8]> {
        let min = SECTION_SYNTAX_HEADER_LEN + SECTION_CRC_LEN;
        ParseError::check_len(&self.data, min)?;
        Ok(&self.data[SECTION_SYNTAX_HEADER_LEN..self.data.len() - SECTION_CRC_LEN])
    }

    /// Sub-table key used for version tracking. PAT and short-form sections
    /// have no extension.
    pub fn subtable_extension(&self) -> u16 {
        if self.table_id == TABLE_ID_PAT || !self.section_syntax_indicator() || self.data.len() < 5 {
            return 0;
        }
        u16::from_be_bytes([self.data[3], self.data[4]])
    }

    pub fn crc_ok(&self) -> bool {
        let len = self.data.len();
        if len < SECTION_CRC_LEN {
            return false;
        }
        let stored = u32::from_be_bytes([
            self.data[len - 4],
            self.data[len - 3],
            self.data[len - 2],
            self.data[len - 1],
        ]);
        CRC_MPEG.checksum(&self.data[..len - SECTION_CRC_LEN]) == stored
    }
}

impl SectionHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ParseError::check_len(data, SECTION_SYNTAX_HEADER_LEN)?;
        let truncated = |_| ParseError::Truncated { needed: SECTION_SYNTAX_HEADER_LEN, available: data.len() };

        let mut br = BitReader::endian(&data[..SECTION_SYNTAX_HEADER_LEN], BigEndian);
        let table_id = br.read::<8, u8>().map_err(truncated)?;
        br.skip(4).map_err(truncated)?;                 // syntax, private, reserved
        let section_length = br.read::<12, u16>().map_err(truncated)?;
        let table_id_extension = br.read::<16, u16>().map_err(truncated)?;
        br.skip(2).map_err(truncated)?;
        let version = br.read::<5, u8>().map_err(truncated)?;
        let current_next = br.read::<1, u8>().map_err(truncated)? != 0;
        let section_number = br.read::<8, u8>().map_err(truncated)?;
        let last_section_number = br.read::<8, u8>().map_err(truncated)?;

        Ok(Self {
            table_id,
            section_length,
            table_id_extension,
            version,
            current_next,
            section_number,
            last_section_number,
        })
    }
}

/// section_length from the first three bytes of a section.
pub(crate) fn section_length(head: &[u8]) -> usize {
    ((head[1] & 0x0F) as usize) << 8 | head[2] as usize
}

/// Builds a long-form section around `body` and appends its CRC.
pub(crate) fn build_section(table_id: u8, extension: u16, version: u8, body: &[u8]) -> Vec<u8> {
    let section_length = 5 + body.len() + SECTION_CRC_LEN;
    let mut out = Vec::with_capacity(SECTION_HEADER_LEN + section_length);
    out.push(table_id);
    out.push(0xB0 | ((section_length >> 8) as u8 & 0x0F));
    out.push(section_length as u8);
    out.extend_from_slice(&extension.to_be_bytes());
    out.push(0xC0 | ((version & 0x1F) << 1) | 0x01);
    out.push(0); // section_number
    out.push(0); // last_section_number
    out.extend_from_slice(body);
    let crc = CRC_MPEG.checksum(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}
