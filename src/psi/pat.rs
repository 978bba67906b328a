use bitstream_io::{BigEndian, BitRead, BitReader};
use bytes::Bytes;

use crate::constants::*;
use crate::error::{ParseError, Result};
use crate::psi::section::{build_section, Section};

/// ─────────── PAT ───────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatTable {
    pub transport_stream_id: u16,
    pub version:             u8,
    pub current_next:        bool,
    /// PID announced for program 0, if any
    pub network_pid:         Option<u16>,
    pub programs:            Vec<PatEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatEntry {
    pub program_number: u16,
    pub pmt_pid:        u16,
}

impl PatTable {
    pub fn pmt_pid(&self, program_number: u16) -> Option<u16> {
        self.programs
            .iter()
            .find(|e| e.program_number == program_number)
            .map(|e| e.pmt_pid)
    }

    /// Encodes the table as a single section on PID 0.
    pub fn to_section(&self, transport_stream_id: u16, version: u8) -> Section {
        let mut body = Vec::with_capacity(4 * (self.programs.len() + 1));
        if let Some(pid) = self.network_pid {
            write_entry(&mut body, 0, pid);
        }
        for e in &self.programs {
            write_entry(&mut body, e.program_number, e.pmt_pid);
        }
        let raw = build_section(TABLE_ID_PAT, transport_stream_id, version, &body);
        Section { table_id: TABLE_ID_PAT, pid: PID_PAT, data: Bytes::from(raw) }
    }
}

fn write_entry(out: &mut Vec<u8>, program_number: u16, pid: u16) {
    out.extend_from_slice(&program_number.to_be_bytes());
    out.extend_from_slice(&(0xE000 | (pid & PID_MASK)).to_be_bytes());
}

/// Parses a complete PAT section. The CRC is left to the caller.
pub fn parse_pat(section: &Section) -> Result<PatTable> {
    if section.table_id != TABLE_ID_PAT {
        return Err(ParseError::invalid(format!("table_id 0x{:02x} is not a PAT", section.table_id)));
    }
    let hdr = section
        .header()?
        .ok_or_else(|| ParseError::invalid("PAT without section_syntax_indicator"))?;
    let body = section.body()?;
    if body.len() % 4 != 0 {
        return Err(ParseError::Truncated { needed: body.len().next_multiple_of(4), available: body.len() });
    }

    let truncated = |_| ParseError::Truncated { needed: body.len() + 4, available: body.len() };
    let mut br = BitReader::endian(body, BigEndian);
    let mut network_pid = None;
    let mut programs = Vec::with_capacity(body.len() / 4);
    for _ in 0..body.len() / 4 {
        let program_number = br.read::<16, u16>().map_err(truncated)?;
        br.skip(3).map_err(truncated)?;
        let pid = br.read::<13, u16>().map_err(truncated)?;
        if program_number == 0 {
            network_pid = Some(pid);
        } else {
            programs.push(PatEntry { program_number, pmt_pid: pid });
        }
    }

    Ok(PatTable {
        transport_stream_id: hdr.table_id_extension,
        version: hdr.version,
        current_next: hdr.current_next,
        network_pid,
        programs,
    })
}
