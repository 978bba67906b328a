use bitstream_io::{BigEndian, BitRead, BitReader};
use bytes::Bytes;

use crate::constants::*;
use crate::error::{ParseError, Result};
use crate::psi::descriptor::{descriptors_len, parse_descriptors, Descriptor};
use crate::psi::section::{build_section, Section};

/// ─────────── PMT ───────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtTable {
    pub program_number: u16,
    pub version:        u8,
    pub pcr_pid:        u16,
    pub descriptors:    Vec<Descriptor>,
    pub streams:        Vec<PmtStream>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtStream {
    pub stream_type:    u8,
    pub elementary_pid: u16,
    pub descriptors:    Vec<Descriptor>,
}

impl PmtStream {
    pub fn languages(&self) -> Vec<String> {
        self.descriptors.iter().flat_map(Descriptor::languages).collect()
    }

    pub fn registration_id(&self) -> Option<[u8; 4]> {
        self.descriptors.iter().find_map(Descriptor::registration_id)
    }
}

impl PmtTable {
    pub fn stream(&self, pid: u16) -> Option<&PmtStream> {
        self.streams.iter().find(|s| s.elementary_pid == pid)
    }

    /// Encodes the table as a single section; `pid` is the PMT PID it travels on.
    pub fn to_section(&self, pid: u16, version: u8) -> Section {
        let mut body = Vec::new();
        body.extend_from_slice(&(0xE000 | (self.pcr_pid & PID_MASK)).to_be_bytes());
        body.extend_from_slice(&(0xF000 | descriptors_len(&self.descriptors) as u16).to_be_bytes());
        for d in &self.descriptors {
            d.write(&mut body);
        }
        for s in &self.streams {
            body.push(s.stream_type);
            body.extend_from_slice(&(0xE000 | (s.elementary_pid & PID_MASK)).to_be_bytes());
            body.extend_from_slice(&(0xF000 | descriptors_len(&s.descriptors) as u16).to_be_bytes());
            for d in &s.descriptors {
                d.write(&mut body);
            }
        }
        let raw = build_section(TABLE_ID_PMT, self.program_number, version, &body);
        Section { table_id: TABLE_ID_PMT, pid, data: Bytes::from(raw) }
    }
}

/// Parses a complete PMT section. The CRC is left to the caller.
pub fn parse_pmt(section: &Section) -> Result<PmtTable> {
    if section.table_id != TABLE_ID_PMT {
        return Err(ParseError::invalid(format!("table_id 0x{:02x} is not a PMT", section.table_id)));
    }
    let hdr = section
        .header()?
        .ok_or_else(|| ParseError::invalid("PMT without section_syntax_indicator"))?;
    let b = section.body()?;

    /* ── fixed header inside the body ── */
    ParseError::check_len(b, 4)?;
    let (pcr_pid, prog_info_len) = pid_and_length(&b[..4])?;
    ParseError::check_len(b, 4 + prog_info_len)?;
    let descriptors = parse_descriptors(&b[4..4 + prog_info_len])?;
    let mut idx = 4 + prog_info_len;

    /* ── ES loop ── */
    let mut streams = Vec::new();
    while idx < b.len() {
        let rest = &b[idx..];
        ParseError::check_len(rest, 5)?;
        let stream_type = rest[0];
        let (elementary_pid, es_info_len) = pid_and_length(&rest[1..5])?;
        ParseError::check_len(rest, 5 + es_info_len)?;
        streams.push(PmtStream {
            stream_type,
            elementary_pid,
            descriptors: parse_descriptors(&rest[5..5 + es_info_len])?,
        });
        idx += 5 + es_info_len;
    }

    Ok(PmtTable {
        program_number: hdr.table_id_extension,
        version: hdr.version,
        pcr_pid,
        descriptors,
        streams,
    })
}

/// 3 reserved bits + 13-bit PID, then 4 reserved bits + 12-bit length.
fn pid_and_length(b: &[u8]) -> Result<(u16, usize)> {
    let truncated = |_| ParseError::Truncated { needed: 4, available: b.len() };
    let mut br = BitReader::endian(b, BigEndian);
    br.skip(3).map_err(truncated)?;
    let pid = br.read::<13, u16>().map_err(truncated)?;
    br.skip(4).map_err(truncated)?;
    let len = br.read::<12, u16>().map_err(truncated)?;
    Ok((pid, len as usize))
}

/// Human readable name for a PMT stream_type.
pub fn stream_type_name(stream_type: u8) -> &'static str {
    match stream_type {
        0x01 => "MPEG-1 Video",
        0x02 => "MPEG-2 Video",
        0x03 => "MPEG-1 Audio",
        0x04 => "MPEG-2 Audio",
        0x06 => "PES private data",
        0x0F => "AAC (ADTS)",
        0x11 => "AAC (LATM)",
        0x15 => "Metadata",
        0x1B => "H.264",
        0x24 => "H.265",
        0x81 => "AC-3",
        0x87 => "E-AC-3",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PmtTable {
        PmtTable {
            program_number: 5,
            version: 1,
            pcr_pid: 501,
            descriptors: vec![Descriptor { tag: 0x05, data: b"CUEI".to_vec() }],
            streams: vec![
                PmtStream { stream_type: 0x1B, elementary_pid: 501, descriptors: vec![] },
                PmtStream {
                    stream_type: 0x03,
                    elementary_pid: 502,
                    descriptors: vec![Descriptor { tag: 0x0A, data: vec![b'f', b'r', b'a', 0] }],
                },
            ],
        }
    }

    #[test]
    fn parses_streams_and_descriptors() {
        let pmt = parse_pmt(&sample().to_section(0x50, 1)).unwrap();
        assert_eq!(pmt, sample());
        assert_eq!(pmt.stream(502).unwrap().languages(), vec!["fra".to_string()]);
        assert_eq!(pmt.descriptors[0].registration_id(), Some(*b"CUEI"));
        assert!(pmt.stream(999).is_none());
    }

    #[test]
    fn es_info_overrun_is_truncated() {
        // one stream whose ES_info_length claims 16 bytes but only 2 follow
        let body = [0xE1, 0xF5, 0xF0, 0x00, 0x1B, 0xE1, 0xF5, 0xF0, 0x10, 0x0A, 0x00];
        let sec = Section::new(0x50, Bytes::from(build_section(TABLE_ID_PMT, 5, 0, &body))).unwrap();
        assert_eq!(parse_pmt(&sec), Err(ParseError::Truncated { needed: 21, available: 7 }));
    }

    #[test]
    fn dangling_stream_header_is_truncated() {
        let body = [0xE1, 0xF5, 0xF0, 0x00, 0x1B, 0xE1];
        let sec = Section::new(0x50, Bytes::from(build_section(TABLE_ID_PMT, 5, 0, &body))).unwrap();
        assert!(matches!(parse_pmt(&sec), Err(ParseError::Truncated { .. })));
    }

    #[test]
    fn program_info_overrun_is_truncated() {
        let body = [0xE1, 0xF5, 0xF0, 0x08, 0x05, 0x04];
        let sec = Section::new(0x50, Bytes::from(build_section(TABLE_ID_PMT, 5, 0, &body))).unwrap();
        assert!(matches!(parse_pmt(&sec), Err(ParseError::Truncated { .. })));
    }
}
