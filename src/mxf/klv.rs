//! KLV (Key-Length-Value) framing
//!
//! Every MXF object is a 16-byte key, a BER-encoded length and the value.

use crate::constants::MXF_KEY_LEN;
use crate::error::{ParseError, Result};
use crate::mxf::ul::Ul;

/// One KLV borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct Klv<'a> {
    pub key:    Ul,
    pub value:  &'a [u8],
    /// Offset of the key in the input
    pub offset: usize,
}

/// Decodes a BER length, returning `(length, bytes used)`.
pub fn read_ber_length(data: &[u8]) -> Result<(u64, usize)> {
    ParseError::check_len(data, 1)?;
    let first = data[0];
    if first < 0x80 {
        return Ok((first as u64, 1));
    }
    if first == 0x80 {
        return Err(ParseError::invalid("indefinite BER length"));
    }
    let n = (first & 0x7F) as usize;
    if n > 8 {
        return Err(ParseError::invalid(format!("BER length of {n} bytes")));
    }
    ParseError::check_len(data, 1 + n)?;
    let len = data[1..1 + n].iter().fold(0u64, |acc, &b| acc << 8 | b as u64);
    Ok((len, 1 + n))
}

/// Shortest BER encoding of `len` (long form above 127).
pub fn encode_ber_length(len: u64) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let mut out = Vec::with_capacity(1 + 8 - skip);
    out.push(0x80 | (8 - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
    out
}

/// Iterates the KLVs of a buffer. Stops after the first framing error.
pub struct KlvReader<'a> {
    data:     &'a [u8],
    position: usize,
    failed:   bool,
}

impl<'a> KlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        KlvReader { data, position: 0, failed: false }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn read_klv(&mut self) -> Result<Klv<'a>> {
        let rest = &self.data[self.position..];
        ParseError::check_len(rest, MXF_KEY_LEN)?;
        let key = Ul::from_slice(&rest[..MXF_KEY_LEN])
            .ok_or_else(|| ParseError::invalid("short key"))?;
        let (len, len_size) = read_ber_length(&rest[MXF_KEY_LEN..])?;
        let start = MXF_KEY_LEN + len_size;
        let len = usize::try_from(len).map_err(|_| ParseError::invalid("KLV length overflow"))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| ParseError::invalid("KLV length overflow"))?;
        ParseError::check_len(rest, end)?;

        let klv = Klv { key, value: &rest[start..end], offset: self.position };
        self.position += end;
        Ok(klv)
    }
}

impl<'a> Iterator for KlvReader<'a> {
    type Item = Result<Klv<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.data.len() {
            return None;
        }
        let item = self.read_klv();
        self.failed = item.is_err();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ber_short_and_long_form() {
        assert_eq!(read_ber_length(&[0x05]).unwrap(), (5, 1));
        assert_eq!(read_ber_length(&[0x83, 0x01, 0x00, 0x00]).unwrap(), (65536, 4));
        assert!(matches!(read_ber_length(&[0x80]), Err(ParseError::Invalid(_))));
        assert!(matches!(read_ber_length(&[0x84, 0x01]), Err(ParseError::Truncated { .. })));
        assert!(matches!(read_ber_length(&[0x89; 10]), Err(ParseError::Invalid(_))));
        assert_eq!(encode_ber_length(300), vec![0x82, 0x01, 0x2c]);
        assert_eq!(encode_ber_length(127), vec![0x7f]);
    }

    #[test]
    fn reads_consecutive_klvs() {
        let mut data = vec![0x11; 16];
        data.push(0x02);
        data.extend([0xAA, 0xBB]);
        data.extend([0x22; 16]);
        data.extend([0x81, 0x01, 0xCC]);

        let klvs: Vec<_> = KlvReader::new(&data).collect::<Result<_>>().unwrap();
        assert_eq!(klvs.len(), 2);
        assert_eq!(klvs[0].value, &[0xAA, 0xBB]);
        assert_eq!(klvs[1].offset, 19);
        assert_eq!(klvs[1].value, &[0xCC]);
    }

    #[test]
    fn truncated_value_stops_iteration() {
        let mut data = vec![0x11; 16];
        data.extend([0x05, 0x00]);
        let mut r = KlvReader::new(&data);
        assert!(matches!(r.next(), Some(Err(ParseError::Truncated { .. }))));
        assert!(r.next().is_none());
    }
}
