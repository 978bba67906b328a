//! Fixed-size MXF value types and the size-checked readers used by the
//! local-set decoders.

use std::fmt;

use crate::constants::ARRAY_HEADER_LEN;
use crate::error::{ParseError, Result};
use crate::mxf::ul::{Ul, Umid};

/// SMPTE Rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fraction {
    pub num: i32,
    pub den: i32,
}

impl Fraction {
    pub fn parse(v: &[u8]) -> Result<Self> {
        let b = fixed::<8>(v)?;
        Ok(Self {
            num: i32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            den: i32::from_be_bytes([b[4], b[5], b[6], b[7]]),
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        (self.den != 0).then(|| self.num as f64 / self.den as f64)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Date and time with quarter-millisecond resolution. All zero means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub year:            u16,
    pub month:           u8,
    pub day:             u8,
    pub hour:            u8,
    pub minute:          u8,
    pub second:          u8,
    pub quarter_msecond: u8,
}

impl Timestamp {
    pub fn parse(v: &[u8]) -> Result<Self> {
        let b = fixed::<8>(v)?;
        Ok(Self {
            year: u16::from_be_bytes([b[0], b[1]]),
            month: b[2],
            day: b[3],
            hour: b[4],
            minute: b[5],
            second: b[6],
            quarter_msecond: b[7],
        })
    }

    pub fn is_unknown(&self) -> bool {
        *self == Timestamp::default()
    }

    /// Converts to chrono, `None` for unknown or impossible dates.
    pub fn to_datetime(&self) -> Option<chrono::NaiveDateTime> {
        let date = chrono::NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?;
        date.and_hms_milli_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            self.quarter_msecond as u32 * 4,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductVersion {
    pub major:   u16,
    pub minor:   u16,
    pub patch:   u16,
    pub build:   u16,
    pub release: u16,
}

impl ProductVersion {
    pub fn parse(v: &[u8]) -> Result<Self> {
        let b = fixed::<10>(v)?;
        let at = |i: usize| u16::from_be_bytes([b[i], b[i + 1]]);
        Ok(Self { major: at(0), minor: at(2), patch: at(4), build: at(6), release: at(8) })
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}.{}", self.major, self.minor, self.patch, self.build, self.release)
    }
}

/// Value bytes as an array of exactly `N` bytes.
pub(crate) fn fixed<const N: usize>(v: &[u8]) -> Result<[u8; N]> {
    v.try_into()
        .map_err(|_| ParseError::invalid(format!("expected {N} bytes, got {}", v.len())))
}

pub(crate) fn read_u8(v: &[u8]) -> Result<u8> {
    Ok(fixed::<1>(v)?[0])
}

pub(crate) fn read_i8(v: &[u8]) -> Result<i8> {
    Ok(fixed::<1>(v)?[0] as i8)
}

pub(crate) fn read_bool(v: &[u8]) -> Result<bool> {
    Ok(read_u8(v)? != 0)
}

pub(crate) fn read_u16(v: &[u8]) -> Result<u16> {
    Ok(u16::from_be_bytes(fixed(v)?))
}

pub(crate) fn read_i16(v: &[u8]) -> Result<i16> {
    Ok(i16::from_be_bytes(fixed(v)?))
}

pub(crate) fn read_u32(v: &[u8]) -> Result<u32> {
    Ok(u32::from_be_bytes(fixed(v)?))
}

pub(crate) fn read_i32(v: &[u8]) -> Result<i32> {
    Ok(i32::from_be_bytes(fixed(v)?))
}

pub(crate) fn read_u64(v: &[u8]) -> Result<u64> {
    Ok(u64::from_be_bytes(fixed(v)?))
}

pub(crate) fn read_i64(v: &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(fixed(v)?))
}

pub(crate) fn read_ul(v: &[u8]) -> Result<Ul> {
    Ok(Ul(fixed(v)?))
}

pub(crate) fn read_umid(v: &[u8]) -> Result<Umid> {
    Ok(Umid(fixed(v)?))
}

pub(crate) fn read_fraction(v: &[u8]) -> Result<Fraction> {
    Fraction::parse(v)
}

pub(crate) fn read_timestamp(v: &[u8]) -> Result<Timestamp> {
    Timestamp::parse(v)
}

pub(crate) fn read_product_version(v: &[u8]) -> Result<ProductVersion> {
    ProductVersion::parse(v)
}

/// UTF-16BE string; a trailing NUL is dropped.
pub(crate) fn read_utf16(v: &[u8]) -> Result<String> {
    if v.len() % 2 != 0 {
        return Err(ParseError::invalid(format!("odd UTF-16 length {}", v.len())));
    }
    let units: Vec<u16> = v.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    let mut s = String::from_utf16_lossy(&units);
    while s.ends_with('\0') {
        s.pop();
    }
    Ok(s)
}

/// Elements of a batch/array value: `count: u32`, `element_size: u32`, then
/// `count` elements. An empty array skips the size check.
pub(crate) fn array_items(v: &[u8], element_size: usize) -> Result<std::slice::ChunksExact<'_, u8>> {
    ParseError::check_len(v, ARRAY_HEADER_LEN)?;
    let count = u32::from_be_bytes([v[0], v[1], v[2], v[3]]) as usize;
    let declared = u32::from_be_bytes([v[4], v[5], v[6], v[7]]) as usize;
    if count == 0 {
        return Ok(v[..0].chunks_exact(element_size.max(1)));
    }
    if declared != element_size {
        return Err(ParseError::invalid(format!(
            "array element size {declared}, expected {element_size}"
        )));
    }
    let needed = count
        .checked_mul(element_size)
        .and_then(|n| n.checked_add(ARRAY_HEADER_LEN))
        .ok_or_else(|| ParseError::invalid("array size overflow"))?;
    ParseError::check_len(v, needed)?;
    Ok(v[ARRAY_HEADER_LEN..needed].chunks_exact(element_size))
}

pub(crate) fn read_ul_array(v: &[u8]) -> Result<Vec<Ul>> {
    array_items(v, 16)?.map(read_ul).collect()
}

pub(crate) fn read_u32_array(v: &[u8]) -> Result<Vec<u32>> {
    array_items(v, 4)?.map(read_u32).collect()
}
