//! Runtime configuration for the TS demuxer and the MXF reader.

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

/// Demuxer settings. Deserializable from the JSON file given to `--config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemuxConfig {
    /// Fixed transport packet size; `None` detects 188/192/204/208.
    pub packet_size: Option<usize>,
    /// Verify the CRC-32 of PSI sections before applying them.
    pub check_crc: bool,
    /// Programs routed to per-program outputs.
    pub program_numbers: Vec<u16>,
    /// Drop sections whose version was already applied.
    pub skip_unchanged_versions: bool,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            packet_size: Some(crate::constants::TS_PACKET_SIZE),
            check_crc: false,
            program_numbers: Vec::new(),
            skip_unchanged_versions: true,
        }
    }
}

impl DemuxConfig {
    /// Parses a colon separated program list such as `"1:2:0x10"`.
    /// Empty items are ignored.
    pub fn parse_program_list(list: &str) -> Result<Vec<u16>> {
        list.split(':')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u16::from_str_radix(hex, 16),
                    None => s.parse::<u16>(),
                };
                parsed.map_err(|_| ParseError::invalid(format!("bad program number {s:?}")))
            })
            .collect()
    }
}

/// MXF reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MxfConfig {
    /// Collect all index segment tags before decoding the entry array, so the
    /// slice and position-table counts may follow it in the stream.
    pub two_pass_index_decode: bool,
}

impl Default for MxfConfig {
    fn default() -> Self {
        Self { two_pass_index_decode: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_list_accepts_decimal_and_hex() {
        assert_eq!(DemuxConfig::parse_program_list("1:2:0x10").unwrap(), vec![1, 2, 16]);
        assert_eq!(DemuxConfig::parse_program_list("").unwrap(), Vec::<u16>::new());
        assert_eq!(DemuxConfig::parse_program_list("3::4").unwrap(), vec![3, 4]);
    }

    #[test]
    fn program_list_rejects_garbage() {
        assert!(matches!(
            DemuxConfig::parse_program_list("1:abc"),
            Err(ParseError::Invalid(_))
        ));
        assert!(DemuxConfig::parse_program_list("70000").is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg: DemuxConfig = serde_json::from_str(r#"{"program_numbers":[5,7]}"#).unwrap();
        assert_eq!(cfg.program_numbers, vec![5, 7]);
        assert_eq!(cfg.packet_size, Some(188));
        assert!(!cfg.check_crc);
        assert!(cfg.skip_unchanged_versions);

        let mxf: MxfConfig = serde_json::from_str("{}").unwrap();
        assert!(mxf.two_pass_index_decode);
    }
}
