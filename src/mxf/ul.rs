//! SMPTE Universal Labels and the key predicates used to classify KLVs.
//!
//! Every predicate matches a fixed prefix plus a few marker bytes; none of
//! them is a plain 16-byte equality.

use std::fmt;

/// 16-byte Universal Label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Ul(pub [u8; 16]);

const MXF_KEY: [u8; 4] = [0x06, 0x0e, 0x2b, 0x34];

const PARTITION_PACK_KEY: [u8; 13] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01,
];

const FILL_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x01, 0x03, 0x01, 0x02, 0x10, 0x01, 0x00, 0x00, 0x00,
];

const PRIMER_PACK_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x05, 0x01, 0x00,
];

const METADATA_KEY: [u8; 13] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01,
];

const RANDOM_INDEX_PACK_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x11, 0x01, 0x00,
];

const INDEX_TABLE_SEGMENT_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x10, 0x01, 0x00,
];

/// Which partition a partition pack opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Header,
    Body,
    Footer,
}

impl Ul {
    pub const ZERO: Ul = Ul([0; 16]);

    pub fn from_slice(b: &[u8]) -> Option<Ul> {
        let arr: [u8; 16] = b.try_into().ok()?;
        Some(Ul(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }

    pub fn is_mxf_packet(&self) -> bool {
        self.0[..4] == MXF_KEY
    }

    pub fn is_partition_pack(&self) -> bool {
        self.0[..13] == PARTITION_PACK_KEY
            && (0x02..=0x04).contains(&self.0[13])
            && self.0[14] < 0x05
            && self.0[15] == 0x00
    }

    pub fn partition_kind(&self) -> Option<PartitionKind> {
        if !self.is_partition_pack() {
            return None;
        }
        match self.0[13] {
            0x02 => Some(PartitionKind::Header),
            0x03 => Some(PartitionKind::Body),
            _ => Some(PartitionKind::Footer),
        }
    }

    pub fn is_header_partition_pack(&self) -> bool {
        self.partition_kind() == Some(PartitionKind::Header)
    }

    pub fn is_body_partition_pack(&self) -> bool {
        self.partition_kind() == Some(PartitionKind::Body)
    }

    pub fn is_footer_partition_pack(&self) -> bool {
        self.partition_kind() == Some(PartitionKind::Footer)
    }

    pub fn is_fill(&self) -> bool {
        self.0 == FILL_KEY
    }

    pub fn is_primer_pack(&self) -> bool {
        self.0 == PRIMER_PACK_KEY
    }

    pub fn is_metadata(&self) -> bool {
        self.0[..13] == METADATA_KEY && self.0[15] == 0x00
    }

    /// Set type carried in bytes 13..15 of a metadata key.
    pub fn metadata_type(&self) -> u16 {
        u16::from_be_bytes([self.0[13], self.0[14]])
    }

    pub fn is_random_index_pack(&self) -> bool {
        self.0 == RANDOM_INDEX_PACK_KEY
    }

    pub fn is_index_table_segment(&self) -> bool {
        self.0 == INDEX_TABLE_SEGMENT_KEY
    }

    pub fn is_generic_container_system_item(&self) -> bool {
        let u = &self.0;
        self.is_mxf_packet()
            && u[4] == 0x02
            && u[6] == 0x01
            && u[8] == 0x0d
            && u[9] == 0x01
            && u[10] == 0x03
            && u[11] == 0x01
            && matches!(u[12], 0x04 | 0x14)
    }

    pub fn is_generic_container_essence_element(&self) -> bool {
        let u = &self.0;
        self.is_mxf_packet()
            && u[4] == 0x01
            && u[5] == 0x02
            && u[6] == 0x01
            && u[8] == 0x0d
            && u[9] == 0x01
            && u[10] == 0x03
            && u[11] == 0x01
            && matches!(u[12], 0x05 | 0x06 | 0x07 | 0x15 | 0x16 | 0x17 | 0x18)
    }

    /// Track number of an essence element key (bytes 12..16).
    pub fn essence_track_number(&self) -> u32 {
        u32::from_be_bytes([self.0[12], self.0[13], self.0[14], self.0[15]])
    }

    /// `06.0e.2b.34.04.01.01.xx.0d.01.03.01` followed by mapping kind 1 or 2.
    pub fn is_generic_container_essence_container_label(&self) -> bool {
        let u = &self.0;
        self.is_mxf_packet()
            && u[4] == 0x04
            && u[5] == 0x01
            && u[6] == 0x01
            && u[8] == 0x0d
            && u[9] == 0x01
            && u[10] == 0x03
            && u[11] == 0x01
            && matches!(u[12], 0x01 | 0x02)
    }
}

impl fmt::Display for Ul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Ul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ul({self})")
    }
}

/// 32-byte SMPTE 330M UMID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Umid(pub [u8; 32]);

impl Umid {
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }
}

impl fmt::Display for Umid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Umid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Umid({self})")
    }
}

/// Track kind named by a sequence's data definition (SMPTE RP 224).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Timecode12mInactive,
    Timecode12mActive,
    Timecode309m,
    Metadata,
    PictureEssence,
    SoundEssence,
    DataEssence,
    AuxiliaryData,
    ParsedText,
    Unknown,
}

impl TrackType {
    pub fn from_data_definition(ul: &Ul) -> TrackType {
        const PREFIX: [u8; 11] = [0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x01, 0x03, 0x02];
        let u = &ul.0;
        if u[..11] != PREFIX || u[13..] != [0, 0, 0] {
            return TrackType::Unknown;
        }
        match (u[11], u[12]) {
            (0x01, 0x01) => TrackType::Timecode12mInactive,
            (0x01, 0x02) => TrackType::Timecode12mActive,
            (0x01, 0x03) => TrackType::Timecode309m,
            (0x01, 0x10) => TrackType::Metadata,
            (0x02, 0x01) => TrackType::PictureEssence,
            (0x02, 0x02) => TrackType::SoundEssence,
            (0x02, 0x03) => TrackType::DataEssence,
            (0x03, 0x01) => TrackType::AuxiliaryData,
            (0x03, 0x02) => TrackType::ParsedText,
            _ => TrackType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition_key(kind: u8, status: u8) -> Ul {
        let mut k = [0u8; 16];
        k[..13].copy_from_slice(&PARTITION_PACK_KEY);
        k[13] = kind;
        k[14] = status;
        Ul(k)
    }

    #[test]
    fn partition_pack_marker_bytes() {
        assert!(partition_key(0x02, 0x04).is_header_partition_pack());
        assert!(partition_key(0x03, 0x01).is_body_partition_pack());
        assert!(partition_key(0x04, 0x02).is_footer_partition_pack());
        assert!(!partition_key(0x05, 0x01).is_partition_pack());
        assert!(!partition_key(0x02, 0x05).is_partition_pack());
        let mut k = partition_key(0x02, 0x01);
        k.0[15] = 1;
        assert!(!k.is_partition_pack());
        // primer shares the 13-byte prefix
        assert!(!Ul(PRIMER_PACK_KEY).is_partition_pack());
        assert!(Ul(PRIMER_PACK_KEY).is_primer_pack());
    }

    #[test]
    fn metadata_key_and_type() {
        let mut k = [0u8; 16];
        k[..13].copy_from_slice(&METADATA_KEY);
        k[13] = 0x01;
        k[14] = 0x42;
        let ul = Ul(k);
        assert!(ul.is_metadata());
        assert_eq!(ul.metadata_type(), 0x0142);
        k[15] = 1;
        assert!(!Ul(k).is_metadata());
        assert!(!Ul(INDEX_TABLE_SEGMENT_KEY).is_metadata());
        assert!(Ul(INDEX_TABLE_SEGMENT_KEY).is_index_table_segment());
    }

    #[test]
    fn generic_container_keys() {
        let element = Ul([
            0x06, 0x0e, 0x2b, 0x34, 0x01, 0x02, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x16, 0x01, 0x01, 0x01,
        ]);
        assert!(element.is_generic_container_essence_element());
        assert!(!element.is_generic_container_system_item());
        assert_eq!(element.essence_track_number(), 0x1601_0101);

        let label = Ul([
            0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x03, 0x0d, 0x01, 0x03, 0x01, 0x02, 0x06, 0x01, 0x00,
        ]);
        assert!(label.is_generic_container_essence_container_label());
        assert!(!Ul::ZERO.is_mxf_packet());
        assert!(Ul(FILL_KEY).is_fill());
        assert!(Ul(RANDOM_INDEX_PACK_KEY).is_random_index_pack());
    }

    #[test]
    fn display_is_dotted_hex() {
        assert_eq!(
            Ul(FILL_KEY).to_string(),
            "06.0e.2b.34.01.01.01.01.03.01.02.10.01.00.00.00"
        );
    }

    #[test]
    fn track_types() {
        let mut dd = [0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x01, 0x03, 0x02, 0x02, 0x02, 0, 0, 0];
        assert_eq!(TrackType::from_data_definition(&Ul(dd)), TrackType::SoundEssence);
        dd[12] = 0x01;
        assert_eq!(TrackType::from_data_definition(&Ul(dd)), TrackType::PictureEssence);
        assert_eq!(TrackType::from_data_definition(&Ul::ZERO), TrackType::Unknown);
    }
}
