use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::constants::{MXF_KEY_LEN, PARTITION_PACK_FIXED_LEN, PARTITION_PACK_MIN_LEN};
use crate::error::{ParseError, Result};
use crate::mxf::types::read_ul_array;
use crate::mxf::ul::{PartitionKind, Ul};

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionPack {
    pub kind:                PartitionKind,
    pub closed:              bool,
    pub complete:            bool,
    pub major_version:       u16,
    pub minor_version:       u16,
    pub kag_size:            u32,
    pub this_partition:      u64,
    pub previous_partition:  u64,
    pub footer_partition:    u64,
    pub header_byte_count:   u64,
    pub index_byte_count:    u64,
    pub index_sid:           u32,
    pub body_offset:         u64,
    pub body_sid:            u32,
    pub operational_pattern: Ul,
    pub essence_containers:  Vec<Ul>,
}

impl PartitionPack {
    pub fn parse(key: &Ul, data: &[u8]) -> Result<Self> {
        let kind = key
            .partition_kind()
            .ok_or_else(|| ParseError::invalid(format!("{key} is not a partition pack key")))?;
        if data.len() < PARTITION_PACK_MIN_LEN {
            return Err(ParseError::Truncated { needed: PARTITION_PACK_MIN_LEN, available: data.len() });
        }
        // 84 bytes reach the array count but not its element size
        if data.len() < PARTITION_PACK_FIXED_LEN {
            return Err(ParseError::invalid("partition pack essence container array header cut short"));
        }

        // key byte 14: 1 open/incomplete, 2 closed/incomplete, 3 open/complete, 4 closed/complete
        let status = key.0[14];
        let truncated = |_| ParseError::Truncated { needed: PARTITION_PACK_FIXED_LEN, available: data.len() };
        let mut br = BitReader::endian(data, BigEndian);

        let major_version = br.read::<16, u16>().map_err(truncated)?;
        if major_version != 1 {
            return Err(ParseError::invalid(format!("partition major version {major_version}")));
        }
        let minor_version = br.read::<16, u16>().map_err(truncated)?;
        let kag_size = br.read::<32, u32>().map_err(truncated)?;
        let this_partition = br.read::<64, u64>().map_err(truncated)?;
        let previous_partition = br.read::<64, u64>().map_err(truncated)?;
        let footer_partition = br.read::<64, u64>().map_err(truncated)?;
        let header_byte_count = br.read::<64, u64>().map_err(truncated)?;
        let index_byte_count = br.read::<64, u64>().map_err(truncated)?;
        let index_sid = br.read::<32, u32>().map_err(truncated)?;
        let body_offset = br.read::<64, u64>().map_err(truncated)?;
        let body_sid = br.read::<32, u32>().map_err(truncated)?;
        let mut op = [0u8; 16];
        br.read_bytes(&mut op).map_err(truncated)?;

        // checked even when the batch is empty
        br.skip(32).map_err(truncated)?; // count
        let ec_size = br.read::<32, u32>().map_err(truncated)?;
        if ec_size != MXF_KEY_LEN as u32 {
            return Err(ParseError::invalid(format!("essence container UL size {ec_size}")));
        }
        let essence_containers = read_ul_array(&data[PARTITION_PACK_FIXED_LEN - 8..])
            .map_err(|e| ParseError::invalid(format!("essence container batch: {e}")))?;

        Ok(Self {
            kind,
            closed: matches!(status, 0x02 | 0x04),
            complete: status >= 0x03,
            major_version,
            minor_version,
            kag_size,
            this_partition,
            previous_partition,
            footer_partition,
            header_byte_count,
            index_byte_count,
            index_sid,
            body_offset,
            body_sid,
            operational_pattern: Ul(op),
            essence_containers,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn partition_key(kind: u8, status: u8) -> Ul {
        Ul([
            0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, kind, status, 0x00,
        ])
    }

    pub(crate) fn partition_body(major: u16, containers: &[Ul]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend(major.to_be_bytes());
        v.extend(3u16.to_be_bytes());
        v.extend(512u32.to_be_bytes());
        v.extend(0u64.to_be_bytes()); // this
        v.extend(0u64.to_be_bytes()); // previous
        v.extend(4096u64.to_be_bytes()); // footer
        v.extend(1024u64.to_be_bytes()); // header bytes
        v.extend(0u64.to_be_bytes()); // index bytes
        v.extend(0u32.to_be_bytes());
        v.extend(0u64.to_be_bytes());
        v.extend(1u32.to_be_bytes());
        v.extend([0x0d; 16]);
        v.extend((containers.len() as u32).to_be_bytes());
        v.extend(16u32.to_be_bytes());
        for c in containers {
            v.extend(c.0);
        }
        v
    }

    #[test]
    fn parses_header_partition() {
        let ec = Ul([7; 16]);
        let p = PartitionPack::parse(&partition_key(0x02, 0x04), &partition_body(1, &[ec])).unwrap();
        assert_eq!(p.kind, PartitionKind::Header);
        assert!(p.closed && p.complete);
        assert_eq!(p.minor_version, 3);
        assert_eq!(p.kag_size, 512);
        assert_eq!(p.footer_partition, 4096);
        assert_eq!(p.header_byte_count, 1024);
        assert_eq!(p.body_sid, 1);
        assert_eq!(p.operational_pattern, Ul([0x0d; 16]));
        assert_eq!(p.essence_containers, vec![ec]);
    }

    #[test]
    fn open_incomplete_body() {
        let p = PartitionPack::parse(&partition_key(0x03, 0x01), &partition_body(1, &[])).unwrap();
        assert_eq!(p.kind, PartitionKind::Body);
        assert!(!p.closed && !p.complete);
    }

    #[test]
    fn rejects_bad_versions_and_lengths() {
        let key = partition_key(0x02, 0x01);
        assert!(matches!(
            PartitionPack::parse(&key, &partition_body(2, &[])),
            Err(ParseError::Invalid(_))
        ));
        let body = partition_body(1, &[]);
        assert!(matches!(PartitionPack::parse(&key, &body[..80]), Err(ParseError::Truncated { .. })));
        assert!(matches!(PartitionPack::parse(&key, &body[..86]), Err(ParseError::Invalid(_))));

        let mut bad_size = partition_body(1, &[Ul([1; 16])]);
        bad_size[87] = 15;
        assert!(matches!(PartitionPack::parse(&key, &bad_size), Err(ParseError::Invalid(_))));
        let mut empty_bad_size = partition_body(1, &[]);
        empty_bad_size[87] = 0;
        assert!(matches!(PartitionPack::parse(&key, &empty_bad_size), Err(ParseError::Invalid(_))));
        assert!(PartitionPack::parse(&Ul::ZERO, &body).is_err());
    }
}
