//! Index table segments.
//!
//! The segment is decoded on its numeric tags without consulting the
//! primer. The size of each index entry depends on `slice_count` and
//! `pos_table_count`, so the entry array (0x3f0a) can only be decoded once
//! both are known.

use tracing::debug;

use crate::config::MxfConfig;
use crate::error::{ParseError, Result};
use crate::mxf::local_tag::{LocalTag, LocalTagIter};
use crate::mxf::types::{
    Fraction, array_items, read_fraction, read_i64, read_u8, read_u32, read_u64, read_ul,
};
use crate::mxf::ul::Ul;

const DELTA_ENTRY_LEN: usize = 6;
const INDEX_ENTRY_FIXED_LEN: usize = 11;

const TAG_INDEX_ENTRIES: u16 = 0x3f0a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaEntry {
    pub pos_table_index: i8,
    pub slice:           u8,
    pub element_delta:   u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub temporal_offset:  i8,
    pub key_frame_offset: i8,
    pub flags:            u8,
    pub stream_offset:    u64,
    /// One offset per slice after the first (`slice_count` entries).
    pub slice_offset:     Vec<u32>,
    pub pos_table:        Vec<Fraction>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexTableSegment {
    pub instance_uid:         Ul,
    pub index_edit_rate:      Fraction,
    pub index_start_position: i64,
    pub index_duration:       i64,
    pub edit_unit_byte_count: u32,
    pub index_sid:            u32,
    pub body_sid:             u32,
    pub slice_count:          u8,
    pub pos_table_count:      u8,
    pub delta_entries:        Vec<DeltaEntry>,
    pub index_entries:        Vec<IndexEntry>,
}

impl IndexTableSegment {
    pub fn parse(data: &[u8], config: &MxfConfig) -> Result<Self> {
        let mut seg = IndexTableSegment::default();
        let mut have_slice_count = false;
        let mut have_pos_table_count = false;
        let mut entries: Option<&[u8]> = None;

        for item in LocalTagIter::new(data) {
            let LocalTag { tag, value } = item?;
            match tag {
                0x3c0a => seg.instance_uid = read_ul(value)?,
                0x3f0b => seg.index_edit_rate = read_fraction(value)?,
                0x3f0c => seg.index_start_position = read_i64(value)?,
                0x3f0d => seg.index_duration = read_i64(value)?,
                0x3f05 => seg.edit_unit_byte_count = read_u32(value)?,
                0x3f06 => seg.index_sid = read_u32(value)?,
                0x3f07 => seg.body_sid = read_u32(value)?,
                0x3f08 => {
                    seg.slice_count = read_u8(value)?;
                    have_slice_count = true;
                }
                0x3f0e => {
                    seg.pos_table_count = read_u8(value)?;
                    have_pos_table_count = true;
                }
                0x3f09 => seg.delta_entries = parse_delta_entries(value)?,
                TAG_INDEX_ENTRIES if config.two_pass_index_decode => entries = Some(value),
                TAG_INDEX_ENTRIES => {
                    if !(have_slice_count && have_pos_table_count) {
                        return Err(ParseError::invalid(
                            "index entry array precedes slice_count/pos_table_count",
                        ));
                    }
                    seg.index_entries = parse_index_entries(value, seg.slice_count, seg.pos_table_count)?;
                }
                other => debug!(tag = format_args!("0x{other:04x}"), "unhandled index segment tag"),
            }
        }

        // counts absent from the segment are zero
        if let Some(value) = entries {
            seg.index_entries = parse_index_entries(value, seg.slice_count, seg.pos_table_count)?;
        }
        Ok(seg)
    }
}

fn parse_delta_entries(v: &[u8]) -> Result<Vec<DeltaEntry>> {
    Ok(array_items(v, DELTA_ENTRY_LEN)?
        .map(|e| DeltaEntry {
            pos_table_index: e[0] as i8,
            slice: e[1],
            element_delta: u32::from_be_bytes([e[2], e[3], e[4], e[5]]),
        })
        .collect())
}

fn parse_index_entries(v: &[u8], slice_count: u8, pos_table_count: u8) -> Result<Vec<IndexEntry>> {
    let (slices, positions) = (slice_count as usize, pos_table_count as usize);
    let entry_len = INDEX_ENTRY_FIXED_LEN + 4 * slices + 8 * positions;
    array_items(v, entry_len)?
        .map(|e| {
            let (offsets, pos) = e[INDEX_ENTRY_FIXED_LEN..].split_at(4 * slices);
            Ok(IndexEntry {
                temporal_offset: e[0] as i8,
                key_frame_offset: e[1] as i8,
                flags: e[2],
                stream_offset: read_u64(&e[3..11])?,
                slice_offset: offsets.chunks_exact(4).map(read_u32).collect::<Result<_>>()?,
                pos_table: pos.chunks_exact(8).map(read_fraction).collect::<Result<_>>()?,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mxf::metadata::tests::tag;

    pub(crate) fn entry_array(count: u32, slices: usize, positions: usize) -> Vec<u8> {
        let len = INDEX_ENTRY_FIXED_LEN + 4 * slices + 8 * positions;
        let mut v = Vec::new();
        v.extend(count.to_be_bytes());
        v.extend((len as u32).to_be_bytes());
        for i in 0..count {
            v.extend([0xFF, 0x00, 0x80]);
            v.extend((i as u64 * 1000).to_be_bytes());
            for s in 0..slices {
                v.extend((s as u32 + 100).to_be_bytes());
            }
            for _ in 0..positions {
                v.extend([0, 0, 0, 1, 0, 0, 0, 2]);
            }
        }
        v
    }

    #[test]
    fn entries_sized_by_slice_and_position_counts() {
        let mut data = Vec::new();
        tag(&mut data, 0x3f06, &2u32.to_be_bytes());
        tag(&mut data, 0x3f08, &[2]);
        tag(&mut data, 0x3f0e, &[1]);
        tag(&mut data, 0x3f0a, &entry_array(3, 2, 1));

        let seg = IndexTableSegment::parse(&data, &MxfConfig::default()).unwrap();
        assert_eq!(seg.index_sid, 2);
        assert_eq!(seg.index_entries.len(), 3);
        for e in &seg.index_entries {
            assert_eq!(e.slice_offset, vec![100, 101]);
            assert_eq!(e.pos_table, vec![Fraction { num: 1, den: 2 }]);
            assert_eq!(e.temporal_offset, -1);
            assert_eq!(e.flags, 0x80);
        }
        assert_eq!(seg.index_entries[2].stream_offset, 2000);
    }

    #[test]
    fn two_pass_accepts_counts_after_entries() {
        let mut data = Vec::new();
        tag(&mut data, 0x3f0a, &entry_array(1, 2, 1));
        tag(&mut data, 0x3f08, &[2]);
        tag(&mut data, 0x3f0e, &[1]);

        let seg = IndexTableSegment::parse(&data, &MxfConfig::default()).unwrap();
        assert_eq!(seg.index_entries[0].slice_offset.len(), 2);

        let single = MxfConfig { two_pass_index_decode: false };
        assert!(matches!(IndexTableSegment::parse(&data, &single), Err(ParseError::Invalid(_))));
    }

    #[test]
    fn entry_size_mismatch_is_invalid() {
        let mut data = Vec::new();
        tag(&mut data, 0x3f08, &[1]);
        tag(&mut data, 0x3f0a, &entry_array(1, 2, 0));
        assert!(matches!(
            IndexTableSegment::parse(&data, &MxfConfig::default()),
            Err(ParseError::Invalid(_))
        ));
    }

    #[test]
    fn delta_entries_and_header_fields() {
        let mut data = Vec::new();
        tag(&mut data, 0x3f0b, &[0, 0, 0, 25, 0, 0, 0, 1]);
        tag(&mut data, 0x3f0d, &250i64.to_be_bytes());
        tag(&mut data, 0x3f05, &0u32.to_be_bytes());
        tag(&mut data, 0x3f09, &[0, 0, 0, 2, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0xFF, 1, 0, 0, 0x10, 0]);

        let seg = IndexTableSegment::parse(&data, &MxfConfig::default()).unwrap();
        assert_eq!(seg.index_edit_rate, Fraction { num: 25, den: 1 });
        assert_eq!(seg.index_duration, 250);
        assert_eq!(
            seg.delta_entries,
            vec![
                DeltaEntry { pos_table_index: 0, slice: 0, element_delta: 0 },
                DeltaEntry { pos_table_index: -1, slice: 1, element_delta: 0x1000 },
            ]
        );
        assert!(seg.index_entries.is_empty());
    }
}
