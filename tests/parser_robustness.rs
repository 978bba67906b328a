//! Every parser fails cleanly on short or arbitrary input.

use bytes::Bytes;
use proptest::prelude::*;

use mpegts_mxf::mxf::{
    IndexTableSegment, KlvReader, LocalTagIter, MetadataSet, PartitionPack, PrimerPack, Ul,
    encode_ber_length,
};
use mpegts_mxf::psi::{
    Descriptor, PatEntry, PatTable, PmtStream, PmtTable, Section, parse_pat, parse_pmt,
};
use mpegts_mxf::{DemuxConfig, MxfConfig, MxfReader, ParseError, TsDemux};

const CDCI_KEY: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01, 0x28, 0x00,
]);
const PRIMER_KEY: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x05, 0x01, 0x00,
]);
const HEADER_PARTITION_KEY: Ul = Ul([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x02, 0x04, 0x00,
]);

fn pat_bytes() -> Bytes {
    PatTable {
        transport_stream_id: 1,
        version: 0,
        current_next: true,
        network_pid: Some(0x10),
        programs: vec![
            PatEntry { program_number: 1, pmt_pid: 0x100 },
            PatEntry { program_number: 2, pmt_pid: 0x200 },
        ],
    }
    .to_section(1, 0)
    .data
}

fn pmt_bytes() -> Bytes {
    PmtTable {
        program_number: 1,
        version: 0,
        pcr_pid: 0x101,
        descriptors: vec![Descriptor { tag: 0x05, data: b"HDMV".to_vec() }],
        streams: vec![
            PmtStream { stream_type: 0x1b, elementary_pid: 0x101, descriptors: vec![] },
            PmtStream {
                stream_type: 0x03,
                elementary_pid: 0x102,
                descriptors: vec![Descriptor { tag: 0x0a, data: b"eng\0".to_vec() }],
            },
        ],
    }
    .to_section(0x100, 0)
    .data
}

fn tag(out: &mut Vec<u8>, tag: u16, value: &[u8]) {
    out.extend(tag.to_be_bytes());
    out.extend((value.len() as u16).to_be_bytes());
    out.extend(value);
}

fn primer_bytes(tags: &[u16]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend((tags.len() as u32).to_be_bytes());
    v.extend(18u32.to_be_bytes());
    for &t in tags {
        v.extend(t.to_be_bytes());
        v.extend([0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x02, 0, 0, 0, 0, 0, 0]);
        v.extend(t.to_be_bytes());
    }
    v
}

fn primer() -> PrimerPack {
    PrimerPack::parse(&primer_bytes(&[0x3c0a, 0x3203, 0x3004])).unwrap()
}

fn cdci_bytes() -> Vec<u8> {
    let mut v = Vec::new();
    tag(&mut v, 0x3c0a, &[0x11; 16]);
    tag(&mut v, 0x3203, &1920u32.to_be_bytes());
    tag(&mut v, 0x3004, &[0x0e; 16]);
    v
}

fn partition_bytes() -> Vec<u8> {
    let mut v = Vec::new();
    v.extend(1u16.to_be_bytes());
    v.extend(3u16.to_be_bytes());
    v.extend([0u8; 4 + 8 * 5 + 4 + 8]);
    v.extend(1u32.to_be_bytes());
    v.extend([0x0d; 16]);
    v.extend(1u32.to_be_bytes());
    v.extend(16u32.to_be_bytes());
    v.extend([0x0e; 16]);
    v
}

fn index_bytes() -> Vec<u8> {
    let mut entries = Vec::new();
    entries.extend(2u32.to_be_bytes());
    entries.extend(15u32.to_be_bytes());
    for i in 0..2u64 {
        entries.extend([0, 0, 0x80]);
        entries.extend((i * 4096).to_be_bytes());
        entries.extend(100u32.to_be_bytes());
    }
    let mut v = Vec::new();
    tag(&mut v, 0x3f0a, &entries);
    tag(&mut v, 0x3f08, &[1]);
    tag(&mut v, 0x3f0e, &[0]);
    tag(&mut v, 0x3f06, &1u32.to_be_bytes());
    v
}

fn klv_stream() -> Vec<u8> {
    let mut v = Vec::new();
    let objects = [
        (HEADER_PARTITION_KEY, partition_bytes()),
        (PRIMER_KEY, primer_bytes(&[0x3c0a, 0x3203, 0x3004])),
        (CDCI_KEY, cdci_bytes()),
    ];
    for (key, value) in objects {
        v.extend(key.0);
        v.extend(encode_ber_length(value.len() as u64));
        v.extend(value);
    }
    v
}

fn ts_stream() -> Vec<u8> {
    let mut out = Vec::new();
    for (pid, section) in [(0u16, pat_bytes()), (0x100, pmt_bytes())] {
        let mut p = vec![0xFFu8; 188];
        p[0] = 0x47;
        p[1] = 0x40 | (pid >> 8) as u8;
        p[2] = pid as u8;
        p[3] = 0x10;
        p[4] = 0;
        p[5..5 + section.len()].copy_from_slice(&section);
        out.extend(p);
    }
    out
}

/// Runs every parser over `data`; only panics matter here.
fn parse_everything(data: &[u8]) {
    let bytes = Bytes::copy_from_slice(data);
    if let Ok(section) = Section::new(0, bytes.clone()) {
        let _ = parse_pat(&section);
        let _ = parse_pmt(&section);
    }
    for table_id in [0x00, 0x02] {
        let raw = Section { table_id, pid: 0, data: bytes.clone() };
        let _ = parse_pat(&raw);
        let _ = parse_pmt(&raw);
        let _ = raw.header();
        let _ = raw.crc_ok();
    }
    let _ = PrimerPack::parse(data);
    let _ = PartitionPack::parse(&HEADER_PARTITION_KEY, data);
    let _ = IndexTableSegment::parse(data, &MxfConfig::default());
    let _ = IndexTableSegment::parse(data, &MxfConfig { two_pass_index_decode: false });
    let _ = MetadataSet::decode(&CDCI_KEY, &primer(), data);
    let _ = LocalTagIter::new(data).count();
    let _ = KlvReader::new(data).count();
    let _ = MxfReader::default().read_all(data);

    let mut demux = TsDemux::new(DemuxConfig { program_numbers: vec![1], ..Default::default() });
    assert!(demux.push(data).is_ok());
    let mut detecting = TsDemux::new(DemuxConfig { packet_size: None, ..Default::default() });
    assert!(detecting.push(data).is_ok());
}

#[test]
fn section_prefixes_are_rejected() {
    for full in [pat_bytes(), pmt_bytes()] {
        for len in 0..full.len() {
            let prefix = full.slice(..len);
            assert!(
                matches!(Section::new(0, prefix.clone()), Err(ParseError::Truncated { .. })),
                "prefix of {len} bytes"
            );
            let raw = Section { table_id: full[0], pid: 0, data: prefix };
            if len < 12 {
                assert!(parse_pat(&raw).is_err());
                assert!(parse_pmt(&raw).is_err());
            }
        }
        assert!(Section::new(0, full).is_ok());
    }
}

#[test]
fn primer_and_partition_prefixes_are_rejected() {
    let primer = primer_bytes(&[0x3c0a, 0x3203, 0x3004]);
    for len in 0..primer.len() {
        assert!(matches!(PrimerPack::parse(&primer[..len]), Err(ParseError::Truncated { .. })));
    }

    let partition = partition_bytes();
    assert!(PartitionPack::parse(&HEADER_PARTITION_KEY, &partition).is_ok());
    for len in 0..partition.len() {
        let err = PartitionPack::parse(&HEADER_PARTITION_KEY, &partition[..len]).unwrap_err();
        assert!(matches!(err, ParseError::Truncated { .. } | ParseError::Invalid(_)));
    }
}

#[test]
fn local_set_prefixes_never_panic() {
    let index = index_bytes();
    let seg = IndexTableSegment::parse(&index, &MxfConfig::default()).unwrap();
    assert_eq!(seg.index_entries.len(), 2);
    let cdci = cdci_bytes();
    assert!(MetadataSet::decode(&CDCI_KEY, &primer(), &cdci).unwrap().is_some());

    for data in [&index, &cdci] {
        for len in 0..data.len() {
            parse_everything(&data[..len]);
        }
    }
}

#[test]
fn stream_prefixes_never_panic() {
    let klv = klv_stream();
    let (events, errors) = MxfReader::default().read_all(&klv).unwrap();
    assert_eq!((events.len(), errors.len()), (3, 0));
    for len in 0..klv.len() {
        let _ = KlvReader::new(&klv[..len]).count();
        let _ = MxfReader::default().read_all(&klv[..len]);
    }

    let ts = ts_stream();
    for len in 0..=ts.len() {
        let mut demux = TsDemux::new(DemuxConfig { program_numbers: vec![1], ..Default::default() });
        assert!(demux.push(&ts[..len]).is_ok());
    }
}

proptest! {
    #[test]
    fn arbitrary_short_buffers_never_panic(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        parse_everything(&data);
    }

    #[test]
    fn corrupted_streams_never_panic(pos in 0usize..376, byte in any::<u8>()) {
        let mut ts = ts_stream();
        ts[pos] = byte;
        parse_everything(&ts);

        let mut klv = klv_stream();
        let at = pos % klv.len();
        klv[at] = byte;
        parse_everything(&klv);
    }
}
