//! Constants for MPEG-TS demultiplexing and MXF KLV parsing

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;
pub const M2TS_PACKET_SIZE: usize = 192; // 4-byte arrival timestamp + TS packet
pub const DVB_ASI_PACKET_SIZE: usize = 204; // TS packet + 16 bytes Reed-Solomon
pub const ATSC_PACKET_SIZE: usize = 208; // TS packet + 20 bytes Reed-Solomon
pub const MAX_PACKET_SIZE: usize = ATSC_PACKET_SIZE;

/// Sizes tried by packet-size detection, in order
pub const PACKET_SIZES: [usize; 4] = [
    TS_PACKET_SIZE,
    M2TS_PACKET_SIZE,
    DVB_ASI_PACKET_SIZE,
    ATSC_PACKET_SIZE,
];

/// Number of sync bytes that must line up before a packet size is accepted
pub const SYNC_CONFIRMATIONS: usize = 4;

/// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_MASK: u16 = 0x1FFF;

/// Table ids
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;

/// Section header: table_id + 2 bytes of flags/section_length
pub const SECTION_HEADER_LEN: usize = 3;
/// Long-form header (through last_section_number)
pub const SECTION_SYNTAX_HEADER_LEN: usize = 8;
pub const SECTION_CRC_LEN: usize = 4;
/// Largest section_length allowed for private sections
pub const MAX_SECTION_LENGTH: usize = 4093;

/// Descriptor tags read from the PMT
pub const DESC_REGISTRATION: u8 = 0x05;
pub const DESC_ISO_639_LANGUAGE: u8 = 0x0A;

/// MXF
pub const MXF_KEY_LEN: usize = 16;
pub const PRIMER_ENTRY_LEN: u32 = 18; // tag u16 + UL
pub const PARTITION_PACK_MIN_LEN: usize = 84;
/// Fixed partition fields plus the essence container array header
pub const PARTITION_PACK_FIXED_LEN: usize = 88;
pub const ARRAY_HEADER_LEN: usize = 8;
pub const LOCAL_TAG_HEADER_LEN: usize = 4;
