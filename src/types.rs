use serde::Serialize;

use crate::mxf::EssenceInfo;
use crate::processor::DemuxStats;

/// Elementary stream as announced by the PMT
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub pid: u16,
    pub stream_type: u8,
    pub codec: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Registration descriptor format identifier, e.g. "HEVC"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
}

/// Program information containing all its streams (public API)
#[derive(Debug, Clone, Serialize)]
pub struct ProgramInfo {
    pub program_number: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmt_pid: Option<u16>,
    pub state: String,
    pub pat_generation_count: u32,
    pub streams: Vec<StreamInfo>,
    /// PCR PID for this program (from PMT)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_pid: Option<u16>,
    /// PMT version for change tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmt_version: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PadInfo {
    pub pad: u32,
    /// Absent for the primary pad
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<u16>,
    pub active: bool,
    pub forwarded: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Snapshot of a transport stream demux
#[derive(Debug, Clone, Serialize)]
pub struct DemuxReport {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_stream_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pat_version: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_size: Option<usize>,
    pub programs: Vec<ProgramInfo>,
    pub pads: Vec<PadInfo>,
    pub stats: DemuxStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionInfo {
    pub kind: String,
    pub closed: bool,
    pub complete: bool,
    pub this_partition: u64,
    pub body_sid: u32,
    pub index_sid: u32,
    pub operational_pattern: String,
    pub essence_containers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescriptorInfo {
    pub kind: &'static str,
    pub instance_uid: String,
    pub linked_track_id: u32,
    pub sample_rate: String,
    pub essence_container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essence: Option<EssenceInfo>,
    /// Primer-mapped tags kept undecoded
    pub other_tags: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackInfo {
    pub track_id: u32,
    pub track_number: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub edit_rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSegmentInfo {
    pub index_sid: u32,
    pub body_sid: u32,
    pub edit_rate: String,
    pub start_position: i64,
    pub duration: i64,
    pub delta_entries: usize,
    pub index_entries: usize,
}

/// Summary of an MXF file walk
#[derive(Debug, Clone, Serialize)]
pub struct MxfReport {
    pub timestamp: String,
    pub partitions: Vec<PartitionInfo>,
    /// Entry count of each primer pack met
    pub primer_entries: Vec<usize>,
    pub descriptors: Vec<DescriptorInfo>,
    pub tracks: Vec<TrackInfo>,
    pub index_segments: Vec<IndexSegmentInfo>,
    /// Essence element bytes per track number
    pub essence_bytes: std::collections::BTreeMap<u32, u64>,
    pub errors: Vec<String>,
}
