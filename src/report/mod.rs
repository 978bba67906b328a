//! Report generation for demux and MXF parsing results

use std::collections::BTreeMap;

use crate::mxf::{MxfEvent, MetadataSet, ObjectError};
use crate::processor::TsDemux;
use crate::psi::stream_type_name;
use crate::registry::ProgramState;
use crate::types::{
    DemuxReport, DescriptorInfo, IndexSegmentInfo, MxfReport, PadInfo, PartitionInfo, ProgramInfo,
    StreamInfo, TrackInfo,
};

/// Report generator for demux and MXF results
pub struct Reporter;

impl Reporter {
    /// Generate a structured DemuxReport for API consumers
    pub fn create_report(demux: &TsDemux) -> DemuxReport {
        let registry = demux.registry();
        let programs = registry
            .programs()
            .map(|p| {
                let streams = p
                    .pmt
                    .iter()
                    .flat_map(|pmt| &pmt.streams)
                    .map(|s| StreamInfo {
                        pid: s.elementary_pid,
                        stream_type: s.stream_type,
                        codec: stream_type_name(s.stream_type),
                        languages: s.languages(),
                        registration: s
                            .registration_id()
                            .map(|id| String::from_utf8_lossy(&id).into_owned()),
                    })
                    .collect();
                let state = match p.state {
                    ProgramState::Unselected => "unselected",
                    ProgramState::PendingActivate => "pending",
                    ProgramState::Active => "active",
                };
                ProgramInfo {
                    program_number: p.program_number,
                    pmt_pid: p.pmt_pid,
                    state: state.to_string(),
                    pat_generation_count: p.pat_generation_count,
                    streams,
                    pcr_pid: p.pcr_pid,
                    pmt_version: p.pmt.as_ref().map(|t| t.version),
                }
            })
            .collect();

        let pads = demux
            .router()
            .pads()
            .iter()
            .map(|pad| PadInfo {
                pad: pad.id.0,
                program: pad.program_filter,
                active: pad.active,
                forwarded: pad.forwarded,
                errors: pad.errors,
                last_error: pad.last_error.as_ref().map(ToString::to_string),
            })
            .collect();

        let pat = registry.current_pat();
        DemuxReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            transport_stream_id: pat.map(|p| p.transport_stream_id),
            pat_version: pat.map(|p| p.version),
            packet_size: demux.packet_size(),
            programs,
            pads,
            stats: demux.stats(),
        }
    }

    /// Generate pretty-printed JSON string for CLI output
    pub fn generate_json_report(demux: &TsDemux) -> String {
        let rep = Self::create_report(demux);
        serde_json::to_string_pretty(&rep).unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }

    pub fn create_mxf_report(events: &[MxfEvent], errors: &[ObjectError]) -> MxfReport {
        let mut report = MxfReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            partitions: Vec::new(),
            primer_entries: Vec::new(),
            descriptors: Vec::new(),
            tracks: Vec::new(),
            index_segments: Vec::new(),
            essence_bytes: BTreeMap::new(),
            errors: errors
                .iter()
                .map(|e| format!("offset {}: {}: {}", e.offset, e.key, e.error))
                .collect(),
        };

        for event in events {
            match event {
                MxfEvent::Partition(p) => report.partitions.push(PartitionInfo {
                    kind: format!("{:?}", p.kind).to_lowercase(),
                    closed: p.closed,
                    complete: p.complete,
                    this_partition: p.this_partition,
                    body_sid: p.body_sid,
                    index_sid: p.index_sid,
                    operational_pattern: p.operational_pattern.to_string(),
                    essence_containers: p.essence_containers.iter().map(ToString::to_string).collect(),
                }),
                MxfEvent::Primer { entries } => report.primer_entries.push(*entries),
                MxfEvent::Metadata { set: MetadataSet::Descriptor(d), essence } => {
                    let file = d.file();
                    report.descriptors.push(DescriptorInfo {
                        kind: d.kind_name(),
                        instance_uid: file.generic.header.instance_uid.to_string(),
                        linked_track_id: file.linked_track_id,
                        sample_rate: file.sample_rate.to_string(),
                        essence_container: file.essence_container.to_string(),
                        essence: essence.clone(),
                        other_tags: d.other_tags().len(),
                    });
                }
                MxfEvent::Metadata { set: MetadataSet::Track(t), .. } => report.tracks.push(TrackInfo {
                    track_id: t.track_id,
                    track_number: t.track_number,
                    name: t.track_name.clone(),
                    edit_rate: t.edit_rate.to_string(),
                }),
                MxfEvent::IndexSegment(seg) => report.index_segments.push(IndexSegmentInfo {
                    index_sid: seg.index_sid,
                    body_sid: seg.body_sid,
                    edit_rate: seg.index_edit_rate.to_string(),
                    start_position: seg.index_start_position,
                    duration: seg.index_duration,
                    delta_entries: seg.delta_entries.len(),
                    index_entries: seg.index_entries.len(),
                }),
                MxfEvent::EssenceElement { track_number, len } => {
                    *report.essence_bytes.entry(*track_number).or_default() += *len as u64;
                }
                _ => {}
            }
        }
        report
    }

    pub fn generate_mxf_json_report(events: &[MxfEvent], errors: &[ObjectError]) -> String {
        let rep = Self::create_mxf_report(events, errors);
        serde_json::to_string_pretty(&rep).unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemuxConfig;
    use crate::mxf::metadata::{CdciDescriptor, Descriptor, Track};
    use crate::mxf::{EssenceInfo, EssenceKind, Fraction, Ul};
    use crate::processor::tests::{counter, pat_packet, pmt_packet};

    #[test]
    fn demux_report_lists_programs_and_pads() {
        let mut demux = TsDemux::new(DemuxConfig::default());
        let (_, sink) = counter();
        demux.request_pad(1, sink);
        demux.push(&pat_packet(&[(1, 100), (2, 200)], 3, 0)).unwrap();
        demux.push(&pmt_packet(1, 100, &[(256, 0x1b), (257, 0x0f)], 0, 0)).unwrap();

        let rep = Reporter::create_report(&demux);
        assert_eq!(rep.transport_stream_id, Some(1));
        assert_eq!(rep.pat_version, Some(3));
        let p1 = rep.programs.iter().find(|p| p.program_number == 1).unwrap();
        assert_eq!(p1.state, "active");
        assert_eq!(p1.streams.len(), 2);
        assert_eq!(p1.streams[0].codec, stream_type_name(0x1b));
        let p2 = rep.programs.iter().find(|p| p.program_number == 2).unwrap();
        assert_eq!(p2.state, "unselected");
        assert!(p2.streams.is_empty());
        assert_eq!(rep.pads.len(), 1);
        assert!(rep.pads[0].active);

        let json = Reporter::generate_json_report(&demux);
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["programs"].as_array().unwrap().len(), 2);
        assert!(v["stats"]["packets"].as_u64().unwrap() >= 2);
    }

    #[test]
    fn mxf_report_collects_descriptors_tracks_and_essence() {
        let mut cdci = CdciDescriptor::default();
        cdci.picture.file.linked_track_id = 2;
        cdci.picture.file.sample_rate = Fraction { num: 25, den: 1 };
        let mut track = Track::default();
        track.track_id = 2;
        track.edit_rate = Fraction { num: 25, den: 1 };

        let events = vec![
            MxfEvent::Primer { entries: 12 },
            MxfEvent::Metadata {
                set: MetadataSet::Descriptor(Descriptor::Cdci(cdci)),
                essence: Some(EssenceInfo { handler: "picture", kind: EssenceKind::Video, codec: "raw".into() }),
            },
            MxfEvent::Metadata { set: MetadataSet::Track(track), essence: None },
            MxfEvent::EssenceElement { track_number: 7, len: 100 },
            MxfEvent::EssenceElement { track_number: 7, len: 50 },
            MxfEvent::Fill,
        ];
        let errors = vec![ObjectError {
            offset: 42,
            key: Ul::ZERO,
            error: crate::error::ParseError::invalid("bad"),
        }];
        let rep = Reporter::create_mxf_report(&events, &errors);
        assert_eq!(rep.primer_entries, vec![12]);
        assert_eq!(rep.descriptors.len(), 1);
        assert_eq!(rep.descriptors[0].kind, "cdci_descriptor");
        assert_eq!(rep.descriptors[0].sample_rate, "25/1");
        assert_eq!(rep.tracks[0].edit_rate, "25/1");
        assert_eq!(rep.essence_bytes.get(&7), Some(&150));
        assert!(rep.errors[0].starts_with("offset 42"));

        let v: serde_json::Value =
            serde_json::from_str(&Reporter::generate_mxf_json_report(&events, &errors)).unwrap();
        assert_eq!(v["descriptors"][0]["essence"]["kind"], "video");
    }
}
