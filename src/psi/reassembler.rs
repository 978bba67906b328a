//! Per-PID reassembly of PSI sections from transport packet payloads.

use std::collections::HashMap;

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::constants::*;
use crate::packetizer::Packet;
use crate::psi::section::{section_length, Section};

#[derive(Default)]
struct PidState {
    partial:  Option<BytesMut>,
    last_cc:  Option<u8>,
    /// (table_id, subtable_extension) -> last applied version
    versions: HashMap<(u8, u16), u8>,
}

/// Table-agnostic: every complete section is returned, whatever its table_id.
#[derive(Default)]
pub struct SectionReassembler {
    pids:                    HashMap<u16, PidState>,
    skip_unchanged_versions: bool,
}

impl SectionReassembler {
    pub fn new(skip_unchanged_versions: bool) -> Self {
        Self { pids: HashMap::new(), skip_unchanged_versions }
    }

    /// Feeds one packet of a PSI PID; returns the sections it completed.
    pub fn push(&mut self, packet: &Packet) -> Vec<Section> {
        let mut out = Vec::new();
        if !packet.has_payload() {
            return out;
        }
        let pid = packet.pid;
        let st = self.pids.entry(pid).or_default();

        let cc = packet.continuity_counter;
        if st.last_cc == Some(cc) && !packet.discontinuity {
            trace!(pid, cc, "duplicate packet");
            return out;
        }
        let continuous = !packet.discontinuity && st.last_cc.is_some_and(|l| (l + 1) & 0x0F == cc);
        st.last_cc = Some(cc);
        if packet.discontinuity && st.partial.take().is_some() {
            debug!(pid, "discontinuity, dropping partial section");
        }

        let payload = packet.payload();
        if !packet.payload_unit_start {
            match st.partial.take() {
                None => trace!(pid, "continuation without section start"),
                Some(_) if !continuous => debug!(pid, cc, "continuity error, dropping partial section"),
                Some(mut partial) => {
                    partial.extend_from_slice(payload);
                    // anything after the section end is stuffing
                    match take_complete(pid, &mut partial) {
                        Some(Ok(sec)) => out.push(sec),
                        Some(Err(())) => {}
                        None => st.partial = Some(partial),
                    }
                }
            }
            return out;
        }

        let pointer = payload[0] as usize;
        if 1 + pointer > payload.len() {
            warn!(pid, pointer, "pointer_field past end of packet");
            st.partial = None;
            return out;
        }
        let (tail, rest) = payload[1..].split_at(pointer);

        // bytes before the pointer close the previous section
        if let Some(mut partial) = st.partial.take() {
            if continuous {
                partial.extend_from_slice(tail);
                match take_complete(pid, &mut partial) {
                    Some(Ok(sec)) => out.push(sec),
                    Some(Err(())) => {}
                    None => debug!(pid, "new section started before previous one completed"),
                }
            } else {
                debug!(pid, cc, "continuity error, dropping partial section");
            }
        }

        let mut rest = rest;
        while let Some(&table_id) = rest.first() {
            if table_id == 0xFF {
                break; // stuffing
            }
            let mut buf = BytesMut::from(rest);
            match take_complete(pid, &mut buf) {
                Some(Ok(sec)) => {
                    rest = &rest[sec.data.len()..];
                    out.push(sec);
                }
                Some(Err(())) => break,
                None => {
                    st.partial = Some(buf);
                    break;
                }
            }
        }
        out
    }

    /// False for sections that are not yet valid (current_next == 0) or whose
    /// version was already applied.
    pub fn is_applicable(&self, section: &Section) -> bool {
        let hdr = match section.header() {
            Ok(Some(h)) => h,
            _ => return true,
        };
        if !hdr.current_next {
            return false;
        }
        if !self.skip_unchanged_versions {
            return true;
        }
        let key = (section.table_id, section.subtable_extension());
        self.pids
            .get(&section.pid)
            .and_then(|st| st.versions.get(&key))
            .is_none_or(|&v| v != hdr.version)
    }

    /// Remembers the version of a section that was applied successfully.
    pub fn record_version(&mut self, section: &Section) {
        if let Ok(Some(hdr)) = section.header() {
            let key = (section.table_id, section.subtable_extension());
            self.pids.entry(section.pid).or_default().versions.insert(key, hdr.version);
        }
    }

    /// Forgets everything about `pid`, including applied versions.
    pub fn remove_pid(&mut self, pid: u16) {
        self.pids.remove(&pid);
    }

    /// Drops in-progress sections and continuity state; versions are kept.
    pub fn discard_partial(&mut self) {
        for st in self.pids.values_mut() {
            st.partial = None;
            st.last_cc = None;
        }
    }

    pub fn clear(&mut self) {
        self.pids.clear();
    }
}

/// Splits a finished section off the front of `buf`.
/// `None` while more bytes are needed, `Some(Err)` when the header is unusable.
fn take_complete(pid: u16, buf: &mut BytesMut) -> Option<Result<Section, ()>> {
    if buf.len() < SECTION_HEADER_LEN {
        return None;
    }
    let len = section_length(buf);
    if len > MAX_SECTION_LENGTH {
        warn!(pid, len, "section_length too large");
        return Some(Err(()));
    }
    let total = SECTION_HEADER_LEN + len;
    if buf.len() < total {
        return None;
    }
    let data = buf.split_to(total).freeze();
    Some(Section::new(pid, data).map_err(|e| warn!(pid, error = %e, "bad section")))
}
