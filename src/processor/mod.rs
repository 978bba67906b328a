//! Main packet processing logic: packetizer → sections → registry → router

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::DemuxConfig;
use crate::constants::*;
use crate::error::FlowError;
use crate::packetizer::{Packet, Packetizer, PacketizerEvent};
use crate::psi::{parse_pat, parse_pmt, PmtTable, Section, SectionReassembler};
use crate::registry::{PmtOutcome, Program, ProgramRegistry};
use crate::router::{OutputRouter, PacketSink, PadId};

/// Counters kept while demuxing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DemuxStats {
    pub packets:            u64,
    pub bad_packets:        u64,
    pub sections:           u64,
    pub malformed_sections: u64,
    pub crc_errors:         u64,
}

type PmtListener = Box<dyn FnMut(u16, &PmtTable)>;

pub struct TsDemux {
    config:       DemuxConfig,
    packetizer:   Packetizer,
    sections:     SectionReassembler,
    registry:     ProgramRegistry,
    router:       OutputRouter,
    pmt_listener: Option<PmtListener>,
    stats:        DemuxStats,
}

impl TsDemux {
    pub fn new(config: DemuxConfig) -> Self {
        let mut demux = Self {
            packetizer: Packetizer::new(config.packet_size),
            sections: SectionReassembler::new(config.skip_unchanged_versions),
            registry: ProgramRegistry::new(),
            router: OutputRouter::new(),
            pmt_listener: None,
            stats: DemuxStats::default(),
            config,
        };
        let selection = demux.config.program_numbers.clone();
        demux.registry.apply_selection(&selection);
        demux
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.registry.programs()
    }

    pub fn router(&self) -> &OutputRouter {
        &self.router
    }

    /// Packet size in use, once configured or detected.
    pub fn packet_size(&self) -> Option<usize> {
        self.packetizer.packet_size()
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Called with (program_number, table) each time a changed PMT is applied.
    pub fn on_pmt(&mut self, listener: impl FnMut(u16, &PmtTable) + 'static) {
        self.pmt_listener = Some(Box::new(listener));
    }

    /// Adds the unfiltered output, which receives every packet.
    pub fn add_primary_pad(&mut self, sink: Box<dyn PacketSink>) -> PadId {
        self.router.add_pad(None, sink)
    }

    /// Adds an output for `program_number`, selecting it if needed.
    pub fn request_pad(&mut self, program_number: u16, sink: Box<dyn PacketSink>) -> PadId {
        let id = self.router.add_pad(Some(program_number), sink);
        if !self.config.program_numbers.contains(&program_number) {
            let mut selection = self.config.program_numbers.clone();
            selection.push(program_number);
            self.set_program_numbers(&selection);
        } else {
            self.router.sync_active(&self.registry);
        }
        id
    }

    pub fn release_pad(&mut self, id: PadId) -> bool {
        self.router.remove_pad(id)
    }

    /// Replaces the selected-program list. Outputs of deselected programs are removed.
    pub fn set_program_numbers(&mut self, programs: &[u16]) {
        self.config.program_numbers = programs.to_vec();
        let delta = self.registry.apply_selection(programs);
        for number in &delta.deactivated {
            self.router.remove_program_pads(*number);
        }
        if !delta.activated.is_empty() || !delta.deactivated.is_empty() {
            info!(activated = ?delta.activated, deactivated = ?delta.deactivated, "selection changed");
        }
        self.router.sync_active(&self.registry);
    }

    /// Feeds a chunk of the transport stream.
    pub fn push(&mut self, data: &[u8]) -> Result<(), FlowError> {
        self.packetizer.push(data);
        loop {
            match self.packetizer.next_packet() {
                PacketizerEvent::NeedMore => return Ok(()),
                PacketizerEvent::Bad => self.stats.bad_packets += 1,
                PacketizerEvent::Packet(packet) => self.process_packet(&packet)?,
            }
        }
    }

    /// Feeds a chunk that does not continue the previous one.
    pub fn push_discont(&mut self, data: &[u8]) -> Result<(), FlowError> {
        debug!("discontinuity, dropping partial state");
        self.packetizer.flush();
        self.sections.discard_partial();
        self.push(data)
    }

    /// Drops all buffered and in-progress state, keeping pads and selection.
    pub fn reset(&mut self) {
        self.packetizer.flush();
        self.sections.clear();
        self.registry.clear();
        let selection = self.config.program_numbers.clone();
        self.registry.apply_selection(&selection);
        self.router.sync_active(&self.registry);
    }

    /// PSI first, so the packet is routed with the updated registry.
    pub fn process_packet(&mut self, packet: &Packet) -> Result<(), FlowError> {
        self.stats.packets += 1;
        if packet.transport_error {
            trace!(pid = packet.pid, "transport_error_indicator set");
        }
        if self.registry.is_psi_pid(packet.pid) {
            for section in self.sections.push(packet) {
                self.handle_section(section);
            }
        }
        self.router.route(packet, &self.registry)
    }

    fn handle_section(&mut self, section: Section) {
        self.stats.sections += 1;
        if self.config.check_crc && section.section_syntax_indicator() && !section.crc_ok() {
            warn!(pid = section.pid, table_id = section.table_id, "CRC mismatch, dropping section");
            self.stats.crc_errors += 1;
            return;
        }
        if !self.sections.is_applicable(&section) {
            trace!(pid = section.pid, table_id = section.table_id, "section not applicable");
            return;
        }

        match (section.pid, section.table_id) {
            (PID_PAT, TABLE_ID_PAT) => match parse_pat(&section) {
                Ok(pat) => {
                    self.sections.record_version(&section);
                    self.apply_pat(pat);
                }
                Err(e) => {
                    warn!(error = %e, "malformed PAT ignored");
                    self.stats.malformed_sections += 1;
                }
            },
            (pid, TABLE_ID_PMT) => match parse_pmt(&section) {
                Ok(pmt) => {
                    self.sections.record_version(&section);
                    self.apply_pmt(pid, pmt);
                }
                Err(e) => {
                    warn!(pid, error = %e, "malformed PMT ignored");
                    self.stats.malformed_sections += 1;
                }
            },
            (pid, table_id) => debug!(pid, table_id, "ignoring table"),
        }
    }

    fn apply_pat(&mut self, pat: crate::psi::PatTable) {
        info!(
            tsid = pat.transport_stream_id,
            version = pat.version,
            programs = pat.programs.len(),
            "applying PAT"
        );
        let delta = self.registry.apply_pat(pat);
        for removed in &delta.removed {
            self.router.remove_program_pads(removed.program_number);
        }
        for pid in &delta.released_pids {
            self.sections.remove_pid(*pid);
        }
        if !delta.removed.is_empty() {
            // a selected program that left the PAT waits for its return
            let selection = self.config.program_numbers.clone();
            self.registry.apply_selection(&selection);
        }
        self.router.sync_active(&self.registry);
    }

    fn apply_pmt(&mut self, pid: u16, pmt: PmtTable) {
        let program_number = pmt.program_number;
        match self.registry.apply_pmt(pid, pmt) {
            PmtOutcome::Applied => {
                self.router.sync_active(&self.registry);
                if let (Some(listener), Some(table)) =
                    (self.pmt_listener.as_mut(), self.registry.pmt(program_number))
                {
                    listener(program_number, table);
                }
            }
            PmtOutcome::Unchanged => {}
            PmtOutcome::Ignored => {
                if self.registry.current_pat().is_none() {
                    // another PMT will come once the PAT is known
                    self.sections.remove_pid(pid);
                }
            }
        }
    }
}
