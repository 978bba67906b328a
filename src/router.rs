//! Fan-out of transport packets to output pads.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::FlowError;
use crate::packetizer::Packet;
use crate::registry::{ProgramRegistry, ProgramState};

/// Consumer of the packets routed to one pad.
pub trait PacketSink {
    fn push(&mut self, packet: &Bytes) -> Result<(), FlowError>;
}

impl<F> PacketSink for F
where
    F: FnMut(&Bytes) -> Result<(), FlowError>,
{
    fn push(&mut self, packet: &Bytes) -> Result<(), FlowError> {
        self(packet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PadId(pub u32);

pub struct OutputPad {
    pub id:             PadId,
    /// `None` for the primary pad, which receives every packet.
    pub program_filter: Option<u16>,
    /// The filtered program is active (its PMT has been applied).
    pub active:         bool,
    pub forwarded:      u64,
    pub errors:         u64,
    pub last_error:     Option<FlowError>,
    sink: Box<dyn PacketSink>,
}

#[derive(Default)]
pub struct OutputRouter {
    pads:    Vec<OutputPad>,
    next_id: u32,
}

impl OutputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pad(&mut self, program_filter: Option<u16>, sink: Box<dyn PacketSink>) -> PadId {
        let id = PadId(self.next_id);
        self.next_id += 1;
        debug!(pad = id.0, program = ?program_filter, "pad added");
        self.pads.push(OutputPad {
            id,
            program_filter,
            active: false,
            forwarded: 0,
            errors: 0,
            last_error: None,
            sink,
        });
        id
    }

    pub fn remove_pad(&mut self, id: PadId) -> bool {
        let before = self.pads.len();
        self.pads.retain(|p| p.id != id);
        before != self.pads.len()
    }

    /// Removes every pad filtered on `program_number`.
    pub fn remove_program_pads(&mut self, program_number: u16) -> usize {
        let before = self.pads.len();
        self.pads.retain(|p| p.program_filter != Some(program_number));
        let removed = before - self.pads.len();
        if removed > 0 {
            debug!(program = program_number, removed, "pads removed");
        }
        removed
    }

    pub fn pads(&self) -> &[OutputPad] {
        &self.pads
    }

    pub fn pad(&self, id: PadId) -> Option<&OutputPad> {
        self.pads.iter().find(|p| p.id == id)
    }

    pub fn clear(&mut self) {
        self.pads.clear();
    }

    /// Refreshes each filtered pad's `active` flag from the registry.
    pub fn sync_active(&mut self, registry: &ProgramRegistry) {
        for pad in &mut self.pads {
            if let Some(program) = pad.program_filter {
                pad.active = registry
                    .get(program)
                    .is_some_and(|p| p.state == ProgramState::Active);
            }
        }
    }

    /// Forwards `packet` to every pad that wants it, in pad creation order.
    ///
    /// The first fatal sink error stops the loop and is returned; other sink
    /// errors are counted on the pad.
    pub fn route(&mut self, packet: &Packet, registry: &ProgramRegistry) -> Result<(), FlowError> {
        let pid = packet.pid;
        for pad in &mut self.pads {
            let wanted = match pad.program_filter {
                None => true,
                Some(number) => match registry.get(number) {
                    Some(program) => program.carries_pid(pid),
                    None => pid == crate::constants::PID_PAT,
                },
            };
            if !wanted {
                continue;
            }
            trace!(pad = pad.id.0, pid, "forward");
            match pad.sink.push(packet.data()) {
                Ok(()) => pad.forwarded += 1,
                Err(e) if e.is_fatal() => {
                    debug!(pad = pad.id.0, error = %e, "fatal flow error");
                    pad.errors += 1;
                    pad.last_error = Some(e.clone());
                    return Err(e);
                }
                Err(e) => {
                    pad.errors += 1;
                    pad.last_error = Some(e);
                }
            }
        }
        Ok(())
    }
}
