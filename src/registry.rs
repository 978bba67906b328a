//! Programs and their streams, as announced by the latest PAT and PMTs.
//!
//! Every PAT application bumps an epoch. A program listed by the PAT records
//! the epoch and increments its `pat_generation_count`; programs that had been
//! listed before but not by the latest PAT are torn down. Programs known only
//! from the selection list are never listed, so a PAT cannot remove them.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::constants::*;
use crate::psi::{PatTable, PmtTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Unselected,
    /// Selected, waiting for its PMT.
    PendingActivate,
    Active,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub program_number:       u16,
    /// `None` until a PAT announces the program.
    pub pmt_pid:              Option<u16>,
    /// pid -> stream_type, replaced as a whole by each PMT
    pub streams:              BTreeMap<u16, u8>,
    pub pcr_pid:              Option<u16>,
    pub pat_generation_count: u32,
    pub state:                ProgramState,
    pub pmt:                  Option<PmtTable>,
    last_pat_epoch: u64,
    /// 2 = selected by the list being applied, 1 = selected before, 0 = not
    selected:       u8,
}

impl Program {
    fn new(program_number: u16, pmt_pid: Option<u16>) -> Self {
        Self {
            program_number,
            pmt_pid,
            streams: BTreeMap::new(),
            pcr_pid: None,
            pat_generation_count: 0,
            state: ProgramState::Unselected,
            pmt: None,
            last_pat_epoch: 0,
            selected: 0,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.state != ProgramState::Unselected
    }

    /// PAT, this program's PMT PID, and its streams once the PMT is known.
    pub fn carries_pid(&self, pid: u16) -> bool {
        pid == PID_PAT
            || self.pmt_pid == Some(pid)
            || (self.pmt.is_some() && self.streams.contains_key(&pid))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedProgram {
    pub program_number: u16,
    pub pmt_pid:        Option<u16>,
    pub was_selected:   bool,
}

/// Structural changes caused by one PAT.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatDelta {
    pub added:           Vec<u16>,
    pub pmt_pid_changed: Vec<u16>,
    pub removed:         Vec<RemovedProgram>,
    /// PIDs no longer carrying any PMT
    pub released_pids:   Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PmtOutcome {
    Applied,
    /// Same PCR PID and stream set as the current PMT.
    Unchanged,
    /// No program for this PMT, or it arrived on another PID.
    Ignored,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionDelta {
    pub activated:   Vec<u16>,
    pub deactivated: Vec<u16>,
}

#[derive(Default)]
pub struct ProgramRegistry {
    programs:  BTreeMap<u16, Program>,
    /// PMT pid -> number of programs announcing it
    psi_pids:  HashMap<u16, u32>,
    pat:       Option<PatTable>,
    pat_epoch: u64,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, program_number: u16) -> Option<&Program> {
        self.programs.get(&program_number)
    }

    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn current_pat(&self) -> Option<&PatTable> {
        self.pat.as_ref()
    }

    /// PID 0 and every PID announced as a PMT PID by the current PAT.
    pub fn is_psi_pid(&self, pid: u16) -> bool {
        pid == PID_PAT || self.psi_pids.contains_key(&pid)
    }

    pub fn apply_pat(&mut self, pat: PatTable) -> PatDelta {
        let mut delta = PatDelta::default();
        self.pat_epoch += 1;
        let epoch = self.pat_epoch;

        for entry in &pat.programs {
            let program = self.programs.entry(entry.program_number).or_insert_with(|| {
                debug!(program = entry.program_number, pmt_pid = entry.pmt_pid, "new program");
                delta.added.push(entry.program_number);
                Program::new(entry.program_number, None)
            });
            if program.last_pat_epoch == epoch {
                debug!(program = entry.program_number, "duplicated PAT entry");
                continue;
            }
            program.last_pat_epoch = epoch;
            program.pat_generation_count += 1;

            if program.pmt_pid != Some(entry.pmt_pid) {
                if let Some(old) = program.pmt_pid {
                    info!(program = entry.program_number, old, new = entry.pmt_pid, "PMT PID changed");
                    delta.pmt_pid_changed.push(entry.program_number);
                    program.pmt = None;
                    program.streams.clear();
                    program.pcr_pid = None;
                    if program.state == ProgramState::Active {
                        program.state = ProgramState::PendingActivate;
                    }
                    release_pid(&mut self.psi_pids, old, &mut delta.released_pids);
                }
                program.pmt_pid = Some(entry.pmt_pid);
                *self.psi_pids.entry(entry.pmt_pid).or_insert(0) += 1;
            }
        }

        let stale: Vec<u16> = self
            .programs
            .values()
            .filter(|p| p.pat_generation_count > 0 && p.last_pat_epoch != epoch)
            .map(|p| p.program_number)
            .collect();
        for number in stale {
            if let Some(program) = self.programs.remove(&number) {
                info!(program = number, pmt_pid = ?program.pmt_pid, "PAT removing program");
                if let Some(pid) = program.pmt_pid {
                    release_pid(&mut self.psi_pids, pid, &mut delta.released_pids);
                }
                delta.removed.push(RemovedProgram {
                    program_number: number,
                    pmt_pid: program.pmt_pid,
                    was_selected: program.is_selected(),
                });
            }
        }

        self.pat = Some(pat);
        delta
    }

    /// Stores a PMT that arrived on `pid`. The stream set is replaced, never merged.
    pub fn apply_pmt(&mut self, pid: u16, pmt: PmtTable) -> PmtOutcome {
        if self.pat.is_none() {
            warn!(pid, "PMT before any PAT, ignoring");
            return PmtOutcome::Ignored;
        }
        let Some(program) = self.programs.get_mut(&pmt.program_number) else {
            warn!(program = pmt.program_number, pid, "PMT for a program that is not in the PAT");
            return PmtOutcome::Ignored;
        };
        if program.pmt_pid != Some(pid) {
            warn!(program = pmt.program_number, pid, expected = ?program.pmt_pid, "PMT on unexpected PID");
            return PmtOutcome::Ignored;
        }

        let streams: BTreeMap<u16, u8> = pmt
            .streams
            .iter()
            .map(|s| (s.elementary_pid, s.stream_type))
            .collect();
        let same = program.pmt.is_some()
            && program.pcr_pid == Some(pmt.pcr_pid)
            && program.streams == streams;

        program.streams = streams;
        program.pcr_pid = Some(pmt.pcr_pid);
        program.pmt = Some(pmt);
        if program.state == ProgramState::PendingActivate {
            program.state = ProgramState::Active;
        }
        if same {
            debug!(program = program.program_number, "identical program, not re-applied");
            return PmtOutcome::Unchanged;
        }
        info!(
            program = program.program_number,
            pid,
            streams = program.streams.len(),
            "applied PMT"
        );
        PmtOutcome::Applied
    }

    pub fn pmt(&self, program_number: u16) -> Option<&PmtTable> {
        self.programs.get(&program_number).and_then(|p| p.pmt.as_ref())
    }

    /// Applies a new selected-program list.
    ///
    /// Programs in both the old and new list keep their state. Listed programs
    /// the PAT has not announced yet are created and wait for it.
    pub fn apply_selection(&mut self, selection: &[u16]) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        for &number in selection {
            self.programs
                .entry(number)
                .or_insert_with(|| Program::new(number, None))
                .selected = 2;
        }

        for program in self.programs.values_mut() {
            match program.selected {
                2 => {
                    program.selected = 1;
                    if program.state == ProgramState::Unselected {
                        program.state = if program.pmt.is_some() {
                            ProgramState::Active
                        } else {
                            ProgramState::PendingActivate
                        };
                        debug!(program = program.program_number, state = ?program.state, "selected");
                        delta.activated.push(program.program_number);
                    }
                }
                1 => {
                    program.selected = 0;
                    if program.state != ProgramState::Unselected {
                        program.state = ProgramState::Unselected;
                        debug!(program = program.program_number, "deselected");
                        delta.deactivated.push(program.program_number);
                    }
                }
                _ => program.selected = 0,
            }
        }

        // placeholders nobody asks for any more
        self.programs
            .retain(|_, p| p.pat_generation_count > 0 || p.state != ProgramState::Unselected);
        delta
    }

    pub fn clear(&mut self) {
        self.programs.clear();
        self.psi_pids.clear();
        self.pat = None;
    }
}

fn release_pid(psi_pids: &mut HashMap<u16, u32>, pid: u16, released: &mut Vec<u16>) {
    if let Some(count) = psi_pids.get_mut(&pid) {
        *count -= 1;
        if *count == 0 {
            psi_pids.remove(&pid);
            released.push(pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::{PatEntry, PmtStream};

    fn pat(entries: &[(u16, u16)]) -> PatTable {
        PatTable {
            transport_stream_id: 1,
            version: 0,
            current_next: true,
            network_pid: None,
            programs: entries
                .iter()
                .map(|&(program_number, pmt_pid)| PatEntry { program_number, pmt_pid })
                .collect(),
        }
    }

    fn pmt(program_number: u16, streams: &[(u16, u8)]) -> PmtTable {
        PmtTable {
            program_number,
            version: 0,
            pcr_pid: streams.first().map_or(0x1FFF, |s| s.0),
            descriptors: vec![],
            streams: streams
                .iter()
                .map(|&(elementary_pid, stream_type)| PmtStream {
                    stream_type,
                    elementary_pid,
                    descriptors: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn second_pat_keeps_existing_program() {
        let mut reg = ProgramRegistry::new();
        reg.apply_selection(&[1]);
        reg.apply_pat(pat(&[(1, 100)]));
        assert_eq!(reg.apply_pmt(100, pmt(1, &[(256, 0x1B)])), PmtOutcome::Applied);

        let delta = reg.apply_pat(pat(&[(1, 100), (2, 200)]));
        assert_eq!(delta.added, vec![2]);
        assert!(delta.removed.is_empty());
        let numbers: Vec<u16> = reg.programs().map(|p| p.program_number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let p1 = reg.get(1).unwrap();
        assert_eq!(p1.pat_generation_count, 2);
        assert_eq!(p1.state, ProgramState::Active);
        assert!(p1.streams.contains_key(&256));
        assert!(reg.is_psi_pid(200));
    }

    #[test]
    fn program_missing_from_pat_is_torn_down() {
        let mut reg = ProgramRegistry::new();
        reg.apply_pat(pat(&[(1, 100), (2, 200)]));
        reg.apply_selection(&[1]);
        let delta = reg.apply_pat(pat(&[(2, 200)]));

        assert_eq!(
            delta.removed,
            vec![RemovedProgram { program_number: 1, pmt_pid: Some(100), was_selected: true }]
        );
        assert_eq!(delta.released_pids, vec![100]);
        assert!(reg.get(1).is_none());
        assert!(!reg.is_psi_pid(100));
        assert_eq!(reg.get(2).unwrap().pat_generation_count, 2);
        assert!(reg.is_psi_pid(200));
    }

    #[test]
    fn shared_pmt_pid_stays_until_last_user_leaves() {
        let mut reg = ProgramRegistry::new();
        reg.apply_pat(pat(&[(1, 100), (2, 100)]));
        let delta = reg.apply_pat(pat(&[(2, 100)]));
        assert!(delta.released_pids.is_empty());
        assert!(reg.is_psi_pid(100));
        let delta = reg.apply_pat(pat(&[]));
        assert_eq!(delta.released_pids, vec![100]);
    }

    #[test]
    fn pmt_pid_change_invalidates_streams() {
        let mut reg = ProgramRegistry::new();
        reg.apply_pat(pat(&[(1, 100)]));
        reg.apply_selection(&[1]);
        reg.apply_pmt(100, pmt(1, &[(256, 0x1B)]));
        assert_eq!(reg.get(1).unwrap().state, ProgramState::Active);

        let delta = reg.apply_pat(pat(&[(1, 110)]));
        assert_eq!(delta.pmt_pid_changed, vec![1]);
        assert_eq!(delta.released_pids, vec![100]);
        let p = reg.get(1).unwrap();
        assert!(p.pmt.is_none());
        assert!(p.streams.is_empty());
        assert_eq!(p.state, ProgramState::PendingActivate);
        assert!(!p.carries_pid(256));
        assert!(p.carries_pid(110));

        assert_eq!(reg.apply_pmt(100, pmt(1, &[(256, 0x1B)])), PmtOutcome::Ignored);
        assert_eq!(reg.apply_pmt(110, pmt(1, &[(300, 0x24)])), PmtOutcome::Applied);
        assert_eq!(reg.get(1).unwrap().state, ProgramState::Active);
    }

    #[test]
    fn pmt_replaces_stream_set() {
        let mut reg = ProgramRegistry::new();
        reg.apply_pat(pat(&[(5, 50)]));
        reg.apply_pmt(50, pmt(5, &[(501, 0x1B), (502, 0x03)]));
        reg.apply_pmt(50, pmt(5, &[(503, 0x0F)]));
        let streams: Vec<u16> = reg.get(5).unwrap().streams.keys().copied().collect();
        assert_eq!(streams, vec![503]);
        assert_eq!(reg.apply_pmt(50, pmt(5, &[(503, 0x0F)])), PmtOutcome::Unchanged);
    }

    #[test]
    fn pmt_without_pat_or_program_is_ignored() {
        let mut reg = ProgramRegistry::new();
        assert_eq!(reg.apply_pmt(100, pmt(1, &[])), PmtOutcome::Ignored);
        reg.apply_pat(pat(&[(1, 100)]));
        assert_eq!(reg.apply_pmt(100, pmt(9, &[])), PmtOutcome::Ignored);
    }

    #[test]
    fn reselecting_same_list_does_not_toggle() {
        let mut reg = ProgramRegistry::new();
        reg.apply_pat(pat(&[(1, 100), (2, 200), (3, 300)]));
        let d = reg.apply_selection(&[1, 2]);
        assert_eq!(d.activated, vec![1, 2]);
        let d = reg.apply_selection(&[2, 3]);
        assert_eq!(d, SelectionDelta { activated: vec![3], deactivated: vec![1] });
        let d = reg.apply_selection(&[2, 3]);
        assert_eq!(d, SelectionDelta::default());
        assert!(!reg.get(1).unwrap().is_selected());
    }

    #[test]
    fn selecting_unknown_program_waits_for_pat() {
        let mut reg = ProgramRegistry::new();
        let d = reg.apply_selection(&[4]);
        assert_eq!(d.activated, vec![4]);
        let p = reg.get(4).unwrap();
        assert_eq!(p.pmt_pid, None);
        assert_eq!(p.state, ProgramState::PendingActivate);

        // a PAT without it does not remove the placeholder
        reg.apply_pat(pat(&[(1, 100)]));
        assert!(reg.get(4).is_some());
        reg.apply_pat(pat(&[(1, 100), (4, 400)]));
        assert!(reg.is_psi_pid(400));
        reg.apply_pmt(400, pmt(4, &[(401, 0x1B)]));
        assert_eq!(reg.get(4).unwrap().state, ProgramState::Active);

        // deselecting a placeholder drops it
        let mut reg = ProgramRegistry::new();
        reg.apply_selection(&[9]);
        reg.apply_selection(&[]);
        assert!(reg.get(9).is_none());
    }
}
