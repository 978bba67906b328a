//! Transport packet framing: sync detection, resync and header decoding.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::constants::*;

/// One 188-byte transport packet with its header decoded.
#[derive(Debug, Clone)]
pub struct Packet {
    pub pid:                      u16,
    pub payload_unit_start:       bool,
    pub transport_error:          bool,
    pub adaptation_field_control: u8,
    pub continuity_counter:       u8,
    pub discontinuity:            bool,
    pub random_access:            bool,
    raw:            Bytes,
    payload_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Header is inconsistent (adaptation field runs past the packet end).
    Bad,
}

impl Packet {
    /// Decodes the header of a 188-byte packet starting with the sync byte.
    pub fn parse(raw: Bytes) -> Result<Self, PacketError> {
        if raw.len() != TS_PACKET_SIZE || raw[0] != TS_SYNC_BYTE {
            return Err(PacketError::Bad);
        }
        let transport_error    = raw[1] & 0x80 != 0;
        let payload_unit_start = raw[1] & 0x40 != 0;
        let pid                = ((raw[1] as u16) << 8 | raw[2] as u16) & PID_MASK;
        let afc                = (raw[3] & 0x30) >> 4;
        let cc                 = raw[3] & 0x0F;

        let mut payload_offset = 4usize;
        let mut discontinuity  = false;
        let mut random_access  = false;

        if afc & 0x02 != 0 {
            let af_len = raw[4] as usize;
            // 183 bytes max with payload absent, 182 when a payload follows
            let limit = if afc & 0x01 != 0 { 182 } else { 183 };
            if af_len > limit {
                return Err(PacketError::Bad);
            }
            if af_len > 0 {
                discontinuity = raw[5] & 0x80 != 0;
                random_access = raw[5] & 0x40 != 0;
            }
            payload_offset += 1 + af_len;
        }
        if afc & 0x01 == 0 {
            payload_offset = TS_PACKET_SIZE;
        }

        Ok(Self {
            pid,
            payload_unit_start,
            transport_error,
            adaptation_field_control: afc,
            continuity_counter: cc,
            discontinuity,
            random_access,
            raw,
            payload_offset,
        })
    }

    /// Payload after the header and the adaptation field.
    pub fn payload(&self) -> &[u8] {
        &self.raw[self.payload_offset..]
    }

    pub fn has_payload(&self) -> bool {
        self.payload_offset < TS_PACKET_SIZE
    }

    /// The complete 188-byte packet, as forwarded downstream.
    pub fn data(&self) -> &Bytes {
        &self.raw
    }
}

#[derive(Debug)]
pub enum PacketizerEvent {
    /// Not enough buffered data for a whole packet.
    NeedMore,
    /// A packet was framed but its header is unusable; it has been consumed.
    Bad,
    Packet(Packet),
}

/// Frames a byte stream delivered in arbitrary chunks into transport packets.
pub struct Packetizer {
    buf:         BytesMut,
    packet_size: Option<usize>,
    fixed_size:  bool,
    synced:      bool,
}

impl Packetizer {
    /// `packet_size` of `None` detects the size from the stream.
    pub fn new(packet_size: Option<usize>) -> Self {
        Self {
            buf: BytesMut::with_capacity(MAX_PACKET_SIZE * 8),
            packet_size,
            fixed_size: packet_size.is_some(),
            synced: true,
        }
    }

    pub fn packet_size(&self) -> Option<usize> {
        self.packet_size
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drops buffered bytes; a detected packet size is forgotten.
    pub fn flush(&mut self) {
        self.buf.clear();
        self.synced = true;
        if !self.fixed_size {
            self.packet_size = None;
        }
    }

    pub fn next_packet(&mut self) -> PacketizerEvent {
        let size = match self.packet_size {
            Some(s) => s,
            None => match self.detect_packet_size() {
                Some(s) => s,
                None => return PacketizerEvent::NeedMore,
            },
        };
        let sync_offset = if size == M2TS_PACKET_SIZE { 4 } else { 0 };

        if !self.synced && !self.resync(size, sync_offset) {
            return PacketizerEvent::NeedMore;
        }
        if self.buf.len() < size {
            return PacketizerEvent::NeedMore;
        }
        if self.buf[sync_offset] != TS_SYNC_BYTE {
            warn!(size, "lost sync");
            self.synced = false;
            self.buf.advance(1);
            return self.next_packet();
        }

        let frame  = self.buf.split_to(size).freeze();
        let packet = frame.slice(sync_offset..sync_offset + TS_PACKET_SIZE);
        match Packet::parse(packet) {
            Ok(p) => {
                trace!(pid = p.pid, pusi = p.payload_unit_start, cc = p.continuity_counter, "packet");
                PacketizerEvent::Packet(p)
            }
            Err(PacketError::Bad) => {
                debug!("bad packet header, skipping");
                PacketizerEvent::Bad
            }
        }
    }

    /// Drops bytes until two sync bytes line up at `size` stride.
    fn resync(&mut self, size: usize, sync_offset: usize) -> bool {
        let mut skip = 0;
        loop {
            let first  = skip + sync_offset;
            let second = first + size;
            if second >= self.buf.len() {
                // keep the bytes that may still start a packet
                self.buf.advance(skip);
                return false;
            }
            if self.buf[first] == TS_SYNC_BYTE && self.buf[second] == TS_SYNC_BYTE {
                if skip > 0 {
                    debug!(skipped = skip, "resynchronized");
                }
                self.buf.advance(skip);
                self.synced = true;
                return true;
            }
            skip += 1;
        }
    }

    fn detect_packet_size(&mut self) -> Option<usize> {
        while self.buf.len() >= SYNC_CONFIRMATIONS * MAX_PACKET_SIZE {
            for pos in 0..MAX_PACKET_SIZE {
                if self.buf[pos] != TS_SYNC_BYTE {
                    continue;
                }
                for size in PACKET_SIZES {
                    let lined_up = (1..SYNC_CONFIRMATIONS)
                        .all(|i| self.buf.get(pos + i * size) == Some(&TS_SYNC_BYTE));
                    if !lined_up {
                        continue;
                    }
                    let start = if size == M2TS_PACKET_SIZE {
                        match pos.checked_sub(4) {
                            Some(s) => s,
                            None => continue,
                        }
                    } else {
                        pos
                    };
                    debug!(size, skipped = start, "detected packet size");
                    self.buf.advance(start);
                    self.packet_size = Some(size);
                    return Some(size);
                }
            }
            // no sync in this window; drop it and try the next one
            warn!("no packet size detected in {} bytes", MAX_PACKET_SIZE);
            self.buf.advance(MAX_PACKET_SIZE);
        }
        None
    }
}
