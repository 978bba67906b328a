// src/lib.rs
//! MPEG-TS program demultiplexing and MXF KLV parsing.
//!
//! The transport stream side runs bytes through [`packetizer`], reassembles
//! PSI sections, keeps the program registry current from PAT/PMT and fans
//! packets out to per-program pads. The MXF side decodes partition packs,
//! primer packs, header metadata and index table segments.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod mxf;
pub mod network;
pub mod packetizer;
pub mod processor;
pub mod psi;
pub mod registry;
pub mod report;
pub mod router;
pub mod types;

pub use config::{DemuxConfig, MxfConfig};
pub use error::{FlowError, ParseError, Result};
pub use mxf::{MxfEvent, MxfReader};
pub use processor::TsDemux;
pub use report::Reporter;
