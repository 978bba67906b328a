pub mod descriptor;
pub mod pat;
pub mod pmt;
pub mod reassembler;
pub mod section;

pub use descriptor::{parse_descriptors, Descriptor};
pub use pat::{parse_pat, PatEntry, PatTable};
pub use pmt::{parse_pmt, stream_type_name, PmtStream, PmtTable};
pub use reassembler::SectionReassembler;
pub use section::{Section, SectionHeader};
