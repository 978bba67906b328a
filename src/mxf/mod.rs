//! MXF (SMPTE 377) KLV parsing: partitions, primer packs, header metadata
//! and index table segments.

pub mod essence;
pub mod index;
pub mod klv;
pub mod local_tag;
pub mod metadata;
pub mod partition;
pub mod primer;
pub mod reader;
pub mod types;
pub mod ul;

pub use essence::{EssenceClassifier, EssenceHandler, EssenceInfo, EssenceKind};
pub use index::{DeltaEntry, IndexEntry, IndexTableSegment};
pub use klv::{Klv, KlvReader, encode_ber_length, read_ber_length};
pub use local_tag::{LocalTag, LocalTagIter};
pub use metadata::{Descriptor, MetadataSet};
pub use partition::PartitionPack;
pub use primer::PrimerPack;
pub use reader::{MxfEvent, MxfReader, ObjectError};
pub use types::{Fraction, ProductVersion, Timestamp};
pub use ul::{PartitionKind, TrackType, Ul, Umid};
