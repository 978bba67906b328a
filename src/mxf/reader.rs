use tracing::{debug, info, warn};

use crate::config::MxfConfig;
use crate::error::{ParseError, Result};
use crate::mxf::essence::{EssenceClassifier, EssenceInfo};
use crate::mxf::index::IndexTableSegment;
use crate::mxf::klv::{Klv, KlvReader};
use crate::mxf::metadata::{Descriptor, MetadataSet};
use crate::mxf::partition::PartitionPack;
use crate::mxf::primer::PrimerPack;
use crate::mxf::ul::Ul;

/// What one KLV turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum MxfEvent {
    Partition(PartitionPack),
    Primer { entries: usize },
    Metadata {
        set:     MetadataSet,
        /// Set for descriptors the classifier recognised.
        essence: Option<EssenceInfo>,
    },
    IndexSegment(IndexTableSegment),
    EssenceElement { track_number: u32, len: usize },
    SystemItem,
    Fill,
    RandomIndexPack,
    /// A well-formed KLV this reader does not decode.
    Skipped(Ul),
}

/// Per-object failure that did not stop the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectError {
    pub offset: usize,
    pub key:    Ul,
    pub error:  ParseError,
}

/// Decodes KLV objects in stream order, keeping the partition and primer
/// state that later objects depend on.
pub struct MxfReader {
    config:     MxfConfig,
    classifier: EssenceClassifier,
    partition:  Option<PartitionPack>,
    primer:     Option<PrimerPack>,
}

impl MxfReader {
    pub fn new(config: MxfConfig) -> Self {
        Self::with_classifier(config, EssenceClassifier::with_builtin_handlers())
    }

    pub fn with_classifier(config: MxfConfig, classifier: EssenceClassifier) -> Self {
        Self { config, classifier, partition: None, primer: None }
    }

    pub fn partition(&self) -> Option<&PartitionPack> {
        self.partition.as_ref()
    }

    pub fn primer(&self) -> Option<&PrimerPack> {
        self.primer.as_ref()
    }

    pub fn reset(&mut self) {
        self.partition = None;
        self.primer = None;
    }

    /// Handles one KLV. An error discards this object only; the reader
    /// state is left as it was.
    pub fn handle_klv(&mut self, key: &Ul, value: &[u8]) -> Result<MxfEvent> {
        if let Some(kind) = key.partition_kind() {
            let pack = PartitionPack::parse(key, value)?;
            info!(?kind, this = pack.this_partition, body_sid = pack.body_sid, "partition");
            // the primer belongs to the previous partition's header metadata
            self.primer = None;
            self.partition = Some(pack.clone());
            return Ok(MxfEvent::Partition(pack));
        }
        if key.is_primer_pack() {
            if self.partition.is_none() {
                return Err(ParseError::invalid("primer pack outside a partition"));
            }
            let primer = PrimerPack::parse(value)?;
            debug!(entries = primer.len(), "primer");
            let entries = primer.len();
            self.primer = Some(primer);
            return Ok(MxfEvent::Primer { entries });
        }
        if key.is_index_table_segment() {
            let seg = IndexTableSegment::parse(value, &self.config)?;
            debug!(index_sid = seg.index_sid, entries = seg.index_entries.len(), "index table segment");
            return Ok(MxfEvent::IndexSegment(seg));
        }
        if key.is_metadata() {
            let primer = self
                .primer
                .as_ref()
                .ok_or_else(|| ParseError::invalid("metadata set before a primer pack"))?;
            return Ok(match MetadataSet::decode(key, primer, value)? {
                Some(set) => {
                    let essence = match &set {
                        MetadataSet::Descriptor(d) => self.classify(d),
                        _ => None,
                    };
                    MxfEvent::Metadata { set, essence }
                }
                None => MxfEvent::Skipped(*key),
            });
        }
        if key.is_generic_container_essence_element() {
            return Ok(MxfEvent::EssenceElement { track_number: key.essence_track_number(), len: value.len() });
        }
        if key.is_generic_container_system_item() {
            return Ok(MxfEvent::SystemItem);
        }
        if key.is_fill() {
            return Ok(MxfEvent::Fill);
        }
        if key.is_random_index_pack() {
            return Ok(MxfEvent::RandomIndexPack);
        }
        debug!(%key, "skipping KLV");
        Ok(MxfEvent::Skipped(*key))
    }

    fn classify(&self, descriptor: &Descriptor) -> Option<EssenceInfo> {
        let info = self.classifier.classify(descriptor);
        if info.is_none() {
            debug!(kind = descriptor.kind_name(), "no essence handler");
        }
        info
    }

    /// Walks every KLV in `data`. Object errors are collected and the walk
    /// continues; a framing error (bad BER length, value past the end) ends
    /// it and is returned.
    pub fn read_all(&mut self, data: &[u8]) -> Result<(Vec<MxfEvent>, Vec<ObjectError>)> {
        let mut events = Vec::new();
        let mut errors = Vec::new();
        for klv in KlvReader::new(data) {
            let Klv { key, value, offset } = klv?;
            match self.handle_klv(&key, value) {
                Ok(event) => events.push(event),
                Err(error) => {
                    warn!(offset, %key, %error, "dropping MXF object");
                    errors.push(ObjectError { offset, key, error });
                }
            }
        }
        Ok((events, errors))
    }
}

impl Default for MxfReader {
    fn default() -> Self {
        Self::new(MxfConfig::default())
    }
}
