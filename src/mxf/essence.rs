//! Maps file descriptors to an essence kind and codec.
//!
//! Handlers are tried in list order and the last one that accepts a
//! descriptor decides, so handlers appended later override earlier ones.

use serde::Serialize;

use crate::mxf::metadata::Descriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EssenceKind {
    Video,
    Audio,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EssenceInfo {
    pub handler: &'static str,
    pub kind:    EssenceKind,
    pub codec:   String,
}

pub trait EssenceHandler {
    fn name(&self) -> &'static str;
    fn handles(&self, descriptor: &Descriptor) -> bool;
    fn classify(&self, descriptor: &Descriptor) -> EssenceInfo;
}

pub struct EssenceClassifier {
    handlers: Vec<Box<dyn EssenceHandler>>,
}

impl EssenceClassifier {
    pub fn new(handlers: Vec<Box<dyn EssenceHandler>>) -> Self {
        Self { handlers }
    }

    pub fn with_builtin_handlers() -> Self {
        Self::new(vec![
            Box::new(PcmSoundHandler),
            Box::new(GenericPictureHandler),
            Box::new(MpegVideoHandler),
            Box::new(Aes3BwfHandler),
        ])
    }

    pub fn push(&mut self, handler: Box<dyn EssenceHandler>) {
        self.handlers.push(handler);
    }

    pub fn classify(&self, descriptor: &Descriptor) -> Option<EssenceInfo> {
        self.handlers
            .iter()
            .rev()
            .find(|h| h.handles(descriptor))
            .map(|h| h.classify(descriptor))
    }
}

impl Default for EssenceClassifier {
    fn default() -> Self {
        Self::with_builtin_handlers()
    }
}

/// Mapping kind and variant (bytes 13 and 14) of a generic container label.
fn gc_mapping(descriptor: &Descriptor) -> Option<(u8, u8)> {
    let ec = &descriptor.file().essence_container;
    ec.is_generic_container_essence_container_label()
        .then(|| (ec.0[13], ec.0[14]))
}

/// Sound descriptors without a compression label.
pub struct PcmSoundHandler;

impl EssenceHandler for PcmSoundHandler {
    fn name(&self) -> &'static str {
        "pcm"
    }

    fn handles(&self, descriptor: &Descriptor) -> bool {
        descriptor.sound().is_some_and(|s| s.sound_essence_compression.is_zero())
    }

    fn classify(&self, descriptor: &Descriptor) -> EssenceInfo {
        let bits = descriptor.sound().map_or(0, |s| s.quantization_bits);
        EssenceInfo { handler: self.name(), kind: EssenceKind::Audio, codec: format!("pcm_s{bits}") }
    }
}

/// AES3 and Broadcast Wave audio mapped into the generic container (0x06).
pub struct Aes3BwfHandler;

impl EssenceHandler for Aes3BwfHandler {
    fn name(&self) -> &'static str {
        "aes3_bwf"
    }

    fn handles(&self, descriptor: &Descriptor) -> bool {
        matches!(gc_mapping(descriptor), Some((0x06, _)))
    }

    fn classify(&self, descriptor: &Descriptor) -> EssenceInfo {
        let codec = match gc_mapping(descriptor) {
            Some((_, 0x01 | 0x02)) => "bwf",
            Some((_, 0x03 | 0x04)) => "aes3",
            _ => "aes3_bwf",
        };
        EssenceInfo { handler: self.name(), kind: EssenceKind::Audio, codec: codec.to_string() }
    }
}

/// MPEG elementary streams (0x04) and AVC byte streams (0x10).
pub struct MpegVideoHandler;

impl EssenceHandler for MpegVideoHandler {
    fn name(&self) -> &'static str {
        "mpeg_video"
    }

    fn handles(&self, descriptor: &Descriptor) -> bool {
        descriptor.picture().is_some() && matches!(gc_mapping(descriptor), Some((0x04 | 0x10, _)))
    }

    fn classify(&self, descriptor: &Descriptor) -> EssenceInfo {
        let codec = match gc_mapping(descriptor) {
            Some((0x10, _)) => "h264",
            _ => "mpeg2video",
        };
        EssenceInfo { handler: self.name(), kind: EssenceKind::Video, codec: codec.to_string() }
    }
}

/// Any CDCI or RGBA picture; reports the stored frame size.
pub struct GenericPictureHandler;

impl EssenceHandler for GenericPictureHandler {
    fn name(&self) -> &'static str {
        "picture"
    }

    fn handles(&self, descriptor: &Descriptor) -> bool {
        matches!(descriptor, Descriptor::Cdci(_) | Descriptor::Rgba(_))
    }

    fn classify(&self, descriptor: &Descriptor) -> EssenceInfo {
        let (w, h) = descriptor
            .picture()
            .map_or((0, 0), |p| (p.stored_width, p.stored_height));
        let layout = match descriptor {
            Descriptor::Rgba(_) => "rgba",
            _ => "yuv",
        };
        EssenceInfo { handler: self.name(), kind: EssenceKind::Video, codec: format!("raw_{layout}_{w}x{h}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mxf::metadata::{CdciDescriptor, SoundDescriptor};
    use crate::mxf::ul::Ul;

    fn gc_label(mapping: u8, variant: u8) -> Ul {
        Ul([0x06, 0x0e, 0x2b, 0x34, 0x04, 0x01, 0x01, 0x01, 0x0d, 0x01, 0x03, 0x01, 0x02, mapping, variant, 0x00])
    }

    fn sound(container: Ul) -> Descriptor {
        let mut d = SoundDescriptor::default();
        d.file.essence_container = container;
        d.quantization_bits = 24;
        Descriptor::Sound(d)
    }

    #[test]
    fn last_matching_handler_wins() {
        let c = EssenceClassifier::with_builtin_handlers();
        let plain = c.classify(&sound(Ul::ZERO)).unwrap();
        assert_eq!((plain.handler, plain.codec.as_str()), ("pcm", "pcm_s24"));

        // BWF is registered after PCM and claims the same descriptor
        let bwf = c.classify(&sound(gc_label(0x06, 0x01))).unwrap();
        assert_eq!((bwf.handler, bwf.codec.as_str()), ("aes3_bwf", "bwf"));
        assert_eq!(bwf.kind, EssenceKind::Audio);
    }

    #[test]
    fn picture_handlers() {
        let c = EssenceClassifier::default();
        let mut cdci = CdciDescriptor::default();
        cdci.picture.stored_width = 1920;
        cdci.picture.stored_height = 1080;
        let raw = c.classify(&Descriptor::Cdci(cdci.clone())).unwrap();
        assert_eq!(raw.codec, "raw_yuv_1920x1080");

        cdci.picture.file.essence_container = gc_label(0x10, 0x60);
        let avc = c.classify(&Descriptor::Cdci(cdci)).unwrap();
        assert_eq!((avc.handler, avc.codec.as_str()), ("mpeg_video", "h264"));

        assert!(c.classify(&Descriptor::Data(Default::default())).is_none());
    }

    struct Everything;

    impl EssenceHandler for Everything {
        fn name(&self) -> &'static str {
            "everything"
        }
        fn handles(&self, _: &Descriptor) -> bool {
            true
        }
        fn classify(&self, _: &Descriptor) -> EssenceInfo {
            EssenceInfo { handler: "everything", kind: EssenceKind::Data, codec: "opaque".into() }
        }
    }

    #[test]
    fn handler_order_is_explicit() {
        let mut c = EssenceClassifier::new(vec![Box::new(Everything), Box::new(PcmSoundHandler)]);
        assert_eq!(c.classify(&sound(Ul::ZERO)).unwrap().handler, "pcm");
        c.push(Box::new(Everything));
        assert_eq!(c.classify(&sound(Ul::ZERO)).unwrap().handler, "everything");
    }
}
