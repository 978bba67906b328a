//! Header metadata sets.
//!
//! Each set type has a static table of `(tag, setter)` pairs. Subtypes embed
//! their parent set and fall back to its table for tags they do not own, so a
//! CDCI descriptor also accepts picture, file and generic descriptor tags.

use tracing::{debug, trace};

use crate::error::{ParseError, Result};
use crate::mxf::local_tag::{LocalSet, TagHandler, decode_set, field};
use crate::mxf::primer::PrimerPack;
use crate::mxf::types::{
    Fraction, ProductVersion, Timestamp, read_bool, read_fraction, read_i8, read_i16, read_i32,
    read_i64, read_product_version, read_timestamp, read_u8, read_u16, read_u32, read_u32_array,
    read_ul, read_ul_array, read_umid, read_utf16,
};
use crate::mxf::ul::{TrackType, Ul, Umid};

/// Set types, from bytes 13..15 of the metadata key.
pub mod set_type {
    pub const SEQUENCE: u16 = 0x010f;
    pub const SOURCE_CLIP: u16 = 0x0111;
    pub const TIMECODE_COMPONENT: u16 = 0x0114;
    pub const CONTENT_STORAGE: u16 = 0x0118;
    pub const ESSENCE_CONTAINER_DATA: u16 = 0x0123;
    pub const FILE_DESCRIPTOR: u16 = 0x0125;
    pub const PICTURE_DESCRIPTOR: u16 = 0x0127;
    pub const CDCI_DESCRIPTOR: u16 = 0x0128;
    pub const RGBA_DESCRIPTOR: u16 = 0x0129;
    pub const PREFACE: u16 = 0x012f;
    pub const IDENTIFICATION: u16 = 0x0130;
    pub const NETWORK_LOCATOR: u16 = 0x0132;
    pub const TEXT_LOCATOR: u16 = 0x0133;
    pub const MATERIAL_PACKAGE: u16 = 0x0136;
    pub const SOURCE_PACKAGE: u16 = 0x0137;
    pub const EVENT_TRACK: u16 = 0x0139;
    pub const STATIC_TRACK: u16 = 0x013a;
    pub const TIMELINE_TRACK: u16 = 0x013b;
    pub const SOUND_DESCRIPTOR: u16 = 0x0142;
    pub const DATA_DESCRIPTOR: u16 = 0x0143;
    pub const MULTIPLE_DESCRIPTOR: u16 = 0x0144;
}

pub type OtherTags = Vec<(Ul, Vec<u8>)>;

/// Generates the `LocalSet` impl for a set that embeds a parent.
macro_rules! local_set {
    ($ty:ty, $name:literal, $table:ident, parent: $parent:ident, other: $($other:ident).+) => {
        impl LocalSet for $ty {
            const NAME: &'static str = $name;

            fn handlers() -> &'static [TagHandler<Self>] {
                $table
            }

            fn set_inherited(&mut self, tag: u16, value: &[u8]) -> Result<bool> {
                self.$parent.set_tag(tag, value)
            }

            fn keep_other(&mut self, ul: Ul, value: &[u8]) {
                self.$($other).+.push((ul, value.to_vec()));
            }
        }
    };
}

/// Instance and generation UIDs carried by every set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetHeader {
    pub instance_uid:   Ul,
    pub generation_uid: Ul,
}

static HEADER_TAGS: &[TagHandler<SetHeader>] = &[
    field!(0x3c0a => instance_uid: read_ul),
    field!(0x0102 => generation_uid: read_ul),
];

impl LocalSet for SetHeader {
    const NAME: &'static str = "set";

    fn handlers() -> &'static [TagHandler<Self>] {
        HEADER_TAGS
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preface {
    pub header:               SetHeader,
    pub last_modified_date:   Timestamp,
    pub version:              u16,
    pub object_model_version: u32,
    pub primary_package:      Ul,
    pub identifications:      Vec<Ul>,
    pub content_storage:      Ul,
    pub operational_pattern:  Ul,
    pub essence_containers:   Vec<Ul>,
    pub dm_schemes:           Vec<Ul>,
    pub other_tags:           OtherTags,
}

static PREFACE_TAGS: &[TagHandler<Preface>] = &[
    field!(0x3b02 => last_modified_date: read_timestamp),
    field!(0x3b05 => version: read_u16),
    field!(0x3b07 => object_model_version: read_u32),
    field!(0x3b08 => primary_package: read_ul),
    field!(0x3b06 => identifications: read_ul_array),
    field!(0x3b03 => content_storage: read_ul),
    field!(0x3b09 => operational_pattern: read_ul),
    field!(0x3b0a => essence_containers: read_ul_array),
    field!(0x3b0b => dm_schemes: read_ul_array),
];
local_set!(Preface, "preface", PREFACE_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identification {
    pub header:              SetHeader,
    pub this_generation_uid: Ul,
    pub company_name:        String,
    pub product_name:        String,
    pub product_version:     ProductVersion,
    pub version_string:      String,
    pub product_uid:         Ul,
    pub modification_date:   Timestamp,
    pub toolkit_version:     ProductVersion,
    pub platform:            String,
    pub other_tags:          OtherTags,
}

static IDENTIFICATION_TAGS: &[TagHandler<Identification>] = &[
    field!(0x3c09 => this_generation_uid: read_ul),
    field!(0x3c01 => company_name: read_utf16),
    field!(0x3c02 => product_name: read_utf16),
    field!(0x3c03 => product_version: read_product_version),
    field!(0x3c04 => version_string: read_utf16),
    field!(0x3c05 => product_uid: read_ul),
    field!(0x3c06 => modification_date: read_timestamp),
    field!(0x3c07 => toolkit_version: read_product_version),
    field!(0x3c08 => platform: read_utf16),
];
local_set!(Identification, "identification", IDENTIFICATION_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentStorage {
    pub header:                 SetHeader,
    pub packages:               Vec<Ul>,
    pub essence_container_data: Vec<Ul>,
    pub other_tags:             OtherTags,
}

static CONTENT_STORAGE_TAGS: &[TagHandler<ContentStorage>] = &[
    field!(0x1901 => packages: read_ul_array),
    field!(0x1902 => essence_container_data: read_ul_array),
];
local_set!(ContentStorage, "content_storage", CONTENT_STORAGE_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EssenceContainerData {
    pub header:             SetHeader,
    pub linked_package_uid: Umid,
    pub index_sid:          u32,
    pub body_sid:           u32,
    pub other_tags:         OtherTags,
}

static ESSENCE_CONTAINER_DATA_TAGS: &[TagHandler<EssenceContainerData>] = &[
    field!(0x2701 => linked_package_uid: read_umid),
    field!(0x3f06 => index_sid: read_u32),
    field!(0x3f07 => body_sid: read_u32),
];
local_set!(
    EssenceContainerData,
    "essence_container_data",
    ESSENCE_CONTAINER_DATA_TAGS,
    parent: header,
    other: other_tags
);

/// Material packages use this directly; source packages add a descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericPackage {
    pub header:                SetHeader,
    pub package_uid:           Umid,
    pub name:                  String,
    pub package_creation_date: Timestamp,
    pub package_modified_date: Timestamp,
    pub tracks:                Vec<Ul>,
    pub other_tags:            OtherTags,
}

static PACKAGE_TAGS: &[TagHandler<GenericPackage>] = &[
    field!(0x4401 => package_uid: read_umid),
    field!(0x4402 => name: read_utf16),
    field!(0x4405 => package_creation_date: read_timestamp),
    field!(0x4404 => package_modified_date: read_timestamp),
    field!(0x4403 => tracks: read_ul_array),
];
local_set!(GenericPackage, "package", PACKAGE_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePackage {
    pub package:    GenericPackage,
    pub descriptor: Ul,
}

static SOURCE_PACKAGE_TAGS: &[TagHandler<SourcePackage>] = &[field!(0x4701 => descriptor: read_ul)];
local_set!(SourcePackage, "source_package", SOURCE_PACKAGE_TAGS, parent: package, other: package.other_tags);

/// Timeline, event and static tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub header:       SetHeader,
    pub track_id:     u32,
    pub track_number: u32,
    pub track_name:   String,
    pub edit_rate:    Fraction,
    pub origin:       i64,
    pub sequence:     Ul,
    pub other_tags:   OtherTags,
}

static TRACK_TAGS: &[TagHandler<Track>] = &[
    field!(0x4801 => track_id: read_u32),
    field!(0x4804 => track_number: read_u32),
    field!(0x4802 => track_name: read_utf16),
    field!(0x4803 => sequence: read_ul),
    field!(0x4b01 => edit_rate: read_fraction),
    field!(0x4b02 => origin: read_i64),
    // event track
    field!(0x4901 => edit_rate: read_fraction),
    field!(0x4902 => origin: read_i64),
];
local_set!(Track, "track", TRACK_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    pub header:                SetHeader,
    pub data_definition:       Ul,
    pub duration:              i64,
    pub structural_components: Vec<Ul>,
    pub other_tags:            OtherTags,
}

impl Sequence {
    pub fn track_type(&self) -> TrackType {
        TrackType::from_data_definition(&self.data_definition)
    }
}

static SEQUENCE_TAGS: &[TagHandler<Sequence>] = &[
    field!(0x0201 => data_definition: read_ul),
    field!(0x0202 => duration: read_i64),
    field!(0x1001 => structural_components: read_ul_array),
];
local_set!(Sequence, "sequence", SEQUENCE_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralComponent {
    pub header:          SetHeader,
    pub data_definition: Ul,
    pub duration:        i64,
    pub other_tags:      OtherTags,
}

static COMPONENT_TAGS: &[TagHandler<StructuralComponent>] = &[
    field!(0x0201 => data_definition: read_ul),
    field!(0x0202 => duration: read_i64),
];
local_set!(StructuralComponent, "component", COMPONENT_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceClip {
    pub component:         StructuralComponent,
    pub start_position:    i64,
    pub source_package_id: Umid,
    pub source_track_id:   u32,
}

static SOURCE_CLIP_TAGS: &[TagHandler<SourceClip>] = &[
    field!(0x1201 => start_position: read_i64),
    field!(0x1101 => source_package_id: read_umid),
    field!(0x1102 => source_track_id: read_u32),
];
local_set!(SourceClip, "source_clip", SOURCE_CLIP_TAGS, parent: component, other: component.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimecodeComponent {
    pub component:             StructuralComponent,
    pub rounded_timecode_base: u16,
    pub start_timecode:        i64,
    pub drop_frame:            bool,
}

static TIMECODE_TAGS: &[TagHandler<TimecodeComponent>] = &[
    field!(0x1502 => rounded_timecode_base: read_u16),
    field!(0x1501 => start_timecode: read_i64),
    field!(0x1503 => drop_frame: read_bool),
];
local_set!(TimecodeComponent, "timecode_component", TIMECODE_TAGS, parent: component, other: component.other_tags);

// Descriptors

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericDescriptor {
    pub header:     SetHeader,
    pub locators:   Vec<Ul>,
    /// Tags the primer maps but no table handles, kept raw.
    pub other_tags: OtherTags,
}

static GENERIC_DESCRIPTOR_TAGS: &[TagHandler<GenericDescriptor>] = &[field!(0x2f01 => locators: read_ul_array)];
local_set!(GenericDescriptor, "generic_descriptor", GENERIC_DESCRIPTOR_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptor {
    pub generic:            GenericDescriptor,
    pub linked_track_id:    u32,
    pub sample_rate:        Fraction,
    pub container_duration: i64,
    pub essence_container:  Ul,
    pub codec:              Ul,
}

static FILE_DESCRIPTOR_TAGS: &[TagHandler<FileDescriptor>] = &[
    field!(0x3006 => linked_track_id: read_u32),
    field!(0x3001 => sample_rate: read_fraction),
    field!(0x3002 => container_duration: read_i64),
    field!(0x3004 => essence_container: read_ul),
    field!(0x3005 => codec: read_ul),
];
local_set!(FileDescriptor, "file_descriptor", FILE_DESCRIPTOR_TAGS, parent: generic, other: generic.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PictureDescriptor {
    pub file:                     FileDescriptor,
    pub signal_standard:          u8,
    pub frame_layout:             u8,
    pub stored_width:             u32,
    pub stored_height:            u32,
    pub stored_f2_offset:         i32,
    pub sampled_width:            u32,
    pub sampled_height:           u32,
    pub sampled_x_offset:         i32,
    pub sampled_y_offset:         i32,
    pub display_height:           u32,
    pub display_width:            u32,
    pub display_x_offset:         i32,
    pub display_y_offset:         i32,
    pub display_f2_offset:        i32,
    pub aspect_ratio:             Fraction,
    pub active_format_descriptor: u8,
    pub video_line_map:           Vec<u32>,
    pub alpha_transparency:       u8,
    pub capture_gamma:            Ul,
    pub image_alignment_offset:   u32,
    pub image_start_offset:       u32,
    pub image_end_offset:         u32,
    pub field_dominance:          u8,
    pub picture_essence_coding:   Ul,
}

static PICTURE_DESCRIPTOR_TAGS: &[TagHandler<PictureDescriptor>] = &[
    field!(0x3215 => signal_standard: read_u8),
    field!(0x320c => frame_layout: read_u8),
    field!(0x3203 => stored_width: read_u32),
    field!(0x3202 => stored_height: read_u32),
    field!(0x3216 => stored_f2_offset: read_i32),
    field!(0x3205 => sampled_width: read_u32),
    field!(0x3204 => sampled_height: read_u32),
    field!(0x3206 => sampled_x_offset: read_i32),
    field!(0x3207 => sampled_y_offset: read_i32),
    field!(0x3208 => display_height: read_u32),
    field!(0x3209 => display_width: read_u32),
    field!(0x320a => display_x_offset: read_i32),
    field!(0x320b => display_y_offset: read_i32),
    field!(0x3217 => display_f2_offset: read_i32),
    field!(0x320e => aspect_ratio: read_fraction),
    field!(0x3218 => active_format_descriptor: read_u8),
    field!(0x320d => video_line_map: read_u32_array),
    field!(0x320f => alpha_transparency: read_u8),
    field!(0x3210 => capture_gamma: read_ul),
    field!(0x3211 => image_alignment_offset: read_u32),
    field!(0x3213 => image_start_offset: read_u32),
    field!(0x3214 => image_end_offset: read_u32),
    field!(0x3212 => field_dominance: read_u8),
    field!(0x3201 => picture_essence_coding: read_ul),
];
local_set!(PictureDescriptor, "picture_descriptor", PICTURE_DESCRIPTOR_TAGS, parent: file, other: file.generic.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CdciDescriptor {
    pub picture:                PictureDescriptor,
    pub component_depth:        u32,
    pub horizontal_subsampling: u32,
    pub vertical_subsampling:   u32,
    pub color_siting:           u8,
    pub reversed_byte_order:    bool,
    pub padding_bits:           i16,
    pub alpha_sample_depth:     u32,
    pub black_ref_level:        u32,
    pub white_ref_level:        u32,
    pub color_range:            u32,
}

static CDCI_DESCRIPTOR_TAGS: &[TagHandler<CdciDescriptor>] = &[
    field!(0x3301 => component_depth: read_u32),
    field!(0x3302 => horizontal_subsampling: read_u32),
    field!(0x3308 => vertical_subsampling: read_u32),
    field!(0x3303 => color_siting: read_u8),
    field!(0x330b => reversed_byte_order: read_bool),
    field!(0x3307 => padding_bits: read_i16),
    field!(0x3309 => alpha_sample_depth: read_u32),
    field!(0x3304 => black_ref_level: read_u32),
    field!(0x3305 => white_ref_level: read_u32),
    field!(0x3306 => color_range: read_u32),
];
local_set!(CdciDescriptor, "cdci_descriptor", CDCI_DESCRIPTOR_TAGS, parent: picture, other: picture.file.generic.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RgbaDescriptor {
    pub picture:            PictureDescriptor,
    pub component_max_ref:  u32,
    pub component_min_ref:  u32,
    pub alpha_max_ref:      u32,
    pub alpha_min_ref:      u32,
    pub scanning_direction: u8,
    /// `(component code, depth)` pairs.
    pub pixel_layout:       Vec<(u8, u8)>,
}

/// Pixel layout runs until a zero component code.
fn read_pixel_layout(v: &[u8]) -> Result<Vec<(u8, u8)>> {
    if v.len() % 2 != 0 {
        return Err(ParseError::invalid(format!("odd pixel layout length {}", v.len())));
    }
    Ok(v.chunks_exact(2)
        .take_while(|pair| pair[0] != 0)
        .map(|pair| (pair[0], pair[1]))
        .collect())
}

static RGBA_DESCRIPTOR_TAGS: &[TagHandler<RgbaDescriptor>] = &[
    field!(0x3406 => component_max_ref: read_u32),
    field!(0x3407 => component_min_ref: read_u32),
    field!(0x3408 => alpha_max_ref: read_u32),
    field!(0x3409 => alpha_min_ref: read_u32),
    field!(0x3405 => scanning_direction: read_u8),
    field!(0x3401 => pixel_layout: read_pixel_layout),
];
local_set!(RgbaDescriptor, "rgba_descriptor", RGBA_DESCRIPTOR_TAGS, parent: picture, other: picture.file.generic.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundDescriptor {
    pub file:                        FileDescriptor,
    pub audio_sampling_rate:         Fraction,
    pub locked:                      bool,
    pub audio_ref_level:             i8,
    pub electro_spatial_formulation: u8,
    pub channel_count:               u32,
    pub quantization_bits:           u32,
    pub dial_norm:                   i8,
    pub sound_essence_compression:   Ul,
}

static SOUND_DESCRIPTOR_TAGS: &[TagHandler<SoundDescriptor>] = &[
    field!(0x3d03 => audio_sampling_rate: read_fraction),
    field!(0x3d02 => locked: read_bool),
    field!(0x3d04 => audio_ref_level: read_i8),
    field!(0x3d05 => electro_spatial_formulation: read_u8),
    field!(0x3d07 => channel_count: read_u32),
    field!(0x3d01 => quantization_bits: read_u32),
    field!(0x3d0c => dial_norm: read_i8),
    field!(0x3d06 => sound_essence_compression: read_ul),
];
local_set!(SoundDescriptor, "sound_descriptor", SOUND_DESCRIPTOR_TAGS, parent: file, other: file.generic.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDescriptor {
    pub file:                FileDescriptor,
    pub data_essence_coding: Ul,
}

static DATA_DESCRIPTOR_TAGS: &[TagHandler<DataDescriptor>] = &[field!(0x3e01 => data_essence_coding: read_ul)];
local_set!(DataDescriptor, "data_descriptor", DATA_DESCRIPTOR_TAGS, parent: file, other: file.generic.other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipleDescriptor {
    pub file:            FileDescriptor,
    pub sub_descriptors: Vec<Ul>,
}

static MULTIPLE_DESCRIPTOR_TAGS: &[TagHandler<MultipleDescriptor>] = &[field!(0x3f01 => sub_descriptors: read_ul_array)];
local_set!(MultipleDescriptor, "multiple_descriptor", MULTIPLE_DESCRIPTOR_TAGS, parent: file, other: file.generic.other_tags);

/// The descriptor kinds, each with its own field struct.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    File(FileDescriptor),
    Picture(PictureDescriptor),
    Cdci(CdciDescriptor),
    Rgba(RgbaDescriptor),
    Sound(SoundDescriptor),
    Data(DataDescriptor),
    Multiple(MultipleDescriptor),
}

impl Descriptor {
    pub fn file(&self) -> &FileDescriptor {
        match self {
            Descriptor::File(d) => d,
            Descriptor::Picture(d) => &d.file,
            Descriptor::Cdci(d) => &d.picture.file,
            Descriptor::Rgba(d) => &d.picture.file,
            Descriptor::Sound(d) => &d.file,
            Descriptor::Data(d) => &d.file,
            Descriptor::Multiple(d) => &d.file,
        }
    }

    pub fn picture(&self) -> Option<&PictureDescriptor> {
        match self {
            Descriptor::Picture(d) => Some(d),
            Descriptor::Cdci(d) => Some(&d.picture),
            Descriptor::Rgba(d) => Some(&d.picture),
            _ => None,
        }
    }

    pub fn sound(&self) -> Option<&SoundDescriptor> {
        match self {
            Descriptor::Sound(d) => Some(d),
            _ => None,
        }
    }

    pub fn other_tags(&self) -> &OtherTags {
        &self.file().generic.other_tags
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Descriptor::File(_) => FileDescriptor::NAME,
            Descriptor::Picture(_) => PictureDescriptor::NAME,
            Descriptor::Cdci(_) => CdciDescriptor::NAME,
            Descriptor::Rgba(_) => RgbaDescriptor::NAME,
            Descriptor::Sound(_) => SoundDescriptor::NAME,
            Descriptor::Data(_) => DataDescriptor::NAME,
            Descriptor::Multiple(_) => MultipleDescriptor::NAME,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkLocator {
    pub header:     SetHeader,
    pub url:        String,
    pub other_tags: OtherTags,
}

static NETWORK_LOCATOR_TAGS: &[TagHandler<NetworkLocator>] = &[
    field!(0x4001 => url: read_utf16),
    // some writers reuse the text locator tag
    field!(0x4101 => url: read_utf16),
];
local_set!(NetworkLocator, "network_locator", NETWORK_LOCATOR_TAGS, parent: header, other: other_tags);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLocator {
    pub header:     SetHeader,
    pub name:       String,
    pub other_tags: OtherTags,
}

static TEXT_LOCATOR_TAGS: &[TagHandler<TextLocator>] = &[field!(0x4101 => name: read_utf16)];
local_set!(TextLocator, "text_locator", TEXT_LOCATOR_TAGS, parent: header, other: other_tags);

/// One decoded header metadata set.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataSet {
    Preface(Preface),
    Identification(Identification),
    ContentStorage(ContentStorage),
    EssenceContainerData(EssenceContainerData),
    MaterialPackage(GenericPackage),
    SourcePackage(SourcePackage),
    Track(Track),
    Sequence(Sequence),
    SourceClip(SourceClip),
    TimecodeComponent(TimecodeComponent),
    Descriptor(Descriptor),
    NetworkLocator(NetworkLocator),
    TextLocator(TextLocator),
}

impl MetadataSet {
    /// Decodes the value of a metadata KLV. `Ok(None)` for set types this
    /// crate does not model.
    pub fn decode(key: &Ul, primer: &PrimerPack, data: &[u8]) -> Result<Option<Self>> {
        use set_type::*;

        if !key.is_metadata() {
            return Err(ParseError::invalid(format!("{key} is not a metadata key")));
        }
        let set_type = key.metadata_type();
        trace!(set_type = format_args!("0x{set_type:04x}"), len = data.len(), "decoding set");

        let set = match set_type {
            PREFACE => MetadataSet::Preface(decode_set(primer, data)?),
            IDENTIFICATION => MetadataSet::Identification(decode_set(primer, data)?),
            CONTENT_STORAGE => MetadataSet::ContentStorage(decode_set(primer, data)?),
            ESSENCE_CONTAINER_DATA => MetadataSet::EssenceContainerData(decode_set(primer, data)?),
            MATERIAL_PACKAGE => MetadataSet::MaterialPackage(decode_set(primer, data)?),
            SOURCE_PACKAGE => MetadataSet::SourcePackage(decode_set(primer, data)?),
            TIMELINE_TRACK | EVENT_TRACK | STATIC_TRACK => MetadataSet::Track(decode_set(primer, data)?),
            SEQUENCE => MetadataSet::Sequence(decode_set(primer, data)?),
            SOURCE_CLIP => MetadataSet::SourceClip(decode_set(primer, data)?),
            TIMECODE_COMPONENT => MetadataSet::TimecodeComponent(decode_set(primer, data)?),
            FILE_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::File(decode_set(primer, data)?)),
            PICTURE_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::Picture(decode_set(primer, data)?)),
            CDCI_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::Cdci(decode_set(primer, data)?)),
            RGBA_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::Rgba(decode_set(primer, data)?)),
            SOUND_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::Sound(decode_set(primer, data)?)),
            DATA_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::Data(decode_set(primer, data)?)),
            MULTIPLE_DESCRIPTOR => MetadataSet::Descriptor(Descriptor::Multiple(decode_set(primer, data)?)),
            NETWORK_LOCATOR => MetadataSet::NetworkLocator(decode_set(primer, data)?),
            TEXT_LOCATOR => MetadataSet::TextLocator(decode_set(primer, data)?),
            other => {
                debug!(set_type = format_args!("0x{other:04x}"), "unsupported metadata set");
                return Ok(None);
            }
        };
        Ok(Some(set))
    }

    pub fn header(&self) -> &SetHeader {
        match self {
            MetadataSet::Preface(s) => &s.header,
            MetadataSet::Identification(s) => &s.header,
            MetadataSet::ContentStorage(s) => &s.header,
            MetadataSet::EssenceContainerData(s) => &s.header,
            MetadataSet::MaterialPackage(s) => &s.header,
            MetadataSet::SourcePackage(s) => &s.package.header,
            MetadataSet::Track(s) => &s.header,
            MetadataSet::Sequence(s) => &s.header,
            MetadataSet::SourceClip(s) => &s.component.header,
            MetadataSet::TimecodeComponent(s) => &s.component.header,
            MetadataSet::Descriptor(d) => &d.file().generic.header,
            MetadataSet::NetworkLocator(s) => &s.header,
            MetadataSet::TextLocator(s) => &s.header,
        }
    }

    pub fn instance_uid(&self) -> &Ul {
        &self.header().instance_uid
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MetadataSet::Preface(_) => Preface::NAME,
            MetadataSet::Identification(_) => Identification::NAME,
            MetadataSet::ContentStorage(_) => ContentStorage::NAME,
            MetadataSet::EssenceContainerData(_) => EssenceContainerData::NAME,
            MetadataSet::MaterialPackage(_) => "material_package",
            MetadataSet::SourcePackage(_) => SourcePackage::NAME,
            MetadataSet::Track(_) => Track::NAME,
            MetadataSet::Sequence(_) => Sequence::NAME,
            MetadataSet::SourceClip(_) => SourceClip::NAME,
            MetadataSet::TimecodeComponent(_) => TimecodeComponent::NAME,
            MetadataSet::Descriptor(d) => d.kind_name(),
            MetadataSet::NetworkLocator(_) => NetworkLocator::NAME,
            MetadataSet::TextLocator(_) => TextLocator::NAME,
        }
    }
}
