//! Local-set iteration and the table-driven tag decoder shared by every
//! metadata set.

use tracing::warn;

use crate::constants::LOCAL_TAG_HEADER_LEN;
use crate::error::{ParseError, Result};
use crate::mxf::primer::PrimerPack;
use crate::mxf::ul::Ul;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTag<'a> {
    pub tag:   u16,
    pub value: &'a [u8],
}

/// Walks `(tag: u16, length: u16, value)` triplets. Zero tags and empty
/// values are padding and skipped.
pub struct LocalTagIter<'a> {
    data:   &'a [u8],
    failed: bool,
}

impl<'a> LocalTagIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, failed: false }
    }
}

impl<'a> Iterator for LocalTagIter<'a> {
    type Item = Result<LocalTag<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed || self.data.is_empty() {
                return None;
            }
            let d = self.data;
            if d.len() < LOCAL_TAG_HEADER_LEN {
                if d.iter().all(|&b| b == 0) {
                    self.data = &[];
                    return None;
                }
                self.failed = true;
                return Some(Err(ParseError::Truncated { needed: LOCAL_TAG_HEADER_LEN, available: d.len() }));
            }
            let tag = u16::from_be_bytes([d[0], d[1]]);
            let len = u16::from_be_bytes([d[2], d[3]]) as usize;
            let end = LOCAL_TAG_HEADER_LEN + len;
            if d.len() < end {
                self.failed = true;
                return Some(Err(ParseError::Truncated { needed: end, available: d.len() }));
            }
            self.data = &d[end..];
            if tag == 0 || len == 0 {
                continue;
            }
            return Some(Ok(LocalTag { tag, value: &d[LOCAL_TAG_HEADER_LEN..end] }));
        }
    }
}

/// Field setter run for one local tag.
pub(crate) struct TagHandler<T> {
    pub tag:  u16,
    pub name: &'static str,
    pub set:  fn(&mut T, &[u8]) -> Result<()>,
}

/// `field!(0x3006 => linked_track_id: read_u32)` sets `self.linked_track_id`.
macro_rules! field {
    ($tag:literal => $field:ident : $read:path) => {
        $crate::mxf::local_tag::TagHandler {
            tag: $tag,
            name: stringify!($field),
            set: |s, v| {
                s.$field = $read(v)?;
                Ok(())
            },
        }
    };
}
pub(crate) use field;

/// A metadata set decoded from local tags.
///
/// Own tags come from `handlers()`; tags the table does not know are offered
/// to the embedded parent set, and anything left is kept by `keep_other`.
pub(crate) trait LocalSet: Default + 'static {
    const NAME: &'static str;

    fn handlers() -> &'static [TagHandler<Self>];

    /// Offers a tag to the parent set. `Ok(false)` if nobody up the chain
    /// knows it.
    fn set_inherited(&mut self, _tag: u16, _value: &[u8]) -> Result<bool> {
        Ok(false)
    }

    fn keep_other(&mut self, _ul: Ul, _value: &[u8]) {}

    fn set_tag(&mut self, tag: u16, value: &[u8]) -> Result<bool> {
        match Self::handlers().iter().find(|h| h.tag == tag) {
            Some(h) => {
                (h.set)(self, value).map_err(|e| match e {
                    ParseError::Invalid(msg) => {
                        ParseError::Invalid(format!("{}.{}: {msg}", Self::NAME, h.name))
                    }
                    other => other,
                })?;
                Ok(true)
            }
            None => self.set_inherited(tag, value),
        }
    }
}

/// Decodes a local set. Tags missing from the primer are warned about and
/// skipped; a field with the wrong size fails the whole set.
pub(crate) fn decode_set<T: LocalSet>(primer: &PrimerPack, data: &[u8]) -> Result<T> {
    let mut set = T::default();
    for item in LocalTagIter::new(data) {
        let LocalTag { tag, value } = item?;
        let Some(ul) = primer.lookup(tag).copied() else {
            warn!(set = T::NAME, error = %ParseError::UnknownTag(tag), "skipping tag");
            continue;
        };
        if !set.set_tag(tag, value)? {
            set.keep_other(ul, value);
        }
    }
    Ok(set)
}
