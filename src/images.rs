//! Image assets – manifest model, placement routing and a per-build
//! dimension cache. Only PNG and JPEG can be embedded; WebP is rejected at
//! ingestion and again at decode time.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A user-supplied image carried in the manifest with base64-encoded bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    /// Opaque, stable identity assigned at ingestion.
    pub id: String,
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub size_bytes: u64,
    pub mime: ImageMime,
    #[serde(default = "default_true")]
    pub include: bool,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub placement: Option<Placement>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Png,
    Jpeg,
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Webp => "image/webp",
        }
    }
}

/// Declared target zone for an image. Absent placement means gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Placement {
    Gallery,
    Cover {
        slot: CoverSlot,
    },
    #[serde(rename_all = "camelCase")]
    Chapter {
        chapter_index: usize,
        #[serde(default)]
        anchor: Anchor,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverSlot {
    Background,
    Badge,
}

/// Position of a chapter image relative to the block stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Start,
    Middle,
    End,
}

/// A chapter image together with its resolved anchor.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredImage<'a> {
    pub asset: &'a ImageAsset,
    pub anchor: Anchor,
}

/// Included images routed to their drawing sites.
#[derive(Debug, Default)]
pub struct ImagePlan<'a> {
    pub cover_background: Option<&'a ImageAsset>,
    pub cover_badge: Option<&'a ImageAsset>,
    pub gallery: Vec<&'a ImageAsset>,
    pub chapters: HashMap<usize, Vec<AnchoredImage<'a>>>,
}

impl<'a> ImagePlan<'a> {
    /// Bucket the included images by placement. The first image claiming a
    /// cover slot wins; later claimants are skipped.
    pub fn partition(assets: &'a [ImageAsset]) -> Self {
        let mut plan = ImagePlan::default();
        for asset in assets.iter().filter(|a| a.include) {
            match asset.placement {
                None | Some(Placement::Gallery) => plan.gallery.push(asset),
                Some(Placement::Cover {
                    slot: CoverSlot::Background,
                }) => {
                    if plan.cover_background.is_none() {
                        plan.cover_background = Some(asset);
                    } else {
                        log::debug!("cover background already taken, skipping `{}`", asset.name);
                    }
                }
                Some(Placement::Cover {
                    slot: CoverSlot::Badge,
                }) => {
                    if plan.cover_badge.is_none() {
                        plan.cover_badge = Some(asset);
                    } else {
                        log::debug!("cover badge already taken, skipping `{}`", asset.name);
                    }
                }
                Some(Placement::Chapter {
                    chapter_index,
                    anchor,
                }) => {
                    plan.chapters
                        .entry(chapter_index)
                        .or_default()
                        .push(AnchoredImage { asset, anchor });
                }
            }
        }
        plan
    }

    /// Images anchored to the given chapter index, in manifest order.
    pub fn for_chapter(&self, index: usize) -> &[AnchoredImage<'a>] {
        self.chapters.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pixel-dimension cache keyed by asset id, so an asset is decoded at most
/// once per document build.
#[derive(Default)]
pub struct ImageStore {
    dims: HashMap<String, (u32, u32)>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intrinsic pixel dimensions of an asset. Decode failures and WebP
    /// inputs abort the document build.
    pub fn dimensions(&mut self, asset: &ImageAsset) -> Result<(u32, u32)> {
        if asset.mime == ImageMime::Webp {
            return Err(Error::UnsupportedImage(format!(
                "`{}` is webp; only png and jpeg can be embedded",
                asset.name
            )));
        }
        if let Some(d) = self.dims.get(&asset.id) {
            return Ok(*d);
        }
        let img = image::load_from_memory(&asset.data).map_err(|e| Error::ImageDecode {
            id: asset.id.clone(),
            reason: e.to_string(),
        })?;
        let dims = (img.width(), img.height());
        if dims.0 == 0 || dims.1 == 0 {
            return Err(Error::ImageDecode {
                id: asset.id.clone(),
                reason: "image has zero width or height".to_string(),
            });
        }
        self.dims.insert(asset.id.clone(), dims);
        Ok(dims)
    }
}

impl ImageAsset {
    /// Ingest an image file into a gallery-placed asset. The format is
    /// sniffed from magic bytes; WebP and unrecognized formats are rejected
    /// here, before the manifest ever carries them.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mime = match sniff_mime(&data) {
            Some(ImageMime::Webp) => {
                return Err(Error::UnsupportedImage(format!(
                    "`{}` is webp; only png and jpeg can be embedded",
                    path.display()
                )))
            }
            Some(mime) => mime,
            None => {
                return Err(Error::UnsupportedImage(format!(
                    "`{}` is not a recognized png or jpeg file",
                    path.display()
                )))
            }
        };

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let id = format!("img-{:016x}", hasher.finish());

        Ok(ImageAsset {
            id,
            name,
            size_bytes: data.len() as u64,
            data,
            mime,
            include: true,
            caption: None,
            placement: None,
        })
    }
}

/// Identify PNG/JPEG/WebP from leading magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<ImageMime> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageMime::Png);
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageMime::Jpeg);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(ImageMime::Webp);
    }
    None
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
