//! Font handles
//!
//! A [`FontHandle`] is what the rendering side consumes: a local path that has
//! been checked to contain a loadable font, plus the naming metadata read from
//! it. Constructing one is also how cached files are validated.

pub mod container;

use std::fs;
use std::path::{Path, PathBuf};
use ttf_parser::{name_id, Face};

use crate::error::{FontError, Result};

/// On-disk font container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFormat {
    /// TrueType outlines (`0x00010000` or `true`)
    TrueType,
    /// CFF outlines (`OTTO`)
    OpenType,
    /// TrueType collection (`ttcf`)
    Collection,
    Woff,
    Woff2,
    /// Embedded OpenType
    Eot,
}

impl FontFormat {
    /// Detect the container from its leading bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        let magic = data.get(0..4)?;
        match magic {
            b"\x00\x01\x00\x00" | b"true" => Some(FontFormat::TrueType),
            b"OTTO" => Some(FontFormat::OpenType),
            b"ttcf" => Some(FontFormat::Collection),
            b"wOFF" => Some(FontFormat::Woff),
            b"wOF2" => Some(FontFormat::Woff2),
            _ if container::looks_like_eot(data) => Some(FontFormat::Eot),
            _ => None,
        }
    }

    /// Conventional file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FontFormat::TrueType => "ttf",
            FontFormat::OpenType => "otf",
            FontFormat::Collection => "ttc",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
            FontFormat::Eot => "eot",
        }
    }
}

/// Naming and style information read from the font's tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceInfo {
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub weight: u16,
    pub italic: bool,
}

/// Validated local font file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    path: PathBuf,
    format: FontFormat,
    info: Option<FaceInfo>,
}

impl FontHandle {
    /// Load and validate the font at `path`
    ///
    /// Fails with [`FontError::FileNotFound`] when the path does not exist and
    /// with [`FontError::Load`] when its bytes are not a recognizable font.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FontError::FileNotFound(path.to_path_buf()));
        }

        let data = fs::read(path).map_err(|e| load_error(path, e.to_string()))?;
        Self::from_bytes(path, &data)
    }

    /// Validate `data` as the content of `path`
    pub fn from_bytes(path: impl Into<PathBuf>, data: &[u8]) -> Result<Self> {
        let path = path.into();
        let format = FontFormat::sniff(data)
            .ok_or_else(|| load_error(&path, "unrecognized font signature".to_string()))?;

        let info = match format {
            FontFormat::TrueType | FontFormat::OpenType | FontFormat::Collection => {
                Some(parse_sfnt(data).map_err(|reason| load_error(&path, reason))?)
            }
            FontFormat::Woff => {
                let sfnt = container::decode_woff(data).map_err(|reason| load_error(&path, reason))?;
                Some(parse_sfnt(&sfnt).map_err(|reason| load_error(&path, reason))?)
            }
            FontFormat::Woff2 => {
                let sfnt = container::decode_woff2(data).map_err(|reason| load_error(&path, reason))?;
                Some(parse_sfnt(&sfnt).map_err(|reason| load_error(&path, reason))?)
            }
            FontFormat::Eot => {
                match container::eot_payload(data).map_err(|reason| load_error(&path, reason))? {
                    Some(sfnt) => Some(parse_sfnt(sfnt).map_err(|reason| load_error(&path, reason))?),
                    None => None,
                }
            }
        };

        Ok(Self { path, format, info })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn format(&self) -> FontFormat {
        self.format
    }

    /// Family name (`name` table ID 1), e.g. "Roboto"
    pub fn family_name(&self) -> Option<&str> {
        self.info.as_ref()?.family.as_deref()
    }

    /// Subfamily name (`name` table ID 2), e.g. "Bold Italic"
    pub fn style_name(&self) -> Option<&str> {
        self.info.as_ref()?.subfamily.as_deref()
    }

    /// Weight class from `OS/2`, 400 when the table is absent
    pub fn weight(&self) -> Option<u16> {
        self.info.as_ref().map(|i| i.weight)
    }

    pub fn is_italic(&self) -> Option<bool> {
        self.info.as_ref().map(|i| i.italic)
    }

    /// Metadata, unavailable for compressed or obfuscated EOT payloads
    pub fn info(&self) -> Option<&FaceInfo> {
        self.info.as_ref()
    }
}

fn load_error(path: &Path, reason: String) -> FontError {
    FontError::Load {
        path: path.to_path_buf(),
        reason,
    }
}

fn parse_sfnt(data: &[u8]) -> std::result::Result<FaceInfo, String> {
    let face = Face::parse(data, 0).map_err(|e| e.to_string())?;

    Ok(FaceInfo {
        family: name_entry(&face, name_id::FAMILY)
            .or_else(|| name_entry(&face, name_id::TYPOGRAPHIC_FAMILY)),
        subfamily: name_entry(&face, name_id::SUBFAMILY),
        weight: face.weight().to_number(),
        italic: face.is_italic(),
    })
}

fn name_entry(face: &Face<'_>, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == id)
        .find_map(|name| name.to_string())
}
