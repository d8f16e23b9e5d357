//! Server-pushed asset cache.
//!
//! Paths under [`SERVER_PREFIX`] are owned by the server and arrive through
//! chunked streams; anything else resolves against the local content root.

mod cache;
mod disk;
mod provider;
mod transfer;
mod upload;

use std::io;
use std::sync::Arc;

pub use cache::AssetStreamCache;
pub use disk::DiskCache;
pub use provider::AssetProvider;
pub use transfer::IncomingAssetTransfer;
pub use upload::{UploadAssetType, split_chunks};

pub const SERVER_PREFIX: &str = "/server/";

pub fn is_server_path(path: &str) -> bool {
    path.starts_with(SERVER_PREFIX)
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset chunk received with no active transfer")]
    NoActiveTransfer,
    #[error("asset {path} overran its declared size: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
    #[error("text asset {path} is not valid utf-8")]
    InvalidText { path: String },
    #[error("asset io: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AssetType {
    Text = 0,
    Texture = 1,
    Audio = 2,
    Data = 3,
}

impl AssetType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Text),
            1 => Some(Self::Texture),
            2 => Some(Self::Audio),
            3 => Some(Self::Data),
            _ => None,
        }
    }

    /// Guess used for preloads and local files.
    pub fn from_extension(path: &str) -> Self {
        let extension = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "ogg" | "wav" | "flac" | "mp3" => Self::Audio,
            "png" | "bmp" => Self::Texture,
            "zip" | "bin" => Self::Data,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Texture => "texture",
            Self::Audio => "audio",
            Self::Data => "data",
        }
    }
}

/// Decoded contents. Handles are shared and immutable.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Text(Arc<str>),
    Texture(Arc<[u8]>),
    Audio(Arc<[u8]>),
    Data(Arc<[u8]>),
}

impl AssetPayload {
    pub fn decode(path: &str, asset_type: AssetType, bytes: Vec<u8>) -> Result<Self, AssetError> {
        Ok(match asset_type {
            AssetType::Text => {
                let text = String::from_utf8(bytes).map_err(|_| AssetError::InvalidText {
                    path: path.to_string(),
                })?;
                Self::Text(text.into())
            }
            AssetType::Texture => Self::Texture(bytes.into()),
            AssetType::Audio => Self::Audio(bytes.into()),
            AssetType::Data => Self::Data(bytes.into()),
        })
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            Self::Text(_) => AssetType::Text,
            Self::Texture(_) => AssetType::Texture,
            Self::Audio(_) => AssetType::Audio,
            Self::Data(_) => AssetType::Data,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Texture(bytes) | Self::Audio(bytes) | Self::Data(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub path: String,
    pub last_modified: u64,
    pub cachable: bool,
    pub payload: AssetPayload,
}

impl AssetRecord {
    pub fn asset_type(&self) -> AssetType {
        self.payload.asset_type()
    }
}
