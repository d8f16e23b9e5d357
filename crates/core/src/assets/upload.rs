/// Kind tag on client-to-server asset streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UploadAssetType {
    Texture = 0,
    Animation = 1,
    MugshotTexture = 2,
    MugshotAnimation = 3,
}

impl UploadAssetType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Texture),
            1 => Some(Self::Animation),
            2 => Some(Self::MugshotTexture),
            3 => Some(Self::MugshotAnimation),
            _ => None,
        }
    }
}

/// Splits `data` into pieces no larger than `max_chunk`. Empty input still
/// yields one empty chunk so the receiver sees the stream.
pub fn split_chunks(data: &[u8], max_chunk: usize) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![data];
    }
    data.chunks(max_chunk.max(1)).collect()
}
