use super::AssetType;

/// The one stream currently being received.
#[derive(Debug, Clone)]
pub struct IncomingAssetTransfer {
    pub path: String,
    pub last_modified: u64,
    pub cachable: bool,
    pub asset_type: AssetType,
    pub expected_size: u64,
    pub data: Vec<u8>,
}

impl IncomingAssetTransfer {
    pub fn new(
        path: String,
        last_modified: u64,
        cachable: bool,
        asset_type: AssetType,
        expected_size: u64,
    ) -> Self {
        // cap the preallocation, the size is server-supplied
        let capacity = expected_size.min(1 << 20) as usize;
        Self {
            path,
            last_modified,
            cachable,
            asset_type,
            expected_size,
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn received(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.received() >= self.expected_size
    }

    pub fn progress(&self) -> f32 {
        if self.expected_size == 0 {
            1.0
        } else {
            (self.received() as f32 / self.expected_size as f32).min(1.0)
        }
    }
}
