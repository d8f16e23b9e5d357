use std::path::PathBuf;
use std::sync::Arc;

use super::AssetStreamCache;

/// Read access to assets for loaders and renderers. Passed explicitly; there
/// is no global asset registry.
pub trait AssetProvider {
    fn get_text(&self, path: &str) -> Option<Arc<str>>;
    fn get_texture(&self, path: &str) -> Option<Arc<[u8]>>;
    fn get_audio(&self, path: &str) -> Option<Arc<[u8]>>;
    fn get_data(&self, path: &str) -> Option<Arc<[u8]>>;
    /// Filesystem location, for loaders that want to open the file themselves.
    fn get_path(&self, path: &str) -> Option<PathBuf>;
}

impl AssetProvider for AssetStreamCache {
    fn get_text(&self, path: &str) -> Option<Arc<str>> {
        self.text(path)
    }

    fn get_texture(&self, path: &str) -> Option<Arc<[u8]>> {
        self.texture(path)
    }

    fn get_audio(&self, path: &str) -> Option<Arc<[u8]>> {
        self.audio(path)
    }

    fn get_data(&self, path: &str) -> Option<Arc<[u8]>> {
        self.data(path)
    }

    fn get_path(&self, path: &str) -> Option<PathBuf> {
        AssetStreamCache::get_path(self, path)
    }
}
