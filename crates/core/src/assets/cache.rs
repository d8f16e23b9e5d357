use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{
    AssetError, AssetPayload, AssetRecord, AssetType, DiskCache, IncomingAssetTransfer,
    is_server_path,
};

/// Assets pushed by the current server, plus the single in-flight stream.
#[derive(Debug, Default)]
pub struct AssetStreamCache {
    records: HashMap<String, AssetRecord>,
    transfer: Option<IncomingAssetTransfer>,
    disk: Option<DiskCache>,
    local_root: Option<PathBuf>,
}

impl AssetStreamCache {
    pub fn new(local_root: Option<PathBuf>) -> Self {
        Self {
            local_root,
            ..Default::default()
        }
    }

    /// Cache backed by a directory; everything already stored there is loaded
    /// up front.
    pub fn with_disk(disk: DiskCache, local_root: Option<PathBuf>) -> Self {
        let records = disk
            .load()
            .into_iter()
            .map(|record| (record.path.clone(), record))
            .collect();

        Self {
            records,
            transfer: None,
            disk: Some(disk),
            local_root,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records.values()
    }

    /// True when a record for `path` exists that is at least as new as
    /// `last_modified`.
    pub fn has_fresh(&self, path: &str, last_modified: u64) -> bool {
        self.records
            .get(path)
            .is_some_and(|record| record.last_modified >= last_modified)
    }

    /// Everything the server can skip re-sending, as `(path, last_modified)`.
    pub fn announcements(&self) -> Vec<(String, u64)> {
        let mut announced: Vec<_> = self
            .records
            .values()
            .map(|record| (record.path.clone(), record.last_modified))
            .collect();
        announced.sort();
        announced
    }

    pub fn transfer(&self) -> Option<&IncomingAssetTransfer> {
        self.transfer.as_ref()
    }

    /// Opens a new transfer. An unfinished one is abandoned.
    pub fn begin_stream(
        &mut self,
        path: String,
        last_modified: u64,
        cachable: bool,
        asset_type: AssetType,
        size: u64,
    ) -> Result<Option<String>, AssetError> {
        if let Some(previous) = self.transfer.take() {
            log::warn!(
                "Abandoning transfer of {} at {}/{} bytes",
                previous.path,
                previous.received(),
                previous.expected_size
            );
        }

        log::debug!(
            "Receiving {} {} ({} bytes)",
            asset_type.as_str(),
            path,
            size
        );
        self.transfer = Some(IncomingAssetTransfer::new(
            path,
            last_modified,
            cachable,
            asset_type,
            size,
        ));

        self.try_finish()
    }

    /// Appends to the active transfer. Returns the finished path once the
    /// declared size is reached.
    pub fn append_chunk(&mut self, bytes: &[u8]) -> Result<Option<String>, AssetError> {
        let transfer = self.transfer.as_mut().ok_or(AssetError::NoActiveTransfer)?;
        transfer.data.extend_from_slice(bytes);
        self.try_finish()
    }

    fn try_finish(&mut self) -> Result<Option<String>, AssetError> {
        if !self.transfer.as_ref().is_some_and(|t| t.is_complete()) {
            return Ok(None);
        }
        let Some(transfer) = self.transfer.take() else {
            return Ok(None);
        };

        let received = transfer.received();
        if received > transfer.expected_size {
            return Err(AssetError::SizeMismatch {
                expected: transfer.expected_size,
                actual: received,
                path: transfer.path,
            });
        }

        let payload = AssetPayload::decode(&transfer.path, transfer.asset_type, transfer.data)?;
        let path = transfer.path.clone();
        self.insert(AssetRecord {
            path: transfer.path,
            last_modified: transfer.last_modified,
            cachable: transfer.cachable,
            payload,
        });

        Ok(Some(path))
    }

    /// Adds or replaces a record, persisting it when cachable.
    pub fn insert(&mut self, record: AssetRecord) {
        if let Some(old) = self.records.remove(&record.path) {
            self.delete_file(&old);
        }

        if record.cachable
            && let Some(disk) = &self.disk
            && let Err(e) = disk.store(&record)
        {
            log::warn!("Failed to persist {}: {}", record.path, e);
        }

        self.records.insert(record.path.clone(), record);
    }

    pub fn remove(&mut self, path: &str) -> Option<AssetRecord> {
        let record = self.records.remove(path)?;
        self.delete_file(&record);
        Some(record)
    }

    fn delete_file(&self, record: &AssetRecord) {
        if let Some(disk) = &self.disk
            && let Err(e) = disk.delete(record)
        {
            log::warn!("Failed to delete cached {}: {}", record.path, e);
        }
    }

    /// Server paths come from the cache only. Other paths are read from the
    /// local content root.
    pub fn get(&self, path: &str) -> Option<AssetRecord> {
        if is_server_path(path) {
            return self.records.get(path).cloned();
        }

        let file = self.local_file(path)?;
        let bytes = fs::read(&file).ok()?;
        let payload = AssetPayload::decode(path, AssetType::from_extension(path), bytes).ok()?;
        Some(AssetRecord {
            path: path.to_string(),
            last_modified: 0,
            cachable: false,
            payload,
        })
    }

    /// On-disk location of an asset, if it has one.
    pub fn get_path(&self, path: &str) -> Option<PathBuf> {
        if is_server_path(path) {
            let record = self.records.get(path)?;
            let disk = self.disk.as_ref()?;
            return record.cachable.then(|| disk.file_path(record));
        }
        self.local_file(path).filter(|file| file.is_file())
    }

    fn local_file(&self, path: &str) -> Option<PathBuf> {
        let root = self.local_root.as_ref()?;
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            log::warn!("Refusing local asset path {:?}", path);
            return None;
        }
        Some(root.join(relative))
    }

    pub fn text(&self, path: &str) -> Option<Arc<str>> {
        match self.get(path)?.payload {
            AssetPayload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn texture(&self, path: &str) -> Option<Arc<[u8]>> {
        match self.get(path)?.payload {
            AssetPayload::Texture(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn audio(&self, path: &str) -> Option<Arc<[u8]>> {
        match self.get(path)?.payload {
            AssetPayload::Audio(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn data(&self, path: &str) -> Option<Arc<[u8]>> {
        match self.get(path)?.payload {
            AssetPayload::Data(bytes) => Some(bytes),
            _ => None,
        }
    }
}
