use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{AssetPayload, AssetRecord, AssetType};

/// Per-server directory of cachable assets.
///
/// File names are `{type}-{last_modified}-{escaped path}` so the whole index
/// can be rebuilt from a directory listing.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn open(root: &Path, server_address: &str) -> io::Result<Self> {
        let dir = root.join(escape(&server_address.replace(':', "_p")));
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, record: &AssetRecord) -> PathBuf {
        self.dir.join(file_name(
            record.asset_type(),
            record.last_modified,
            &record.path,
        ))
    }

    /// Reads every stored asset. Unreadable or unrecognised files are removed.
    pub fn load(&self) -> Vec<AssetRecord> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to read asset cache {:?}: {}", self.dir, e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let file_path = entry.path();
            if file_path.is_dir() {
                continue;
            }

            let parsed = entry
                .file_name()
                .to_str()
                .and_then(parse_file_name)
                .and_then(|(asset_type, last_modified, path)| {
                    let bytes = fs::read(&file_path).ok()?;
                    let payload = AssetPayload::decode(&path, asset_type, bytes).ok()?;
                    Some(AssetRecord {
                        path,
                        last_modified,
                        cachable: true,
                        payload,
                    })
                });

            match parsed {
                Some(record) => records.push(record),
                None => {
                    log::warn!("Removing invalid cache file {:?}", file_path);
                    let _ = fs::remove_file(&file_path);
                }
            }
        }

        log::debug!("Loaded {} cached assets from {:?}", records.len(), self.dir);
        records
    }

    pub fn store(&self, record: &AssetRecord) -> io::Result<()> {
        fs::write(self.file_path(record), record.payload.as_bytes())
    }

    pub fn delete(&self, record: &AssetRecord) -> io::Result<()> {
        match fs::remove_file(self.file_path(record)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn file_name(asset_type: AssetType, last_modified: u64, path: &str) -> String {
    format!("{}-{}-{}", asset_type as u8, last_modified, escape(path))
}

fn parse_file_name(name: &str) -> Option<(AssetType, u64, String)> {
    let mut parts = name.splitn(3, '-');
    let asset_type = AssetType::from_u8(parts.next()?.parse().ok()?)?;
    let last_modified = parts.next()?.parse().ok()?;
    let path = unescape(parts.next()?)?;
    Some((asset_type, last_modified, path))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn unescape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("overnet-disk-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_escape_round_trip() {
        let path = "/server/my dir/ü-1.png";
        let escaped = escape(path);
        assert!(!escaped.contains('/'));
        assert_eq!(unescape(&escaped).as_deref(), Some(path));
    }

    #[test]
    fn test_file_name_parse() {
        let name = file_name(AssetType::Audio, 42, "/server/a-b.ogg");
        assert_eq!(
            parse_file_name(&name),
            Some((AssetType::Audio, 42, "/server/a-b.ogg".to_string()))
        );
        assert_eq!(parse_file_name("garbage"), None);
    }

    #[test]
    fn test_store_load_delete() {
        let root = temp_root("store");
        let cache = DiskCache::open(&root, "127.0.0.1:8765").unwrap();
        let record = AssetRecord {
            path: "/server/hello.txt".to_string(),
            last_modified: 7,
            cachable: true,
            payload: AssetPayload::Text("hello".into()),
        };

        cache.store(&record).unwrap();
        fs::write(cache.dir().join("not-a-cache-file"), b"x").unwrap();

        let loaded = cache.load();
        assert_eq!(loaded, vec![record.clone()]);
        // the invalid file was cleaned up
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 1);

        cache.delete(&record).unwrap();
        assert!(cache.load().is_empty());

        let _ = fs::remove_dir_all(root);
    }
}
