// Thumbnail Index
// Optional map from cue timestamps to pre-extracted frames. Only the handle is
// stored in the catalog; serving the image belongs to the web layer.

use crate::error::{CatalogError, Result};
use crate::models::Timestamp;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_THUMBNAIL_PREFIX: &str = "/api/thumbnail/";

#[derive(Debug, Clone)]
pub struct ThumbnailIndex {
    prefix: String,
    frames: BTreeMap<Timestamp, String>,
}

impl ThumbnailIndex {
    pub fn empty() -> Self {
        Self {
            prefix: DEFAULT_THUMBNAIL_PREFIX.to_string(),
            frames: BTreeMap::new(),
        }
    }

    /// Build from `timestamp -> image path` pairs; unparseable timestamps are skipped
    pub fn from_map(raw: BTreeMap<String, String>, prefix: &str) -> Self {
        let mut frames = BTreeMap::new();
        for (key, path) in raw {
            let Some(file_name) = Path::new(path.trim())
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
            else {
                warn!(timestamp = %key, "thumbnail entry has no file name, skipped");
                continue;
            };
            match key.parse::<Timestamp>() {
                Ok(ts) => {
                    frames.insert(ts, file_name);
                }
                Err(e) => warn!(error = %e, "thumbnail entry skipped"),
            }
        }
        Self {
            prefix: prefix.to_string(),
            frames,
        }
    }

    pub fn load(path: &Path, prefix: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let map: BTreeMap<String, String> = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_map(map, prefix))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Handle for the first frame captured within `[start, end]`
    pub fn lookup(&self, start: Timestamp, end: Timestamp) -> Option<String> {
        if end < start {
            return None;
        }
        self.frames
            .range(start..=end)
            .next()
            .map(|(_, file)| format!("{}{}", self.prefix, file))
    }
}
