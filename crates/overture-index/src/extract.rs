//! Default `composer.json` extractor for zip archives.

use crate::error::{IndexError, Result};
use crate::store::ZipMetadataExtractor;
use overture_core::json::{JsonMap, parse_object};
use std::io::{Cursor, Read};
use tracing::trace;

const COMPOSER_JSON: &str = "composer.json";

/// Reads the first `composer.json` found at the archive root or exactly one
/// directory deep (the layout of GitHub-style `vendor-project-sha/` archives).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipComposerJsonExtractor;

impl ZipComposerJsonExtractor {
    /// Create a new extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn is_composer_json(entry: &str) -> bool {
        match entry.find('/') {
            None => entry == COMPOSER_JSON,
            Some(slash) => {
                let rest = &entry[slash + 1..];
                slash > 0 && rest == COMPOSER_JSON
            }
        }
    }
}

impl ZipMetadataExtractor for ZipComposerJsonExtractor {
    fn extract(&self, archive: &[u8]) -> Result<JsonMap> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive))
            .map_err(|e| IndexError::extraction(e.to_string()))?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| IndexError::extraction(e.to_string()))?;
            if entry.is_dir() || !Self::is_composer_json(entry.name()) {
                continue;
            }
            trace!(entry = entry.name(), "reading composer.json");
            let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry
                .read_to_end(&mut buf)
                .map_err(|e| IndexError::extraction(e.to_string()))?;
            return parse_object(&buf).map_err(|e| IndexError::extraction(e.to_string()));
        }

        Err(IndexError::extraction("archive contains no composer.json"))
    }
}
