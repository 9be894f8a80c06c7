// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed fetch cache (§4.3 step 2): the destination directory for
//! a source is keyed by the raw source string, not by its parsed URL, so
//! re-fetching the same `Source` is a cache hit even across evaluator
//! fragments.

use crate::error::EvalError;
use base64::Engine;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Where fetched sources live: `<cache_root>/sources/<base64url(src)>`.
pub struct SourceCache {
    cache_root: PathBuf,
}

impl SourceCache {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self { cache_root: cache_root.into() }
    }

    fn dest_for(&self, raw_src: &str) -> PathBuf {
        let key = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw_src);
        self.cache_root.join("sources").join(key)
    }

    /// Fetch `raw_src` (the full source string, including any `#evaluator`
    /// fragment) into the cache if it isn't already there, and return the
    /// local path evaluators should be invoked against.
    pub async fn fetch(&self, raw_src: &str, fetch_url: &str) -> Result<PathBuf, EvalError> {
        let dest = self.dest_for(raw_src);
        if tokio::fs::metadata(&dest).await.is_ok() {
            return Ok(dest);
        }

        let parent = dest
            .parent()
            .ok_or_else(|| EvalError::Fetch(format!("no parent for cache dest: {}", dest.display())))?;
        tokio::fs::create_dir_all(parent).await?;

        if let Some(path) = fetch_url.strip_prefix("file://") {
            copy_dir(Path::new(path), &dest).await?;
        } else if fetch_url.starts_with("http://") || fetch_url.starts_with("https://") {
            fetch_http(fetch_url, &dest).await?;
        } else {
            return Err(EvalError::Fetch(format!("unsupported source scheme: {fetch_url}")));
        }

        Ok(dest)
    }
}

async fn copy_dir(src: &Path, dest: &Path) -> Result<(), EvalError> {
    tokio::fs::create_dir_all(dest).await?;
    let mut entries = tokio::fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let dest_path = dest.join(entry.file_name());
        if file_type.is_dir() {
            Box::pin(copy_dir(&entry.path(), &dest_path)).await?;
        } else {
            tokio::fs::copy(entry.path(), &dest_path).await?;
        }
    }
    Ok(())
}

async fn fetch_http(url: &str, dest: &Path) -> Result<(), EvalError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;
    let file_name = url.rsplit('/').next().unwrap_or("source");
    tokio::fs::create_dir_all(dest).await?;
    let mut file = tokio::fs::File::create(dest.join(file_name)).await?;
    file.write_all(&bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_from_file_scheme_is_idempotent() {
        let src_dir = tempfile::tempdir().unwrap();
        tokio::fs::write(src_dir.path().join("action.py"), b"print(1)").await.unwrap();

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(cache_dir.path());
        let fetch_url = format!("file://{}", src_dir.path().display());
        let raw = format!("{fetch_url}#python");

        let first = cache.fetch(&raw, &fetch_url).await.unwrap();
        assert!(first.join("action.py").exists());

        let second = cache.fetch(&raw, &fetch_url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn distinct_raw_sources_get_distinct_destinations() {
        let src_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(cache_dir.path());
        let fetch_url = format!("file://{}", src_dir.path().display());

        let a = cache.fetch(&format!("{fetch_url}#python"), &fetch_url).await.unwrap();
        let b = cache.fetch(&format!("{fetch_url}#bash"), &fetch_url).await.unwrap();
        assert_ne!(a, b);
    }
}
