use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model not found at {0} and no download URL configured")]
    NotFound(PathBuf),
    #[error("model path has no file name: {0}")]
    NoFileName(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download failed for {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a configured model path, downloading it when missing.
///
/// Resolution order:
/// 1. The configured path itself
/// 2. A file with the same name in the user cache directory
/// 3. Download from `url` into the cache directory
pub fn resolve(
    path: &Path,
    url: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(path, url, &model_cache_dir()?, progress)
}

fn resolve_in(
    path: &Path,
    url: Option<&str>,
    cache_dir: &Path,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }

    let name = path
        .file_name()
        .ok_or_else(|| ModelResolveError::NoFileName(path.to_path_buf()))?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::info!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    let url = url.ok_or_else(|| ModelResolveError::NotFound(path.to_path_buf()))?;
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading model {url} to {}", cached_path.display());
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/handsign/models/`
/// - Linux: `$XDG_CACHE_HOME/handsign/models/` or `~/.cache/handsign/models/`
/// - Windows: `%LOCALAPPDATA%/handsign/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("handsign").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("handsign").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    // Staged next to the destination; the rename publishes it.
    let staging = dest.with_extension("part");
    let result = stream_to(url, &staging, progress).and_then(|()| {
        fs::rename(&staging, dest).map_err(|e| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn stream_to(url: &str, path: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url).map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(ModelResolveError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let write_err = |e| ModelResolveError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(path).map_err(write_err)?;
    let mut buf = vec![0u8; 1024 * 1024];
    let mut downloaded: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(cb) = &progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_existing_path_is_returned_as_is() {
        let tmp = TempDir::new().unwrap();
        let model_path = tmp.path().join("classifier.onnx");
        fs::write(&model_path, b"fake model data").unwrap();

        let resolved = resolve_in(&model_path, None, &tmp.path().join("cache"), None).unwrap();
        assert_eq!(resolved, model_path);
    }

    #[test]
    fn test_cached_copy_is_used_when_path_missing() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("hand.onnx"), b"cached").unwrap();

        let resolved = resolve_in(
            &tmp.path().join("missing").join("hand.onnx"),
            None,
            &cache,
            None,
        )
        .unwrap();
        assert_eq!(resolved, cache.join("hand.onnx"));
    }

    #[test]
    fn test_missing_without_url_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_in(
            &tmp.path().join("nope.onnx"),
            None,
            &tmp.path().join("cache"),
            None,
        );
        assert!(matches!(result, Err(ModelResolveError::NotFound(_))));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("handsign"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_invalid_url_returns_error() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
