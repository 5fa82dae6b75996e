//! Locates cascade XML files, downloading them into the user cache when
//! no local copy exists.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("cascade file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write cascade to {path}: {source}")]
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

/// Where to look for one cascade file.
pub struct ModelRequest<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// User-supplied path; when set it must exist and nothing else is tried.
    pub explicit: Option<&'a Path>,
    pub bundled_dir: Option<&'a Path>,
}

/// Resolve a cascade file.
///
/// Resolution order:
/// 1. Explicit path (error if missing)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from URL to cache
pub fn resolve(request: &ModelRequest<'_>, progress: Option<ProgressFn>) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = request.explicit {
        return explicit_path(path);
    }
    resolve_in(&model_cache_dir()?, request, progress)
}

fn explicit_path(path: &Path) -> Result<PathBuf, ModelResolveError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ModelResolveError::Missing(path.to_path_buf()))
    }
}

fn resolve_in(
    cache_dir: &Path,
    request: &ModelRequest<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = request.explicit {
        return explicit_path(path);
    }

    let cached_path = cache_dir.join(request.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = request.bundled_dir {
        let bundled_path = dir.join(request.name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    log::info!("Downloading {} from {}", request.name, request.url);
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(request.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific cascade cache directory.
///
/// - macOS: `~/Library/Application Support/EyeTrack/cascades/`
/// - Linux: `$XDG_CACHE_HOME/EyeTrack/cascades/` or `~/.cache/EyeTrack/cascades/`
/// - Windows: `%LOCALAPPDATA%/EyeTrack/cascades/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("EyeTrack").join("cascades"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = download_inner(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BAD_URL: &str = "http://invalid.nonexistent.example.com/cascade.xml";

    fn request<'a>(explicit: Option<&'a Path>, bundled_dir: Option<&'a Path>) -> ModelRequest<'a> {
        ModelRequest {
            name: "haarcascade_test.xml",
            url: BAD_URL,
            explicit,
            bundled_dir,
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("mine.xml");
        fs::write(&explicit, b"<opencv_storage/>").unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("haarcascade_test.xml"), b"cached").unwrap();

        let path = resolve_in(&cache, &request(Some(&explicit), None), None).unwrap();
        assert_eq!(path, explicit);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("absent.xml");
        let err = resolve(&request(Some(&explicit), None), None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == explicit));
    }

    #[test]
    fn test_cache_checked_before_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("haarcascade_test.xml"), b"cached").unwrap();
        fs::write(bundled.join("haarcascade_test.xml"), b"bundled").unwrap();

        let path = resolve_in(&cache, &request(None, Some(&bundled)), None).unwrap();
        assert_eq!(path, cache.join("haarcascade_test.xml"));
    }

    #[test]
    fn test_bundled_used_when_not_cached() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("haarcascade_test.xml"), b"bundled").unwrap();

        let path = resolve_in(&cache, &request(None, Some(&bundled)), None).unwrap();
        assert_eq!(path, bundled.join("haarcascade_test.xml"));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("EyeTrack"));
        assert!(path.ends_with("cascades"));
    }

    #[test]
    fn test_download_invalid_url_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let result = resolve_in(&cache, &request(None, None), None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));

        let dest = cache.join("haarcascade_test.xml");
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
