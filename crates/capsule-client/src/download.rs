//! Save a gallery image to local disk.
//!
//! The body is written to a temporary file in the target directory and
//! renamed into place once complete.  On any failure the temporary file is
//! removed when it drops.

use std::io::Write;
use std::path::{Path, PathBuf};

use capsule_shared::constants::DEFAULT_DOWNLOAD_NAME;
use tracing::{debug, info};

use crate::error::DownloadError;

#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
    dir: PathBuf,
}

impl Downloader {
    pub fn new(http: reqwest::Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch `url` and save it as `suggested_name` (or `memory.jpg`).
    /// Existing files are never overwritten; a numbered name is picked
    /// instead.  Returns the final path.
    pub async fn download(
        &self,
        url: &str,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf, DownloadError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        debug!(url, size = body.len(), "Downloaded image");

        let name = file_name(suggested_name);
        tokio::fs::create_dir_all(&self.dir).await?;
        let dir = self.dir.clone();
        let path = tokio::task::spawn_blocking(move || save(&dir, &name, &body))
            .await
            .map_err(std::io::Error::other)??;

        info!(path = %path.display(), "Image saved");
        Ok(path)
    }
}

fn save(dir: &Path, name: &str, body: &[u8]) -> Result<PathBuf, DownloadError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".capsule-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(body)?;
    tmp.flush()?;

    let target = free_path(dir, name);
    tmp.persist_noclobber(&target)?;
    Ok(target)
}

fn file_name(suggested: Option<&str>) -> String {
    let name = suggested
        .map(|s| s.trim().replace(['/', '\\'], "_"))
        .filter(|s| !s.is_empty() && s != "." && s != "..")
        .unwrap_or_default();
    if name.is_empty() {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        name
    }
}

// `memory.jpg`, `memory (1).jpg`, `memory (2).jpg`, ...
fn free_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".part"))
            .collect()
    }

    #[tokio::test]
    async fn test_download_saves_under_suggested_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gallery/1/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(reqwest::Client::new(), dir.path());
        let url = format!("{}/gallery/1/a.jpg", server.uri());

        let first = downloader.download(&url, Some("memory-7.jpg")).await.unwrap();
        assert_eq!(first, dir.path().join("memory-7.jpg"));
        assert_eq!(std::fs::read(&first).unwrap(), b"jpeg");

        let second = downloader.download(&url, Some("memory-7.jpg")).await.unwrap();
        assert_eq!(second, dir.path().join("memory-7 (1).jpg"));
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(reqwest::Client::new(), dir.path());
        let result = downloader
            .download(&format!("{}/missing.jpg", server.uri()), None)
            .await;

        assert!(matches!(result, Err(DownloadError::Status(404))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_file_name_defaults() {
        assert_eq!(file_name(None), "memory.jpg");
        assert_eq!(file_name(Some("  ")), "memory.jpg");
        assert_eq!(file_name(Some("..")), "memory.jpg");
        assert_eq!(file_name(Some("a/b.jpg")), "a_b.jpg");
    }
}
