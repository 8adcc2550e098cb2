//! Archive fetcher
//!
//! Retrieves a dataset's compressed snapshot into the local cache. Downloads
//! stream to a `.part` file and are atomically renamed into place on success,
//! so a partial download is never mistaken for a complete archive.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::models::Dataset;

/// HTTP client for retrieving snapshot archives
pub struct ArchiveFetcher {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
    max_retries: u32,
    retry_delay: Duration,
}

impl ArchiveFetcher {
    /// Create a new fetcher from the import configuration
    pub fn new(config: &ImportConfig) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent("cdp-import/0.1")
            .build()
            .map_err(|e| ImportError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache_dir: config.cache_dir.clone(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Remote URL of a dataset's archive
    pub fn archive_url(&self, dataset: Dataset) -> String {
        format!("{}/{}", self.base_url, dataset.archive_name())
    }

    /// Local cache path of a dataset's archive
    pub fn cache_path(&self, dataset: Dataset) -> PathBuf {
        self.cache_dir.join(dataset.archive_name())
    }

    /// Fetch a dataset's archive into the cache and return its local path
    ///
    /// With `skip_download` set, an existing cached file is trusted as-is and
    /// returned without any network call. Otherwise the archive is downloaded
    /// with bounded retry; once the attempts are exhausted the dataset is
    /// abandoned with a fetch error.
    pub async fn fetch(&self, dataset: Dataset, skip_download: bool) -> Result<PathBuf, ImportError> {
        let target = self.cache_path(dataset);

        if skip_download && target.is_file() {
            info!(dataset = %dataset, path = %target.display(), "Reusing cached archive");
            return Ok(target);
        }

        let url = self.archive_url(dataset);
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| ImportError::Fetch {
                dataset,
                url: url.clone(),
                reason: format!("failed to create cache directory: {e}"),
            })?;

        for attempt in 1..=self.max_retries {
            debug!(dataset = %dataset, attempt, max = self.max_retries, url = %url, "Download attempt");

            match self.download_once(&url, &target).await {
                Ok(bytes) => {
                    info!(
                        dataset = %dataset,
                        bytes,
                        path = %target.display(),
                        "Successfully downloaded archive"
                    );
                    self.log_fingerprint(dataset, &target).await;
                    return Ok(target);
                },
                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = self.retry_delay * attempt;
                        warn!(
                            dataset = %dataset,
                            attempt,
                            max = self.max_retries,
                            error = %e,
                            "Download failed, retrying in {:.1}s",
                            delay.as_secs_f64()
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(ImportError::Fetch {
                            dataset,
                            url,
                            reason: format!("{e:#} (after {} attempts)", self.max_retries),
                        });
                    }
                },
            }
        }

        unreachable!("Retry loop should always return")
    }

    /// Stream one download to `<target>.part`, then atomically rename
    async fn download_once(&self, url: &str, target: &Path) -> Result<u64> {
        let part_path = target.with_extension("gz.part");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("server returned an error status")?;

        let mut file = tokio::fs::File::create(&part_path)
            .await
            .with_context(|| format!("failed to create {}", part_path.display()))?;

        let mut bytes_written = 0u64;
        while let Some(chunk) = response.chunk().await.context("failed to read body chunk")? {
            file.write_all(&chunk)
                .await
                .context("failed to write archive chunk")?;
            bytes_written += chunk.len() as u64;
        }

        file.flush().await.context("failed to flush archive")?;
        drop(file);

        tokio::fs::rename(&part_path, target)
            .await
            .with_context(|| format!("failed to move archive into place at {}", target.display()))?;

        Ok(bytes_written)
    }

    /// Compute and log the archive's SHA-256 fingerprint; failures here only
    /// warn, the archive itself is already in place.
    async fn log_fingerprint(&self, dataset: Dataset, path: &Path) {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || cdp_common::checksum::sha256_file(&owned)).await {
            Ok(Ok(digest)) => {
                info!(dataset = %dataset, sha256 = %digest, "Archive fingerprint");
            },
            Ok(Err(e)) => warn!(dataset = %dataset, error = %e, "Failed to fingerprint archive"),
            Err(e) => warn!(dataset = %dataset, error = %e, "Fingerprint task panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, cache_dir: &Path) -> ImportConfig {
        let mut config = ImportConfig::default();
        config.base_url = base_url.to_string();
        config.cache_dir = cache_dir.to_path_buf();
        config.retry_delay_ms = 10;
        config
    }

    #[tokio::test]
    async fn test_skip_download_reuses_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("courts.jsonl.gz"), b"cached").unwrap();

        // Unroutable base URL: any network call would fail the test.
        let config = test_config("http://127.0.0.1:1", dir.path());
        let fetcher = ArchiveFetcher::new(&config).unwrap();

        let path = fetcher.fetch(Dataset::Courts, true).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_download_writes_archive_atomically() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courts.jsonl.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());
        let fetcher = ArchiveFetcher::new(&config).unwrap();

        let path = fetcher.fetch(Dataset::Courts, false).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"archive-bytes");
        // No leftover partial file
        assert!(!path.with_extension("gz.part").exists());
    }

    #[tokio::test]
    async fn test_download_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/judges.jsonl.gz"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/judges.jsonl.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());
        let fetcher = ArchiveFetcher::new(&config).unwrap();

        let path = fetcher.fetch(Dataset::Judges, false).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_download_fails_after_retries_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courts.jsonl.gz"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());
        let fetcher = ArchiveFetcher::new(&config).unwrap();

        let err = fetcher.fetch(Dataset::Courts, false).await.unwrap_err();
        assert!(matches!(err, ImportError::Fetch { .. }));
        assert!(err.is_fatal());
    }
}
