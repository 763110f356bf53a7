use crate::game::installer::error::InstallError;
use crate::game::installer::types::ProgressReporter;
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const READ_CHUNK_SIZE: usize = 32 * 1024;

/// `<path>.tmp`, the staging file a download is streamed into
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// True for paths that stay inside whatever directory they are joined onto
pub fn is_safe_relative_path(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Download `url` to `path`.
///
/// A non-empty file already at `path` counts as done and the network is not touched;
/// content is not checked here, use [`fetch_and_verify`] for that. The body is streamed
/// into `<path>.tmp` and renamed into place once complete, so `path` never holds a
/// partial body. The staging file is removed on any failure.
pub async fn fetch(
    client: &Client,
    url: &str,
    path: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Create directory {:?}", parent))?;
    }

    if let Ok(metadata) = fs::metadata(path).await {
        if metadata.is_file() && metadata.len() > 0 {
            log::debug!("File already exists, skipping download: {:?}", path);
            return Ok(());
        }
    }

    log::debug!("Downloading: {} -> {:?}", url, path);

    let tmp_path = tmp_path_for(path);
    if let Err(e) = stream_to_file(client, url, &tmp_path, reporter).await {
        discard_tmp(&tmp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp_path, path).await {
        discard_tmp(&tmp_path).await;
        return Err(e).with_context(|| format!("Move {:?} into place at {:?}", tmp_path, path));
    }

    Ok(())
}

async fn discard_tmp(tmp_path: &Path) {
    match fs::remove_file(tmp_path).await {
        Ok(()) => log::debug!("Removed partial download {:?}", tmp_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove partial download {:?}: {}", tmp_path, e),
    }
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    tmp_path: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let start = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| InstallError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(InstallError::Http {
            url: url.to_string(),
            status: response.status(),
        }
        .into());
    }

    let total_size = response.content_length();
    let mut file = File::create(tmp_path)
        .await
        .with_context(|| format!("Create {:?}", tmp_path))?;
    let mut downloaded: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|source| InstallError::Transport {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Write {:?}", tmp_path))?;

        downloaded += chunk.len() as u64;
        reporter.update_bytes(downloaded, total_size);
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    let secs = start.elapsed().as_secs_f64();
    log::debug!(
        "Download stats: url={}, size={} bytes, time={:.2}s, throughput={:.2} MB/s",
        url,
        downloaded,
        secs,
        (downloaded as f64 / 1024.0 / 1024.0) / secs.max(0.001)
    );

    Ok(())
}

/// Streaming SHA1 of a file, lowercase hex
pub async fn sha1_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("Open {:?} for hashing", path))?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare the SHA1 of `path` against `expected` (hex, case-insensitive)
pub async fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = sha1_file(path).await?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(InstallError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        }
        .into());
    }
    log::debug!("SHA1 validated: {}", actual);
    Ok(())
}

/// [`fetch`] followed by [`verify_checksum`] when a digest is known.
/// A file that fails verification is deleted before the error is returned.
pub async fn fetch_and_verify(
    client: &Client,
    url: &str,
    path: &Path,
    expected_sha1: Option<&str>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    fetch(client, url, path, reporter).await?;

    if let Some(expected) = expected_sha1.filter(|s| !s.trim().is_empty()) {
        if let Err(e) = verify_checksum(path, expected).await {
            if let Err(remove_err) = fs::remove_file(path).await {
                log::warn!(
                    "Failed to remove corrupt file {:?}: {}",
                    path,
                    remove_err
                );
            }
            return Err(e.context(format!(
                "Checksum verification failed for {}",
                path.display()
            )));
        }
    }

    Ok(())
}

/// GET a JSON document and deserialize it.
/// Transport problems surface as [`InstallError::Transport`] / [`InstallError::Http`],
/// undecodable bodies as [`InstallError::Format`].
pub async fn download_json_with_client<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    what: &str,
) -> Result<T> {
    log::debug!("Downloading JSON: {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| InstallError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(InstallError::Http {
            url: url.to_string(),
            status: response.status(),
        }
        .into());
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| InstallError::Transport {
            url: url.to_string(),
            source,
        })?;

    let data = serde_json::from_slice(&bytes).map_err(|source| InstallError::Format {
        what: what.to_string(),
        source,
    })?;
    Ok(data)
}
