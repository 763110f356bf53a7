use super::downloader::{fetch_and_verify, verify_checksum};
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::error::InstallError;
use crate::game::installer::types::{ProgressReporter, SilentProgressReporter};
use crate::game::metadata::AssetIndex;
use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Number of failure messages kept on [`InstallError::AssetsFailed`]
pub const MAX_REPORTED_ERRORS: usize = 5;

const LOG_EVERY: usize = 100;

/// One content-addressed object to fetch.
/// Every asset name sharing the hash rides on the same job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetJob {
    pub names: Vec<String>,
    pub hash: String,
    pub size: u64,
}

impl AssetJob {
    /// `<hash[0:2]>/<hash>`
    pub fn object_path(&self) -> String {
        let prefix = self.hash.get(..2).unwrap_or(&self.hash);
        format!("{}/{}", prefix, self.hash)
    }
}

#[derive(Debug)]
enum Outcome {
    Downloaded,
    Skipped,
    Failed(String),
}

#[derive(Debug)]
struct JobResult {
    job: AssetJob,
    outcome: Outcome,
}

/// Aggregated asset counts, in asset names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetSummary {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn is_valid_hash(hash: &str) -> bool {
    hash.len() >= 2 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Group index entries into one job per distinct hash
pub fn plan_asset_jobs(index: &AssetIndex) -> Result<Vec<AssetJob>> {
    let mut by_hash: BTreeMap<&str, AssetJob> = BTreeMap::new();

    for (name, object) in &index.objects {
        if !is_valid_hash(&object.hash) {
            return Err(InstallError::invalid(
                "asset index",
                format!("bad hash {:?} for {}", object.hash, name),
            )
            .into());
        }

        let job = by_hash.entry(&object.hash).or_insert_with(|| AssetJob {
            names: Vec::new(),
            hash: object.hash.clone(),
            size: object.size,
        });
        job.names.push(name.clone());
    }

    Ok(by_hash
        .into_values()
        .map(|mut job| {
            job.names.sort();
            job
        })
        .collect())
}

/// Run `jobs` through a fixed pool of workers and tally the results.
///
/// Workers pull from a pre-filled queue and report over a result channel; the
/// calling task is the only reader of that channel and the only owner of the
/// counters. Any failed asset turns into [`InstallError::AssetsFailed`] once every
/// job has been processed.
pub async fn download_assets(
    client: &Client,
    config: &InstallerConfig,
    jobs: Vec<AssetJob>,
    reporter: &dyn ProgressReporter,
) -> Result<AssetSummary> {
    let total: usize = jobs.iter().map(|j| j.names.len()).sum();
    let mut summary = AssetSummary {
        total,
        ..Default::default()
    };
    if jobs.is_empty() {
        return Ok(summary);
    }

    let worker_count = config.concurrency.max(1).min(jobs.len());
    log::info!(
        "Downloading {} assets ({} objects) with {} workers",
        total,
        jobs.len(),
        worker_count
    );

    let (job_tx, job_rx) = mpsc::channel::<AssetJob>(jobs.len());
    for job in jobs {
        job_tx
            .send(job)
            .await
            .map_err(|_| anyhow::anyhow!("Asset job queue closed"))?;
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, mut result_rx) = mpsc::channel::<JobResult>(worker_count * 2);
    let base_url = config.resources_url.trim_end_matches('/').to_string();
    let objects_dir = config.asset_objects_dir();

    let mut handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        let client = client.clone();
        let base_url = base_url.clone();
        let objects_dir = objects_dir.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let next = job_rx.lock().await.recv().await;
                let Some(job) = next else { break };

                let outcome = process_job(&client, &base_url, &objects_dir, &job).await;
                if result_tx.send(JobResult { job, outcome }).await.is_err() {
                    break;
                }
            }
            log::trace!("Asset worker {} finished", worker_id);
        }));
    }
    drop(result_tx);

    let mut first_errors = Vec::new();
    let mut processed = 0usize;
    let mut next_log = LOG_EVERY;

    while let Some(result) = result_rx.recv().await {
        let count = result.job.names.len();
        match result.outcome {
            Outcome::Downloaded => summary.downloaded += count,
            Outcome::Skipped => summary.skipped += count,
            Outcome::Failed(message) => {
                summary.failed += count;
                log::warn!("Asset {} failed: {}", result.job.hash, message);
                if first_errors.len() < MAX_REPORTED_ERRORS {
                    first_errors.push(format!("{}: {}", result.job.names.join(", "), message));
                }
            }
        }

        processed += count;
        reporter.set_step_count(processed as u32, Some(total as u32));

        if processed >= next_log {
            log::info!(
                "Assets: {}/{} processed ({} downloaded, {} skipped, {} failed)",
                processed,
                total,
                summary.downloaded,
                summary.skipped,
                summary.failed
            );
            next_log = (processed / LOG_EVERY + 1) * LOG_EVERY;
        }
    }

    for handle in handles {
        handle.await.context("Asset worker panicked")?;
    }

    log::info!(
        "Assets done: {} total, {} downloaded, {} skipped, {} failed",
        summary.total,
        summary.downloaded,
        summary.skipped,
        summary.failed
    );

    if summary.failed > 0 {
        return Err(InstallError::AssetsFailed {
            total: summary.total,
            downloaded: summary.downloaded,
            skipped: summary.skipped,
            failed: summary.failed,
            first_errors,
        }
        .into());
    }

    Ok(summary)
}

async fn process_job(client: &Client, base_url: &str, objects_dir: &Path, job: &AssetJob) -> Outcome {
    if !is_valid_hash(&job.hash) {
        return Outcome::Failed(InstallError::invalid("asset hash", &job.hash).to_string());
    }
    let path: PathBuf = objects_dir.join(job.object_path());

    if is_installed(&path, job).await {
        return Outcome::Skipped;
    }

    // fetch() would keep a stale non-empty file
    match tokio::fs::remove_file(&path).await {
        Ok(()) => log::debug!("Removed stale asset {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Outcome::Failed(format!("Remove stale {:?}: {}", path, e)),
    }

    let url = format!("{}/{}", base_url, job.object_path());
    match fetch_and_verify(client, &url, &path, Some(&job.hash), &SilentProgressReporter).await {
        Ok(()) => Outcome::Downloaded,
        Err(e) => Outcome::Failed(format!("{:#}", e)),
    }
}

/// Size first, digest only when the size already matches
async fn is_installed(path: &Path, job: &AssetJob) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() && metadata.len() == job.size => {
            verify_checksum(path, &job.hash).await.is_ok()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::metadata::AssetObject;
    use std::collections::HashMap;

    fn index(entries: &[(&str, &str, u64)]) -> AssetIndex {
        AssetIndex {
            objects: entries
                .iter()
                .map(|(name, hash, size)| {
                    (
                        name.to_string(),
                        AssetObject {
                            hash: hash.to_string(),
                            size: *size,
                        },
                    )
                })
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn duplicate_hashes_share_a_job() {
        let idx = index(&[
            ("minecraft/sounds/a.ogg", "ab12", 3),
            ("minecraft/sounds/b.ogg", "ab12", 3),
            ("minecraft/lang/en.json", "cd34", 5),
        ]);

        let jobs = plan_asset_jobs(&idx).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].hash, "ab12");
        assert_eq!(
            jobs[0].names,
            vec!["minecraft/sounds/a.ogg", "minecraft/sounds/b.ogg"]
        );
        assert_eq!(jobs.iter().map(|j| j.names.len()).sum::<usize>(), 3);
        assert_eq!(jobs[1].object_path(), "cd/cd34");
    }

    #[test]
    fn rejects_short_or_non_hex_hash() {
        let err = plan_asset_jobs(&index(&[("x", "a", 1)])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Invalid { .. })
        ));
        assert!(plan_asset_jobs(&index(&[("x", "zz99", 1)])).is_err());
        assert!(plan_asset_jobs(&index(&[("x", "../etc", 1)])).is_err());
    }

    #[tokio::test]
    async fn malformed_job_fails_without_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = InstallerConfig::new(tmp.path());
        config.resources_url = "http://127.0.0.1:9/objects".to_string();
        let jobs = vec![
            AssetJob {
                names: vec!["short".to_string()],
                hash: "a".to_string(),
                size: 1,
            },
            AssetJob {
                names: vec!["escape".to_string()],
                hash: "../../x".to_string(),
                size: 1,
            },
        ];

        let err = download_assets(&Client::new(), &config, jobs, &SilentProgressReporter)
            .await
            .unwrap_err();

        match err.downcast_ref::<InstallError>() {
            Some(InstallError::AssetsFailed {
                total,
                failed,
                first_errors,
                ..
            }) => {
                assert_eq!((*total, *failed), (2, 2));
                assert!(first_errors.iter().any(|e| e.starts_with("short: ")));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!config.asset_objects_dir().exists());
    }

    #[tokio::test]
    async fn empty_job_list_is_a_noop() {
        let config = InstallerConfig::new("/nonexistent");
        let summary = download_assets(&Client::new(), &config, Vec::new(), &SilentProgressReporter)
            .await
            .unwrap();
        assert_eq!(summary, AssetSummary::default());
    }
}
