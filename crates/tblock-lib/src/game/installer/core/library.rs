use super::downloader::{fetch_and_verify, is_safe_relative_path};
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::error::InstallError;
use crate::game::installer::types::{Platform, ProgressReporter, SilentProgressReporter};
use crate::game::metadata::{Library, Rule, RuleAction};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;

/// Outcome of a library pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibrarySummary {
    pub installed: usize,
    pub skipped: usize,
}

/// Whether a single rule matches `platform`.
/// Feature-gated rules never match; no features are enabled while installing.
pub fn rule_matches(rule: &Rule, platform: Platform) -> bool {
    if rule.features.as_ref().is_some_and(|f| !f.is_empty()) {
        return false;
    }

    match &rule.os {
        Some(os_rule) => {
            let name_matches = os_rule
                .name
                .as_deref()
                .map(|n| n == platform.os.as_str())
                .unwrap_or(true);
            let arch_matches = os_rule
                .arch
                .as_deref()
                .map(|a| a == platform.arch.as_str())
                .unwrap_or(true);
            name_matches && arch_matches
        }
        None => true,
    }
}

/// No rules: install. Otherwise every allow rule must match and no disallow rule may.
pub fn library_applies(rules: &[Rule], platform: Platform) -> bool {
    rules.iter().all(|rule| {
        let matches = rule_matches(rule, platform);
        match rule.action {
            RuleAction::Allow => matches,
            RuleAction::Disallow => !matches,
        }
    })
}

/// Maven coordinates to a repository-relative path:
/// `group/with/slashes/artifact/version/artifact-version[-classifier].ext`
///
/// Coordinates whose path would leave the repository root are rejected.
pub fn maven_path(coords: &str) -> Result<String> {
    let parts: Vec<&str> = coords.split(':').collect();
    if parts.len() < 3 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
        return Err(InstallError::invalid("library name", coords).into());
    }

    let domain = parts[0].replace('.', "/");
    let lib_name = parts[1];
    let mut version = parts[2];
    let mut extension = "jar";
    let mut classifier = String::new();

    if parts.len() == 3 {
        if let Some((v, ext)) = version.split_once('@') {
            version = v;
            extension = ext;
        }
    } else {
        let classifier_ext = parts[3];
        if let Some((clf, ext)) = classifier_ext.split_once('@') {
            classifier = format!("-{}", clf);
            extension = ext;
        } else {
            classifier = format!("-{}", classifier_ext);
        }
    }

    let path = format!(
        "{}/{}/{}/{}-{}{}.{}",
        domain, lib_name, version, lib_name, version, classifier, extension
    );
    if !is_safe_relative_path(Path::new(&path)) {
        return Err(InstallError::invalid("library path", path).into());
    }
    Ok(path)
}

/// Join a repository base URL and a relative path with exactly one slash
pub fn maven_url(base_url: &str, rel_path: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}{}", base_url, rel_path)
    } else {
        format!("{}/{}", base_url, rel_path)
    }
}

fn is_denied(config: &InstallerConfig, rel_path: &str) -> bool {
    Path::new(rel_path)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| config.library_denylist.iter().any(|d| d == name))
}

/// Install every applicable library into `libraries/`, one after another.
pub async fn install_libraries(
    client: &Client,
    config: &InstallerConfig,
    platform: Platform,
    libraries: &[Library],
    reporter: &dyn ProgressReporter,
) -> Result<LibrarySummary> {
    let total = libraries.len() as u32;
    let libraries_dir = config.libraries_dir();
    let mut summary = LibrarySummary::default();

    log::info!("Installing {} libraries into {:?}", total, libraries_dir);

    for (i, library) in libraries.iter().enumerate() {
        let result = install_library(client, config, platform, library, &libraries_dir).await;
        reporter.set_step_count(i as u32 + 1, Some(total));

        match result.with_context(|| format!("Failed to install library {}", library.name))? {
            true => summary.installed += 1,
            false => summary.skipped += 1,
        }
    }

    log::info!(
        "Libraries done: {} installed, {} skipped",
        summary.installed,
        summary.skipped
    );
    Ok(summary)
}

/// Returns false when the library is skipped
async fn install_library(
    client: &Client,
    config: &InstallerConfig,
    platform: Platform,
    library: &Library,
    libraries_dir: &Path,
) -> Result<bool> {
    if !library_applies(&library.rules, platform) {
        log::debug!("Skipping library {} (rules)", library.name);
        return Ok(false);
    }

    let artifact = match library.artifact() {
        Some(a) if !a.url.is_empty() => a,
        _ => {
            log::debug!("Skipping library {} (no artifact)", library.name);
            return Ok(false);
        }
    };

    let rel_path = if artifact.path.is_empty() {
        maven_path(&library.name)?
    } else {
        artifact.path.clone()
    };

    if is_denied(config, &rel_path) {
        log::info!("Skipping denylisted library {}", rel_path);
        return Ok(false);
    }

    if !is_safe_relative_path(Path::new(&rel_path)) {
        return Err(InstallError::invalid("library path", rel_path).into());
    }

    let path = libraries_dir.join(&rel_path);
    fetch_and_verify(
        client,
        &artifact.url,
        &path,
        Some(artifact.sha1.as_str()),
        &SilentProgressReporter,
    )
    .await?;
    Ok(true)
}
