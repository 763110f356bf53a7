use super::downloader::{fetch, is_safe_relative_path};
use crate::game::installer::config::{InstallerConfig, RuntimeConfig};
use crate::game::installer::error::InstallError;
use crate::game::installer::types::{Arch, OsType, Platform, ProgressReporter};
use anyhow::{Context, Result};
use reqwest::Client;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Archive format the runtime is published in for a given OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    pub fn for_os(os: OsType) -> Self {
        match os {
            OsType::Windows => ArchiveKind::Zip,
            _ => ArchiveKind::TarGz,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

fn unsupported(platform: Platform) -> InstallError {
    InstallError::UnsupportedPlatform {
        os: platform.os.as_str().to_string(),
        arch: platform.arch.as_str().to_string(),
    }
}

/// Archive URL for `platform`, in the Adoptium file naming scheme
pub fn runtime_download_url(runtime: &RuntimeConfig, platform: Platform) -> Result<String> {
    let os = match platform.os {
        OsType::Windows => "windows",
        OsType::MacOS => "mac",
        OsType::Linux => "linux",
        OsType::Other => return Err(unsupported(platform).into()),
    };

    let arch = match platform.arch {
        Arch::X64 => "x64",
        Arch::Arm64 => "aarch64",
        Arch::X86 => "x86-32",
        Arch::Arm32 | Arch::Other => return Err(unsupported(platform).into()),
    };

    Ok(format!(
        "{}/OpenJDK{}U-jdk_{}_{}_hotspot_{}.{}",
        runtime.base_url.trim_end_matches('/'),
        runtime.major,
        arch,
        os,
        runtime.release.replace('+', "_"),
        ArchiveKind::for_os(platform.os).extension()
    ))
}

/// Download and unpack the Java runtime into `<game_dir>/java`.
/// Returns the path of the java executable.
pub async fn install_runtime(
    client: &Client,
    config: &InstallerConfig,
    platform: Platform,
    reporter: &dyn ProgressReporter,
) -> Result<PathBuf> {
    let url = runtime_download_url(&config.runtime, platform)?;
    let kind = ArchiveKind::for_os(platform.os);
    let archive_path = config
        .game_dir
        .join(format!("java.{}", kind.extension()));
    let java_dir = config.java_dir();

    // A leftover archive from an interrupted run would otherwise be reused as-is
    remove_if_exists(&archive_path).await?;

    log::info!("Downloading Java runtime from {}", url);
    fetch(client, &url, &archive_path, reporter)
        .await
        .context("Failed to download Java runtime")?;

    if tokio::fs::metadata(&java_dir).await.is_ok() {
        tokio::fs::remove_dir_all(&java_dir)
            .await
            .with_context(|| format!("Remove old runtime {:?}", java_dir))?;
    }
    tokio::fs::create_dir_all(&java_dir).await?;

    log::info!("Extracting Java runtime to {:?}", java_dir);
    let extracted = {
        let archive_path = archive_path.clone();
        let java_dir = java_dir.clone();
        tokio::task::spawn_blocking(move || match kind {
            ArchiveKind::Zip => extract_zip(&archive_path, &java_dir),
            ArchiveKind::TarGz => extract_tar_gz(&archive_path, &java_dir),
        })
        .await
        .context("Runtime extraction task panicked")?
        .context("Failed to extract Java runtime")?
    };
    log::debug!("Extracted {} files", extracted);

    if let Err(e) = tokio::fs::remove_file(&archive_path).await {
        log::warn!("Failed to remove runtime archive {:?}: {}", archive_path, e);
    }

    let java_path = find_java_executable(&java_dir, platform.os).ok_or_else(|| {
        InstallError::invalid("runtime archive", "no java executable after extraction")
    })?;

    log::info!("Java runtime installed: {:?}", java_path);
    Ok(java_path)
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Remove {:?}", path)),
    }
}

/// Java executable of an already installed runtime, if any
pub fn find_runtime_executable(config: &InstallerConfig, platform: Platform) -> Option<PathBuf> {
    find_java_executable(&config.java_dir(), platform.os)
}

pub fn find_java_executable(dir: &Path, os: OsType) -> Option<PathBuf> {
    // Layouts:
    // - java/bin/java
    // - java/jdk-21.0.9+10/bin/java
    // - java/jdk-21.0.9+10/Contents/Home/bin/java (macOS)
    let executable_name = if os == OsType::Windows {
        "java.exe"
    } else {
        "java"
    };

    let candidates = |root: &Path| {
        [
            root.join("bin").join(executable_name),
            root.join("Contents/Home/bin").join(executable_name),
        ]
    };

    if let Some(found) = candidates(dir).into_iter().find(|p| p.is_file()) {
        return Some(found);
    }

    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();

    subdirs
        .iter()
        .flat_map(|d| candidates(d))
        .find(|p| p.is_file())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::open(archive).with_context(|| format!("Open {:?}", archive))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).context("Read zip archive")?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let rel = entry
            .enclosed_name()
            .ok_or_else(|| InstallError::invalid("archive entry", entry.name()))?;
        if entry.is_dir() {
            continue;
        }

        let out = dest.join(&rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = fs::File::create(&out).with_context(|| format!("Create {:?}", out))?;
        std::io::copy(&mut entry, &mut out_file)?;

        #[cfg(unix)]
        {
            if let Some(mode) = entry.unix_mode() {
                set_mode(&out, mode)?;
            }
        }
        written += 1;
    }

    Ok(written)
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<usize> {
    use flate2::read::GzDecoder;

    let file = fs::File::open(archive).with_context(|| format!("Open {:?}", archive))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut written = 0;

    for entry in tar.entries().context("Read tar archive")? {
        let mut entry = entry?;
        let rel = entry.path()?.into_owned();
        if !is_safe_relative_path(&rel) {
            return Err(InstallError::invalid("archive entry", rel.display().to_string()).into());
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            continue;
        }
        if !entry_type.is_file() {
            log::debug!("Skipping non-regular archive entry {:?}", rel);
            continue;
        }

        let out = dest.join(&rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = fs::File::create(&out).with_context(|| format!("Create {:?}", out))?;
        std::io::copy(&mut entry, &mut out_file)?;

        #[cfg(unix)]
        set_mode(&out, entry.header().mode()?)?;
        written += 1;
    }

    Ok(written)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .with_context(|| format!("Set permissions on {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn runtime() -> RuntimeConfig {
        RuntimeConfig {
            major: "21".to_string(),
            release: "21.0.9+10".to_string(),
            base_url: "https://dl.example/jdk-21.0.9%2B10/".to_string(),
        }
    }

    #[test]
    fn vendor_naming_per_platform() {
        assert_eq!(
            runtime_download_url(&runtime(), Platform::new(OsType::Linux, Arch::X64)).unwrap(),
            "https://dl.example/jdk-21.0.9%2B10/OpenJDK21U-jdk_x64_linux_hotspot_21.0.9_10.tar.gz"
        );
        assert_eq!(
            runtime_download_url(&runtime(), Platform::new(OsType::MacOS, Arch::Arm64)).unwrap(),
            "https://dl.example/jdk-21.0.9%2B10/OpenJDK21U-jdk_aarch64_mac_hotspot_21.0.9_10.tar.gz"
        );
        assert_eq!(
            runtime_download_url(&runtime(), Platform::new(OsType::Windows, Arch::X86)).unwrap(),
            "https://dl.example/jdk-21.0.9%2B10/OpenJDK21U-jdk_x86-32_windows_hotspot_21.0.9_10.zip"
        );
    }

    #[test]
    fn unsupported_combinations() {
        for platform in [
            Platform::new(OsType::Other, Arch::X64),
            Platform::new(OsType::Linux, Arch::Arm32),
            Platform::new(OsType::Linux, Arch::Other),
        ] {
            let err = runtime_download_url(&runtime(), platform).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<InstallError>(),
                Some(InstallError::UnsupportedPlatform { .. })
            ));
        }
    }

    #[test]
    fn finds_java_executable_in_common_layouts() {
        let tmp = tempfile::tempdir().unwrap();

        let flat = tmp.path().join("flat");
        fs::create_dir_all(flat.join("bin")).unwrap();
        fs::write(flat.join("bin/java"), b"").unwrap();
        assert_eq!(
            find_java_executable(&flat, OsType::Linux),
            Some(flat.join("bin/java"))
        );

        let nested = tmp.path().join("nested");
        fs::create_dir_all(nested.join("jdk-21.0.9+10/bin")).unwrap();
        fs::write(nested.join("jdk-21.0.9+10/bin/java.exe"), b"").unwrap();
        assert_eq!(
            find_java_executable(&nested, OsType::Windows),
            Some(nested.join("jdk-21.0.9+10/bin/java.exe"))
        );
        assert_eq!(find_java_executable(&nested, OsType::Linux), None);

        let mac = tmp.path().join("mac");
        fs::create_dir_all(mac.join("jdk-21.0.9+10/Contents/Home/bin")).unwrap();
        fs::write(mac.join("jdk-21.0.9+10/Contents/Home/bin/java"), b"").unwrap();
        assert_eq!(
            find_java_executable(&mac, OsType::MacOS),
            Some(mac.join("jdk-21.0.9+10/Contents/Home/bin/java"))
        );

        assert_eq!(find_java_executable(&tmp.path().join("missing"), OsType::Linux), None);
    }

    #[test]
    fn extracts_tar_gz_with_modes() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("java.tar.gz");

        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk/bin/", std::io::empty())
            .unwrap();
        let body = b"#!/bin/sh\n";
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk/bin/java", &body[..])
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        fs::write(&archive, bytes).unwrap();

        let dest = tmp.path().join("java");
        fs::create_dir_all(&dest).unwrap();
        assert_eq!(extract_tar_gz(&archive, &dest).unwrap(), 1);
        assert_eq!(fs::read(dest.join("jdk/bin/java")).unwrap(), body);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("jdk/bin/java"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn extracts_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("java.zip");

        let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
        writer
            .add_directory("jdk/bin/", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer
            .start_file("jdk/bin/java.exe", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"MZ").unwrap();
        writer.finish().unwrap();

        let dest = tmp.path().join("java");
        fs::create_dir_all(&dest).unwrap();
        assert_eq!(extract_zip(&archive, &dest).unwrap(), 1);
        assert_eq!(fs::read(dest.join("jdk/bin/java.exe")).unwrap(), b"MZ");
    }
}
