//! Timestamped release archive.
//!
//! One archive per minute: re-running within the same minute replaces the earlier
//! archive instead of adding to it.

use crate::error::{PipelineError, Result};
use crate::pipeline::artifact::Artifact;
use crate::pipeline::layout::{APP_NAME, ProjectLayout};
use crate::pipeline::stage::{BuildContext, PipelineState, Stage};
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive timestamp format, minute granularity
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Source of the archive timestamp, read when the archive is written.
pub type Clock = fn() -> NaiveDateTime;

/// Current local wall-clock time.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Archive location
    pub path: PathBuf,
    /// Name of the single entry
    pub entry_name: String,
    /// Uncompressed size of the entry in bytes
    pub size: u64,
    /// Hex SHA-256 of the entry contents
    pub checksum: String,
}

/// Writes the artifact into `<app>-<timestamp>.zip`.
#[derive(Debug, Clone)]
pub struct Archiver {
    dir: PathBuf,
    app_name: String,
}

impl Archiver {
    /// Archiver writing into `dir`
    pub fn new(dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            app_name: app_name.into(),
        }
    }

    /// Archive path for a run at `at`
    pub fn archive_path(&self, at: NaiveDateTime) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.zip",
            self.app_name,
            at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Replace any archive for `at` with one holding only `artifact`.
    pub fn create(&self, artifact: &Artifact, at: NaiveDateTime) -> Result<Archive> {
        let path = self.archive_path(at);
        log::info!("Creating zip {}", path.display());

        let fail = |source: zip::result::ZipError| PipelineError::ArchiveCreation {
            path: path.clone(),
            source,
        };

        if path.exists() {
            log::debug!("Removing previous archive {}", path.display());
            std::fs::remove_file(&path).map_err(|e| fail(e.into()))?;
        }

        let entry_name = artifact.file_name();
        let (size, checksum) =
            write_single_entry(&path, artifact.path(), &entry_name).map_err(fail)?;

        Ok(Archive {
            path: path.clone(),
            entry_name,
            size,
            checksum,
        })
    }
}

/// Deflate `source` into a new zip at `dest` as the root entry `entry_name`.
///
/// Returns the entry size and its SHA-256.
fn write_single_entry(
    dest: &Path,
    source: &Path,
    entry_name: &str,
) -> zip::result::ZipResult<(u64, String)> {
    let mut input = File::open(source)?;
    let size = input.metadata()?.len();

    let mut zip = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= u64::from(u32::MAX));
    zip.start_file(entry_name.to_string(), options)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = input.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        zip.write_all(&buffer[..n])?;
    }

    zip.finish()?;
    Ok((size, format!("{:x}", hasher.finalize())))
}

/// Stage archiving the located artifact.
#[derive(Debug, Clone)]
pub struct ArchiveStage {
    archiver: Archiver,
    clock: Clock,
}

impl ArchiveStage {
    /// Stage writing into the layout's root, named after the local time
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            archiver: Archiver::new(layout.root(), APP_NAME),
            clock: local_now,
        }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl Stage for ArchiveStage {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn completes(&self) -> PipelineState {
        PipelineState::Archived
    }

    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let artifact = ctx
            .artifact
            .as_ref()
            .ok_or_else(|| PipelineError::NoArtifactFound {
                dir: ctx.layout.output_dir(),
            })?;
        let archive = self.archiver.create(artifact, (self.clock)())?;
        log::info!(
            "Archived {} ({} bytes, SHA-256 {})",
            archive.entry_name,
            archive.size,
            archive.checksum
        );
        ctx.archive = Some(archive);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 7, 59)
            .unwrap()
    }

    fn artifact_in(dir: &Path, contents: &[u8]) -> Artifact {
        let dist = dir.join("dist");
        fs::create_dir_all(&dist).unwrap();
        let path = dist.join("JesnZIP-tray.exe");
        fs::write(&path, contents).unwrap();
        Artifact { path }
    }

    fn entries(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_archive_name_has_minute_timestamp() {
        let archiver = Archiver::new("/repo", "JesnZIP-tray");
        assert_eq!(
            archiver.archive_path(at()),
            Path::new("/repo/JesnZIP-tray-202403091407.zip")
        );
    }

    #[test]
    fn test_artifact_is_flattened_to_root() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_in(temp_dir.path(), b"MZ tray binary");
        let archive = Archiver::new(temp_dir.path(), "JesnZIP-tray")
            .create(&artifact, at())
            .unwrap();

        assert_eq!(
            entries(&archive.path),
            vec![("JesnZIP-tray.exe".to_string(), b"MZ tray binary".to_vec())]
        );
        assert_eq!(archive.size, 14);
        assert_eq!(archive.checksum.len(), 64);
    }

    #[test]
    fn test_rerun_in_same_minute_replaces_archive() {
        let temp_dir = TempDir::new().unwrap();
        let archiver = Archiver::new(temp_dir.path(), "JesnZIP-tray");

        // A stale archive with an unrelated entry must not survive.
        let stale = archiver.archive_path(at());
        let mut zip = ZipWriter::new(File::create(&stale).unwrap());
        zip.start_file("old.txt".to_string(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"old").unwrap();
        zip.finish().unwrap();

        let artifact = artifact_in(temp_dir.path(), b"first");
        archiver.create(&artifact, at()).unwrap();
        fs::write(artifact.path(), b"second").unwrap();
        let archive = archiver.create(&artifact, at()).unwrap();

        let zips: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "zip"))
            .collect();
        assert_eq!(zips.len(), 1);
        assert_eq!(
            entries(&archive.path),
            vec![("JesnZIP-tray.exe".to_string(), b"second".to_vec())]
        );
    }

    #[test]
    fn test_stage_names_archive_from_its_clock() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());
        let mut runner = crate::pipeline::process::SystemRunner;
        let mut ctx = BuildContext::new(&layout, &mut runner);
        ctx.artifact = Some(artifact_in(temp_dir.path(), b"MZ"));

        ArchiveStage::new(&layout)
            .with_clock(at)
            .execute(&mut ctx)
            .unwrap();

        let archive = ctx.archive.expect("archive recorded");
        assert_eq!(
            archive.path,
            temp_dir.path().join("JesnZIP-tray-202403091407.zip")
        );
        assert!(archive.path.is_file());
    }
}
