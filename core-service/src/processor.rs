//! Folder Processor
//!
//! Drives a run: enumerate the audio files, work out what each one is, look
//! its cover up through the provider chain, then export and embed it. Files
//! that could not be handled end up in the run's [`FailureLog`].
//!
//! Files are handled one at a time with a fixed pause between them so the
//! free APIs further down the chain are not hammered.

use crate::error::{Result, ServiceError};
use crate::failure_log::{FailureLog, FAILURE_LOG_FILE_NAME};
use core_metadata::{
    is_audio_file, resolve_identity, CoverFetcher, CoverResolution, MetadataError, TagStore,
};
use core_runtime::logging::strip_path;
use core_runtime::RunOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sub-folder receiving exported cover images.
pub const EXPORT_DIR_NAME: &str = "export-covers";

const SKIPPED_NON_AUDIO: &str = "Skipped non-audio file";

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Audio files that went through the pipeline
    pub processed: usize,
    pub embedded: usize,
    pub exported: usize,
    /// Entries written to the failure log
    pub failed: usize,
    pub failure_log: Option<PathBuf>,
}

/// Runs the cover pipeline over a folder or a single file.
pub struct CoverProcessor {
    fetcher: CoverFetcher,
    tag_store: Arc<dyn TagStore>,
    options: RunOptions,
}

impl CoverProcessor {
    pub fn new(fetcher: CoverFetcher, tag_store: Arc<dyn TagStore>, options: RunOptions) -> Self {
        Self {
            fetcher,
            tag_store,
            options,
        }
    }

    /// Process `source`, a folder or a single file.
    pub async fn run(&self, source: &Path) -> Result<ProcessSummary> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|_| ServiceError::SourceNotFound(source.to_path_buf()))?;

        if metadata.is_dir() {
            self.process_folder(source).await
        } else {
            self.process_file(source).await
        }
    }

    /// Process every file directly inside `folder`, in name order.
    ///
    /// Sub-directories and the failure log itself are ignored. The failure
    /// log is appended once after the last file.
    pub async fn process_folder(&self, folder: &Path) -> Result<ProcessSummary> {
        if !tokio::fs::metadata(folder).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(ServiceError::SourceNotFound(folder.to_path_buf()));
        }

        let export_dir = self.prepare_export_dir(folder).await?;
        let files = list_files(folder).await?;
        info!(files = files.len(), "Processing folder {}", folder.display());

        let mut log = FailureLog::new();
        let mut summary = ProcessSummary::default();

        for (index, path) in files.iter().enumerate() {
            let file_name = file_name_of(path);

            if !is_audio_file(path) {
                debug!(file = %file_name, "Skipping non-audio file");
                log.record_error(file_name, SKIPPED_NON_AUDIO);
                continue;
            }

            info!("[{}/{}] {}", index + 1, files.len(), file_name);
            self.process_track(path, &file_name, export_dir.as_deref(), &mut log, &mut summary)
                .await;

            tokio::time::sleep(self.options.request_delay()).await;
        }

        self.finish(folder, log, summary).await
    }

    /// Process a single file; the failure log goes next to it.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessSummary> {
        if !tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(ServiceError::SourceNotFound(path.to_path_buf()));
        }

        let folder = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = file_name_of(path);

        let mut log = FailureLog::new();
        let mut summary = ProcessSummary::default();

        if is_audio_file(path) {
            let export_dir = self.prepare_export_dir(&folder).await?;
            self.process_track(path, &file_name, export_dir.as_deref(), &mut log, &mut summary)
                .await;
        } else {
            warn!(file = %file_name, "Not an audio file");
            log.record_error(file_name, SKIPPED_NON_AUDIO);
        }

        self.finish(&folder, log, summary).await
    }

    async fn prepare_export_dir(&self, folder: &Path) -> Result<Option<PathBuf>> {
        if !self.options.export_covers {
            return Ok(None);
        }
        let dir = folder.join(EXPORT_DIR_NAME);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Some(dir))
    }

    /// Resolve, fetch, export and embed one audio file. Never fails; problems
    /// are recorded in `log`.
    async fn process_track(
        &self,
        path: &Path,
        file_name: &str,
        export_dir: Option<&Path>,
        log: &mut FailureLog,
        summary: &mut ProcessSummary,
    ) {
        summary.processed += 1;

        let tags = match self.tag_store.read_tags(path) {
            Ok(tags) => tags,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Could not read tags");
                log.record_error(file_name, e.to_string());
                return;
            }
        };

        let identity = resolve_identity(tags.artist.as_deref(), tags.title.as_deref(), file_name);
        debug!(
            file = %file_name,
            artist = %identity.artist,
            title = %identity.title,
            "Resolved track identity"
        );

        let image = match self
            .fetcher
            .resolve_cover(&identity.artist, &identity.title)
            .await
        {
            CoverResolution::Found { provider, image } => {
                info!(file = %file_name, provider = %provider, "Cover found");
                image
            }
            CoverResolution::Unresolved { variations } => {
                warn!(file = %file_name, "No cover found");
                log.record_unresolved(file_name, identity.artist, identity.title, variations);
                return;
            }
        };

        if let Some(dir) = export_dir {
            let cover_path = dir.join(format!("{}.jpg", file_stem_of(path)));
            if let Err(e) = tokio::fs::write(&cover_path, &image).await {
                warn!(file = %file_name, error = %e, "Cover export failed");
                log.record_error(file_name, format!("Cover export failed: {}", e));
                return;
            }
            debug!("Exported cover to {}", strip_path(&cover_path.to_string_lossy()));
            summary.exported += 1;
        }

        match self.tag_store.write_cover(path, &image) {
            Ok(()) => {
                info!(file = %file_name, "Cover embedded");
                summary.embedded += 1;
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "Tag update failed");
                let message = if matches!(e, MetadataError::TagWriteFailed(_)) {
                    e.to_string()
                } else {
                    format!("Tag update failed: {}", e)
                };
                log.record_error(file_name, message);
            }
        }
    }

    async fn finish(
        &self,
        folder: &Path,
        log: FailureLog,
        mut summary: ProcessSummary,
    ) -> Result<ProcessSummary> {
        summary.failed = log.len();
        summary.failure_log = log.flush(folder).await?;
        info!(
            processed = summary.processed,
            embedded = summary.embedded,
            exported = summary.exported,
            failed = summary.failed,
            "Run complete"
        );
        Ok(summary)
    }
}

/// Regular files directly inside `folder`, sorted by name, minus the failure log.
async fn list_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if entry.file_name() == FAILURE_LOG_FILE_NAME {
            continue;
        }
        files.push(entry.path());
    }

    files.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
