//! Folder and single-file runs against a stub tag store and mocked providers.

use async_trait::async_trait;
use bytes::Bytes;
use core_metadata::{
    CoverFetcher, CoverProvider, EmbeddedTags, MetadataError, ProviderKind, TagStore,
};
use core_runtime::RunOptions;
use core_service::{
    CoverProcessor, FailureEntry, ServiceError, EXPORT_DIR_NAME, FAILURE_LOG_FILE_NAME,
};
use mockall::mock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    pub Provider {}

    #[async_trait]
    impl CoverProvider for Provider {
        fn kind(&self) -> ProviderKind;
        async fn fetch(&self, artist: &str, title: &str) -> core_metadata::Result<Option<Bytes>>;
    }
}

const COVER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x42];

/// In-memory tag store: tags keyed by file name, writes recorded.
#[derive(Default)]
struct StubTags {
    tags: HashMap<String, EmbeddedTags>,
    unreadable: Vec<String>,
    read_only: Vec<String>,
    written: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl StubTags {
    fn with_tags(mut self, file: &str, artist: &str, title: &str) -> Self {
        self.tags.insert(
            file.to_string(),
            EmbeddedTags {
                artist: Some(artist.to_string()),
                title: Some(title.to_string()),
            },
        );
        self
    }

    fn written_files(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

fn name_of(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl TagStore for StubTags {
    fn read_tags(&self, path: &Path) -> core_metadata::Result<EmbeddedTags> {
        let name = name_of(path);
        if self.unreadable.contains(&name) {
            return Err(MetadataError::TagReadFailed("corrupt header".to_string()));
        }
        Ok(self.tags.get(&name).cloned().unwrap_or_default())
    }

    fn write_cover(&self, path: &Path, image: &[u8]) -> core_metadata::Result<()> {
        if self.read_only.contains(&name_of(path)) {
            return Err(MetadataError::TagWriteFailed("permission denied".to_string()));
        }
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), image.to_vec()));
        Ok(())
    }
}

/// A provider that only knows "Midnight Drive".
fn catalog_provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_kind().return_const(ProviderKind::ITunes);
    provider.expect_fetch().returning(|_, title| {
        Ok((title == "Midnight Drive").then(|| Bytes::from_static(COVER)))
    });
    provider
}

fn processor(tags: Arc<StubTags>, options: RunOptions) -> CoverProcessor {
    let fetcher = CoverFetcher::new(vec![Box::new(catalog_provider())]);
    CoverProcessor::new(fetcher, tags, options)
}

fn quick_options() -> RunOptions {
    RunOptions::default().with_request_delay_ms(0)
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"audio").unwrap();
}

fn read_log(dir: &Path) -> Vec<FailureEntry> {
    std::fs::read_to_string(dir.join(FAILURE_LOG_FILE_NAME))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_folder_run_embeds_exports_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "DJ Nova - Midnight Drive.mp3");
    touch(dir.path(), "Unknown - Nothing.mp3");
    touch(dir.path(), "notes.txt");
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    touch(&dir.path().join("nested"), "ignored.mp3");

    let tags = Arc::new(StubTags::default());
    let summary = processor(tags.clone(), quick_options())
        .process_folder(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.embedded, 1);
    assert_eq!(summary.exported, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(
        summary.failure_log.as_deref(),
        Some(dir.path().join(FAILURE_LOG_FILE_NAME).as_path())
    );

    assert_eq!(tags.written_files(), vec!["DJ Nova - Midnight Drive.mp3"]);
    let exported = dir
        .path()
        .join(EXPORT_DIR_NAME)
        .join("DJ Nova - Midnight Drive.jpg");
    assert_eq!(std::fs::read(exported).unwrap(), COVER);

    assert_eq!(
        read_log(dir.path()),
        vec![
            FailureEntry::Unresolved {
                file_name: "Unknown - Nothing.mp3".to_string(),
                artist: "Unknown".to_string(),
                title: "Nothing".to_string(),
                variations: vec![
                    "Unknown Nothing".to_string(),
                    "Nothing Unknown".to_string(),
                    "Nothing".to_string(),
                    "Unknown".to_string(),
                ],
            },
            FailureEntry::Error {
                file_name: "notes.txt".to_string(),
                error: "Skipped non-audio file".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_embedded_tags_take_priority() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "track01.mp3");

    let tags = Arc::new(StubTags::default().with_tags("track01.mp3", "DJ Nova", "Midnight Drive"));
    let summary = processor(tags.clone(), quick_options())
        .process_folder(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.embedded, 1);
    assert!(summary.failure_log.is_none());
    assert!(!dir.path().join(FAILURE_LOG_FILE_NAME).exists());
}

#[tokio::test]
async fn test_no_covers_option_skips_export() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "DJ Nova - Midnight Drive.flac");

    let tags = Arc::new(StubTags::default());
    let summary = processor(tags.clone(), quick_options().with_export_covers(false))
        .process_folder(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.embedded, 1);
    assert_eq!(summary.exported, 0);
    assert!(!dir.path().join(EXPORT_DIR_NAME).exists());
}

#[tokio::test]
async fn test_tag_failures_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a - Midnight Drive.mp3");
    touch(dir.path(), "b - Midnight Drive.mp3");

    let tags = Arc::new(StubTags {
        unreadable: vec!["a - Midnight Drive.mp3".to_string()],
        read_only: vec!["b - Midnight Drive.mp3".to_string()],
        ..StubTags::default()
    });
    let summary = processor(tags.clone(), quick_options())
        .process_folder(dir.path())
        .await
        .unwrap();

    assert_eq!(summary.embedded, 0);
    assert_eq!(
        read_log(dir.path()),
        vec![
            FailureEntry::Error {
                file_name: "a - Midnight Drive.mp3".to_string(),
                error: "Failed to read tags: corrupt header".to_string(),
            },
            FailureEntry::Error {
                file_name: "b - Midnight Drive.mp3".to_string(),
                error: "Tag update failed: permission denied".to_string(),
            },
        ]
    );
    // The export runs before the embed, so the side file is there anyway.
    assert!(dir
        .path()
        .join(EXPORT_DIR_NAME)
        .join("b - Midnight Drive.jpg")
        .exists());
}

#[tokio::test]
async fn test_log_is_appended_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "Unknown - Nothing.mp3");

    let tags = Arc::new(StubTags::default());
    let processor = processor(tags, quick_options());
    processor.process_folder(dir.path()).await.unwrap();
    processor.process_folder(dir.path()).await.unwrap();

    assert_eq!(read_log(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_single_file_run_logs_beside_file() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "Unknown - Nothing.mp3");
    touch(dir.path(), "DJ Nova - Midnight Drive.mp3");

    let tags = Arc::new(StubTags::default());
    let processor = processor(tags.clone(), quick_options());
    let summary = processor
        .run(&dir.path().join("Unknown - Nothing.mp3"))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert!(tags.written_files().is_empty());
    let log = read_log(dir.path());
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].file_name(), "Unknown - Nothing.mp3");
}

#[tokio::test]
async fn test_missing_source_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let tags = Arc::new(StubTags::default());

    let err = processor(tags, quick_options())
        .run(&dir.path().join("does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SourceNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_delay_after_each_audio_file() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "DJ Nova - Midnight Drive.mp3");
    touch(dir.path(), "Unknown - Nothing.mp3");
    touch(dir.path(), "readme.md");

    let tags = Arc::new(StubTags::default());
    let start = tokio::time::Instant::now();
    processor(tags, RunOptions::default().with_request_delay_ms(1500))
        .process_folder(dir.path())
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(3000));
}
