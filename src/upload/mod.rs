//! Upload line images and assemble dataset rows for the ones that made it.
//!
//! Per-image problems never abort a run: a missing file or a failed upload
//! becomes a [`SkipReason`], is logged, counted in [`UploadSummary`] and left
//! out of the CSV. Only input/output I/O is fatal.

pub mod store;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::record::{write_rows, OutputRow, WritingType, DEFAULT_SCORE};
pub use store::{object_url, GcsStore, ObjectStore};

/// One segmented line image and its transcription.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageItem {
    pub image_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No file with that name in the image directory.
    Missing,
    UploadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Uploaded(OutputRow),
    Skipped {
        image_name: String,
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub submitted: usize,
    pub uploaded: usize,
    pub missing: usize,
    pub failed: usize,
}

impl UploadSummary {
    fn record(&mut self, outcome: &ItemOutcome) {
        self.submitted += 1;
        match outcome {
            ItemOutcome::Uploaded(_) => self.uploaded += 1,
            ItemOutcome::Skipped {
                reason: SkipReason::Missing,
                ..
            } => self.missing += 1,
            ItemOutcome::Skipped {
                reason: SkipReason::UploadFailed(_),
                ..
            } => self.failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.missing + self.failed
    }
}

/// Rows of every uploaded image, in input order, plus the outcome counts.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub rows: Vec<OutputRow>,
    pub summary: UploadSummary,
}

/// Read the JSON array of `{image_name, text}` objects.
pub fn load_items(json_file: &Path) -> Result<Vec<ImageItem>> {
    let file = File::open(json_file).with_context(|| format!("opening {}", json_file.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", json_file.display()))
}

/// Blocking check; async callers use `tokio::fs::try_exists` instead.
pub fn image_exists(image_name: &str, images_dir: &Path) -> bool {
    images_dir.join(image_name).exists()
}

/// `prefix + basename(path)`
pub fn object_key(prefix: &str, path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no usable file name in {}", path.display()))?;
    Ok(format!("{}{}", prefix, name))
}

/// Upload `path` under `prefix` and return its public URL.
pub async fn upload_to_store<S: ObjectStore>(store: &S, path: &Path, prefix: &str) -> Result<String> {
    let key = object_key(prefix, path)?;
    store.upload(path, &key).await?;
    let url = store.public_url(&key);
    info!(file = %path.display(), url = %url, "uploaded");
    Ok(url)
}

#[instrument(level = "debug", skip(store, item, images_dir), fields(image = %item.image_name))]
pub async fn process_image<S: ObjectStore>(
    store: &S,
    item: &ImageItem,
    prefix: &str,
    images_dir: &Path,
) -> ItemOutcome {
    let path = images_dir.join(&item.image_name);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        warn!(image = %item.image_name, "image not found locally, skipping");
        return ItemOutcome::Skipped {
            image_name: item.image_name.clone(),
            reason: SkipReason::Missing,
        };
    }

    match upload_to_store(store, &path, prefix).await {
        Ok(img_url) => ItemOutcome::Uploaded(OutputRow {
            origin_id: item.image_name.clone(),
            img_url,
            target: item.text.clone(),
            writing_type: WritingType::NonUchen,
            score: DEFAULT_SCORE,
        }),
        Err(e) => {
            warn!(file = %path.display(), error = %format!("{:#}", e), "upload failed, skipping");
            ItemOutcome::Skipped {
                image_name: item.image_name.clone(),
                reason: SkipReason::UploadFailed(format!("{:#}", e)),
            }
        }
    }
}

/// Upload every item with at most `workers` uploads in flight.
///
/// All tasks are joined before anything is aggregated; rows keep input order.
pub async fn process_images<S: ObjectStore>(
    store: Arc<S>,
    items: Vec<ImageItem>,
    prefix: &str,
    images_dir: &Path,
    workers: usize,
) -> Result<UploadReport> {
    let sem = Arc::new(Semaphore::new(workers.max(1)));
    let prefix: Arc<str> = Arc::from(prefix);
    let images_dir: Arc<PathBuf> = Arc::new(images_dir.to_path_buf());
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let store = Arc::clone(&store);
        let sem = Arc::clone(&sem);
        let prefix = Arc::clone(&prefix);
        let images_dir = Arc::clone(&images_dir);

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.context("upload pool closed")?;
            Ok::<_, anyhow::Error>(process_image(store.as_ref(), &item, &prefix, &images_dir).await)
        }));
    }

    // handles are awaited in submission order, so rows follow input order
    let mut report = UploadReport::default();
    for handle in handles {
        let outcome = handle.await.context("upload task panicked")??;
        report.summary.record(&outcome);
        if let ItemOutcome::Uploaded(row) = outcome {
            report.rows.push(row);
        }
    }

    info!(
        submitted = report.summary.submitted,
        uploaded = report.summary.uploaded,
        missing = report.summary.missing,
        failed = report.summary.failed,
        "image uploads finished"
    );
    Ok(report)
}

/// Header + rows, overwriting `csv_output`.
pub fn write_to_csv(csv_output: &Path, rows: &[OutputRow]) -> Result<u64> {
    let written = write_rows(csv_output, rows)?;
    info!(output = %csv_output.display(), rows = written, "CSV file saved");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::{collections::HashSet, fs, sync::Mutex, time::Duration};
    use tempfile::tempdir;

    /// In-memory store; keys listed in `fail` are rejected.
    #[derive(Default)]
    struct FakeStore {
        fail: HashSet<String>,
        uploaded: Mutex<Vec<String>>,
    }

    impl ObjectStore for FakeStore {
        async fn upload(&self, _path: &Path, key: &str) -> Result<()> {
            // later keys finish first so completion order differs from input order
            let delay = 30u64.saturating_sub(key.len() as u64 * 2);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if self.fail.contains(key) {
                bail!("simulated outage for {}", key);
            }
            self.uploaded.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            object_url("test-bucket", "storage.example.com", key)
        }
    }

    fn item(name: &str, text: &str) -> ImageItem {
        ImageItem {
            image_name: name.to_string(),
            text: text.to_string(),
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"png-bytes").unwrap();
    }

    #[test]
    fn loads_items_from_json_array() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("coords.json");
        fs::write(
            &path,
            r#"[{"image_name": "a.png", "text": "ཀ"}, {"image_name": "b.png", "text": "ཁ", "bbox": [1,2]}]"#,
        )
        .unwrap();

        let items = load_items(&path).unwrap();
        assert_eq!(items, vec![item("a.png", "ཀ"), item("b.png", "ཁ")]);
    }

    #[test]
    fn key_uses_basename() {
        let key = object_key("ume_line_images/", Path::new("data/imgs/line_01.png")).unwrap();
        assert_eq!(key, "ume_line_images/line_01.png");
    }

    #[test]
    fn existence_check() {
        let tmp = tempdir().unwrap();
        touch(tmp.path(), "here.png");
        assert!(image_exists("here.png", tmp.path()));
        assert!(!image_exists("gone.png", tmp.path()));
    }

    #[tokio::test]
    async fn uploaded_item_becomes_row() {
        let tmp = tempdir().unwrap();
        touch(tmp.path(), "l1.png");
        let store = FakeStore::default();

        let outcome = process_image(&store, &item("l1.png", "text"), "p/", tmp.path()).await;

        assert_eq!(
            outcome,
            ItemOutcome::Uploaded(OutputRow {
                origin_id: "l1.png".to_string(),
                img_url: "https://test-bucket.storage.example.com/p/l1.png".to_string(),
                target: "text".to_string(),
                writing_type: WritingType::NonUchen,
                score: 15,
            })
        );
        assert_eq!(*store.uploaded.lock().unwrap(), vec!["p/l1.png".to_string()]);
    }

    #[tokio::test]
    async fn missing_image_is_skipped_without_upload() {
        let tmp = tempdir().unwrap();
        let store = FakeStore::default();

        let outcome = process_image(&store, &item("absent.png", "t"), "p/", tmp.path()).await;

        assert_eq!(
            outcome,
            ItemOutcome::Skipped {
                image_name: "absent.png".to_string(),
                reason: SkipReason::Missing
            }
        );
        assert!(store.uploaded.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "current_thread")]
    async fn dangling_link_counts_as_missing() {
        let tmp = tempdir().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone.png"), tmp.path().join("link.png")).unwrap();
        touch(tmp.path(), "real.png");
        let store = Arc::new(FakeStore::default());

        let report = process_images(
            Arc::clone(&store),
            vec![item("link.png", "a"), item("real.png", "b")],
            "p/",
            tmp.path(),
            1,
        )
        .await
        .unwrap();

        assert!(!image_exists("link.png", tmp.path()));
        assert_eq!(report.summary.missing, 1);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].origin_id, "real.png");
    }

    #[tokio::test]
    async fn failures_are_counted_and_excluded_in_order() {
        let tmp = tempdir().unwrap();
        for name in ["a.png", "bb.png", "ccc.png", "dddd.png", "eeeee.png"] {
            touch(tmp.path(), name);
        }
        let store = Arc::new(FakeStore {
            fail: HashSet::from(["p/ccc.png".to_string()]),
            ..Default::default()
        });
        let items = vec![
            item("a.png", "1"),
            item("bb.png", "2"),
            item("missing.png", "x"),
            item("ccc.png", "3"),
            item("dddd.png", "4"),
            item("eeeee.png", "5"),
        ];

        let report = process_images(store, items, "p/", tmp.path(), 2)
            .await
            .unwrap();

        assert_eq!(
            report.summary,
            UploadSummary {
                submitted: 6,
                uploaded: 4,
                missing: 1,
                failed: 1
            }
        );
        assert_eq!(report.summary.skipped(), 2);
        let ids: Vec<&str> = report.rows.iter().map(|r| r.origin_id.as_str()).collect();
        assert_eq!(ids, vec!["a.png", "bb.png", "dddd.png", "eeeee.png"]);
    }

    #[tokio::test]
    async fn all_missing_still_succeeds_with_header_only_csv() {
        let tmp = tempdir().unwrap();
        let store = Arc::new(FakeStore::default());
        let items = vec![item("x.png", "1"), item("y.png", "2")];

        let report = process_images(store, items, "p/", tmp.path(), 4)
            .await
            .unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.summary.missing, 2);

        let out = tmp.path().join("ume_output.csv");
        assert_eq!(write_to_csv(&out, &report.rows).unwrap(), 0);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "origin_id,img_url,target,writing_type,score\n"
        );
    }
}
