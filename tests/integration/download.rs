//! Download scenarios: verification ordering, lockfile output, zip shape

use crate::support::ScriptedRepo;
use quarry::{Config, Downloader, ModuleId, QuarryError, SumDb};
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn config(temp: &TempDir) -> Config {
    Config {
        cache_root: Some(temp.path().to_path_buf()),
        sum_file: Some(temp.path().join("project.sum")),
        quiet: true,
    }
}

#[tokio::test]
async fn download_extracts_and_records_hash() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let sums = Arc::new(SumDb::new(config.sum_file.clone()));
    let backend = ScriptedRepo::new("m.io/a", "v1.0.0");
    let downloader = Downloader::new(&config, Arc::clone(&sums)).unwrap();

    let id = ModuleId::new("m.io/a", "v1.0.0");
    let dir = downloader.download(&id, &backend).await.unwrap();

    assert_eq!(dir, temp.path().join("m.io/a@v1.0.0"));
    assert_eq!(fs::read(dir.join("go.mod")).unwrap(), b"module m.io/a\n");
    assert_eq!(fs::read(dir.join("lib.rs")).unwrap(), b"pub fn f() {}\n");

    let at_v = temp.path().join("cache/download/m.io/a/@v");
    assert!(at_v.join("v1.0.0.zip").exists());
    let h = fs::read_to_string(at_v.join("v1.0.0.ziphash")).unwrap();
    assert!(h.starts_with("h1:"));

    sums.flush().unwrap();
    let written = fs::read_to_string(temp.path().join("project.sum")).unwrap();
    assert_eq!(written, format!("m.io/a v1.0.0 {h}\n"));
    assert_eq!(downloader.sum(&id), Some(h));
}

#[tokio::test]
async fn existing_tree_and_zip_skip_the_backend() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let sums = Arc::new(SumDb::new(config.sum_file.clone()));
    let backend = ScriptedRepo::new("m.io/a", "v1.0.0");
    let downloader = Downloader::new(&config, Arc::clone(&sums)).unwrap();
    let id = ModuleId::new("m.io/a", "v1.0.0");

    let dir = downloader.download(&id, &backend).await.unwrap();
    assert_eq!(backend.zip_calls.load(Ordering::SeqCst), 1);

    // Extracted tree present: nothing to do.
    downloader.download(&id, &backend).await.unwrap();
    assert_eq!(backend.zip_calls.load(Ordering::SeqCst), 1);

    // Tree removed but zip kept: re-extract without fetching.
    fs::remove_dir_all(&dir).unwrap();
    let dir = downloader.download(&id, &backend).await.unwrap();
    assert_eq!(backend.zip_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fs::read(dir.join("go.mod")).unwrap(), b"module m.io/a\n");
}

#[test]
fn recorded_mismatch_aborts_before_publication() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    fs::write(
        config.sum_file.as_ref().unwrap(),
        "m.io/a v1.0.0 h1:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=\n",
    )
    .unwrap();
    let sums = Arc::new(SumDb::new(config.sum_file.clone()));
    let backend = ScriptedRepo::new("m.io/a", "v1.0.0");
    let downloader = Downloader::new(&config, sums).unwrap();
    let id = ModuleId::new("m.io/a", "v1.0.0");

    let rt = tokio::runtime::Runtime::new().unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        rt.block_on(downloader.download(&id, &backend))
    }));
    assert!(result.is_err());

    // Nothing tainted reached the durable cache.
    let at_v = temp.path().join("cache/download/m.io/a/@v");
    assert!(!at_v.join("v1.0.0.zip").exists());
    assert!(!at_v.join("v1.0.0.ziphash").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_downloads_write_canonical_lockfile() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let sums = Arc::new(SumDb::new(config.sum_file.clone()));
    let downloader = Arc::new(Downloader::new(&config, Arc::clone(&sums)).unwrap());

    let a = tokio::spawn({
        let downloader = Arc::clone(&downloader);
        async move {
            let backend = ScriptedRepo::new("m.io/a", "v1.0.0");
            downloader
                .download(&ModuleId::new("m.io/a", "v1.0.0"), &backend)
                .await
        }
    });
    let b = tokio::spawn({
        let downloader = Arc::clone(&downloader);
        async move {
            let backend = ScriptedRepo::new("m.io/b", "v2.0.0");
            downloader
                .download(&ModuleId::new("m.io/b", "v2.0.0"), &backend)
                .await
        }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    sums.flush().unwrap();
    let written = fs::read_to_string(temp.path().join("project.sum")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("m.io/a v1.0.0 h1:"));
    assert!(lines[1].starts_with("m.io/b v2.0.0 h1:"));
}

#[tokio::test]
async fn stray_zip_entry_fails_the_download() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let sums = Arc::new(SumDb::new(config.sum_file.clone()));
    let mut backend = ScriptedRepo::new("m.io/a", "v1.0.0");
    backend
        .zip_entries
        .push(("../evil".to_string(), b"x".to_vec()));
    let downloader = Downloader::new(&config, sums).unwrap();
    let id = ModuleId::new("m.io/a", "v1.0.0");

    let err = downloader.download(&id, &backend).await.unwrap_err();
    assert!(matches!(err, QuarryError::ZipShape { .. }));
    assert!(!temp
        .path()
        .join("cache/download/m.io/a/@v/v1.0.0.zip")
        .exists());
}
