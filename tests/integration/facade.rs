//! Facade scenarios: single-flight collapsing and hash-alias shortcuts

use crate::support::ScriptedRepo;
use quarry::{CachingRepo, Config, Repo, SumDb};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

const PSEUDO: &str = "v0.0.0-20200101000000-abcdef012345";

fn config(temp: &TempDir) -> Config {
    Config {
        cache_root: Some(temp.path().to_path_buf()),
        sum_file: Some(temp.path().join("project.sum")),
        quiet: true,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_manifest_lookups_collapse() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let backend = Arc::new(ScriptedRepo::new("m.io/a", PSEUDO));
    let sums = Arc::new(SumDb::new(config.sum_file.clone()));
    let repo = Arc::new(CachingRepo::new(
        Arc::clone(&backend) as Arc<dyn Repo>,
        &config,
        sums,
    ));

    let first = tokio::spawn({
        let repo = Arc::clone(&repo);
        async move { repo.go_mod("master").await }
    });
    let second = tokio::spawn({
        let repo = Arc::clone(&repo);
        async move { repo.go_mod("master").await }
    });
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    assert_eq!(a, b"module m.io/a\n".to_vec());
    assert_eq!(a, b);
    assert_eq!(backend.stat_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.go_mod_calls.load(Ordering::SeqCst), 1);

    // The branch lookup left the pseudo-version on disk, so commit-hash
    // aliases now resolve without the backend.
    let by_short = repo.stat("abcdef012345").await.unwrap();
    assert_eq!(by_short.version, PSEUDO);
    let by_full = repo
        .stat("abcdef0123456789abcdef0123456789abcdef01")
        .await
        .unwrap();
    assert_eq!(by_full, by_short);
    assert_eq!(backend.stat_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_stat_is_stable_across_aliases() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let backend = Arc::new(ScriptedRepo::new("m.io/a", PSEUDO));
    let repo = CachingRepo::new(
        Arc::clone(&backend) as Arc<dyn Repo>,
        &config,
        Arc::new(SumDb::new(None)),
    );

    let via_branch = repo.stat("master").await.unwrap();
    let via_canonical = repo.stat(PSEUDO).await.unwrap();
    let again = repo.stat("master").await.unwrap();

    assert_eq!(via_branch, via_canonical);
    assert_eq!(via_branch, again);
    assert_eq!(backend.stat_calls.load(Ordering::SeqCst), 1);
}
