//! State store properties exercised through the public repository API.

use lc0acquire::models::{AttemptOutcome, CatalogEntry, FetchStatus};
use lc0acquire::repository::{DbContext, EntryRepository};

async fn open(max_attempts: u32) -> (tempfile::TempDir, EntryRepository) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::new(&dir.path().join("state.db"), max_attempts);
    ctx.init_schema().await.unwrap();
    (dir, ctx.entries())
}

#[tokio::test]
async fn test_insert_is_idempotent() {
    let (_dir, repo) = open(3).await;
    let entry = CatalogEntry::new(11, "2021-05-01 10:00:00");

    assert_eq!(repo.insert_many(&[entry.clone()]).await.unwrap(), 1);
    repo.record_attempt(11, AttemptOutcome::Failure, "timed out")
        .await
        .unwrap();

    // Re-discovery must not reset bookkeeping.
    let changed = CatalogEntry::new(11, "1999-01-01");
    assert_eq!(
        repo.insert_many(&[entry.clone(), changed]).await.unwrap(),
        0
    );

    let tracked = repo.get(11).await.unwrap().unwrap();
    assert_eq!(tracked.entry, entry);
    assert_eq!(tracked.status, FetchStatus::Retry);
    assert_eq!(tracked.attempts, 1);
    assert_eq!(repo.stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn test_attempts_never_decrease() {
    let (_dir, repo) = open(5).await;
    repo.insert_many(&[CatalogEntry::new(1, "2020-01-01")])
        .await
        .unwrap();

    let mut last = 0;
    let steps = [
        AttemptOutcome::Failure,
        AttemptOutcome::Failure,
        AttemptOutcome::Success,
    ];
    for outcome in steps {
        repo.record_attempt(1, outcome, "step").await.unwrap();
        repo.insert_many(&[CatalogEntry::new(1, "2020-01-01")])
            .await
            .unwrap();
        repo.mark_processed(1).await.unwrap();

        let attempts = repo.get(1).await.unwrap().unwrap().attempts;
        assert!(attempts > last);
        last = attempts;
    }
    assert_eq!(last, 3);
}

#[tokio::test]
async fn test_exhausted_entries_leave_the_queue() {
    let (_dir, repo) = open(2).await;
    repo.insert_many(&[
        CatalogEntry::new(1, "2020-01-01"),
        CatalogEntry::new(2, "2020-01-02"),
    ])
    .await
    .unwrap();

    assert_eq!(
        repo.record_attempt(1, AttemptOutcome::Failure, "a").await.unwrap(),
        FetchStatus::Retry
    );
    assert_eq!(
        repo.record_attempt(1, AttemptOutcome::Failure, "b").await.unwrap(),
        FetchStatus::Failed
    );

    let pending: Vec<i64> = repo
        .list_pending(None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(pending, vec![2]);

    let stats = repo.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 1);
}

#[tokio::test]
async fn test_list_pending_limit_and_order() {
    let (_dir, repo) = open(3).await;
    let entries: Vec<CatalogEntry> = (1..=20)
        .map(|day| CatalogEntry::new(day, format!("2020-01-{:02} 08:00:00", day)))
        .collect();
    assert_eq!(repo.insert_many(&entries).await.unwrap(), 20);

    let pending = repo.list_pending(Some(5)).await.unwrap();
    let ids: Vec<i64> = pending.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![20, 19, 18, 17, 16]);
    assert!(pending
        .windows(2)
        .all(|pair| pair[0].occurred_at >= pair[1].occurred_at));
}
