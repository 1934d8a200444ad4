use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use mindmatch_core::auth::StaticTokenProvider;
use mindmatch_core::config::JournalConfig;
use mindmatch_core::db::LocalStore;
use mindmatch_core::state::{SyncSnapshot, SyncStatus};
use mindmatch_core::sync::{DrainOutcome, QueueReason, WriteOutcome};
use mindmatch_core::{Entry, EntryId, PendingChange, RemoteError};
use pretty_assertions::assert_eq;

use crate::auth::TokenSource;
use crate::commands::auth_cmd::describe_token_source;
use crate::commands::common::{
    describe_write, entry_preview, entry_to_list_item, format_entry_lines, format_pending_lines,
    format_relative_time, normalize_content, normalize_entry_identifier, read_config_file,
    resolve_entry_text, Journal,
};
use crate::commands::new::start_new_entry;
use crate::commands::status::format_status_lines;
use crate::commands::sync::{describe_drain, sync_journal};
use crate::commands::write::write_current_entry;
use crate::error::CliError;

async fn local_journal(path: &Path) -> Journal {
    Journal::open(
        JournalConfig::default(),
        path,
        false,
        StaticTokenProvider::new(None),
    )
    .await
    .unwrap()
}

/// Journal with a remote configured but `--offline` set, so nothing is sent
async fn offline_journal(path: &Path) -> Journal {
    let config = JournalConfig::from_json(r#"{"api_base_url": "http://127.0.0.1:9"}"#).unwrap();
    Journal::open(
        config,
        path,
        true,
        StaticTokenProvider::new(Some("token".to_string())),
    )
    .await
    .unwrap()
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn resolve_entry_text_joins_words() {
    let parts = vec!["felt".to_string(), "calm".to_string(), "today".to_string()];
    assert_eq!(resolve_entry_text(&parts).unwrap(), "felt calm today");
    assert!(matches!(
        resolve_entry_text(&[" ".to_string()]),
        Err(CliError::EmptyContent)
    ));
}

#[test]
fn entry_identifier_must_not_be_blank() {
    assert_eq!(
        normalize_entry_identifier(" e1 ").unwrap(),
        EntryId::from("e1")
    );
    assert!(matches!(
        normalize_entry_identifier("  "),
        Err(CliError::EmptyEntryId)
    ));
}

#[test]
fn relative_time_buckets() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert_eq!(format_relative_time(now, now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m ago");
    assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h ago");
    assert_eq!(format_relative_time(now - Duration::days(2), now), "2d ago");
    assert_eq!(format_relative_time(now - Duration::days(14), now), "2w ago");
    assert_eq!(format_relative_time(now - Duration::days(65), now), "2mo ago");
    assert_eq!(format_relative_time(now - Duration::days(800), now), "2y ago");
    assert_eq!(format_relative_time(now + Duration::hours(1), now), "just now");
}

#[test]
fn preview_uses_first_line_and_truncates() {
    let entry = Entry::new("A long first line about the morning walk\nsecond line");
    assert_eq!(entry_preview(&entry, 12), "A long first...");
    assert_eq!(
        entry_preview(&entry, 80),
        "A long first line about the morning walk"
    );
}

#[test]
fn list_items_flag_queued_entries() {
    let queued_entry = Entry::new("queued thought");
    let synced_entry = Entry::new("synced thought");
    let queue = vec![PendingChange::save(queued_entry.clone())];

    let item = entry_to_list_item(&queued_entry, &queue);
    assert!(item.pending);
    assert_eq!(item.word_count, 2);
    assert!(!entry_to_list_item(&synced_entry, &queue).pending);

    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["pending"], serde_json::Value::Bool(true));
    assert_eq!(json["preview"], "queued thought");

    let lines = format_entry_lines(&[queued_entry, synced_entry], &queue);
    assert!(lines[0].starts_with('*'));
    assert!(lines[1].starts_with(' '));
}

#[test]
fn pending_lines_are_numbered_in_queue_order() {
    let queue = vec![
        PendingChange::save(Entry::with_id(EntryId::from("a"), "x", Utc::now())),
        PendingChange::delete(EntryId::from("b")),
    ];
    let lines = format_pending_lines(&queue);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("  1. save   a"));
    assert!(lines[1].starts_with("  2. delete b"));
}

#[test]
fn write_outcomes_are_described() {
    assert_eq!(describe_write(&WriteOutcome::Committed, "saved"), "synced");
    assert_eq!(
        describe_write(&WriteOutcome::LocalOnly, "saved"),
        "saved locally (no remote configured)"
    );
    assert_eq!(
        describe_write(&WriteOutcome::Queued(QueueReason::Offline), "deleted"),
        "deleted locally, will sync when online"
    );
    assert!(describe_write(
        &WriteOutcome::Queued(QueueReason::AuthRequired("expired".to_string())),
        "saved"
    )
    .contains("mindmatch auth login"));
    assert!(describe_write(
        &WriteOutcome::Queued(QueueReason::Remote(RemoteError::Server("HTTP 502".to_string()))),
        "saved"
    )
    .ends_with("(Server error: HTTP 502)"));
}

#[test]
fn drain_outcomes_are_described() {
    assert_eq!(
        describe_drain(&DrainOutcome::Drained { replayed: 0 }),
        "Nothing to sync"
    );
    assert_eq!(
        describe_drain(&DrainOutcome::Drained { replayed: 3 }),
        "Synced 3 queued change(s)"
    );
    assert_eq!(
        describe_drain(&DrainOutcome::Halted {
            replayed: 1,
            remaining: 2,
            error: RemoteError::Network("timed out".to_string()),
        }),
        "Synced 1 change(s), 2 still queued: Network error: timed out"
    );
}

#[test]
fn status_lines_show_pointer_and_queue() {
    let snapshot = SyncSnapshot {
        status: SyncStatus::Pending,
        online: true,
        pending_changes: 2,
        current_entry_id: Some(EntryId::from("e1")),
    };
    assert_eq!(
        format_status_lines(&snapshot),
        vec![
            "Status: pending".to_string(),
            "Online: yes".to_string(),
            "Pending changes: 2".to_string(),
            "Current entry: e1".to_string(),
        ]
    );
}

#[test]
fn token_source_description() {
    assert!(describe_token_source(None).starts_with("Not signed in"));
    assert_eq!(
        describe_token_source(Some(TokenSource::Keychain)),
        "Signed in (token from system keychain)"
    );
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = read_config_file(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, JournalConfig::default());
}

#[test]
fn config_file_is_parsed_and_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    std::fs::write(
        &path,
        r#"{"api_base_url": "https://journal.example.com/", "autosave_delay_ms": 500}"#,
    )
    .unwrap();
    let config = read_config_file(&path).unwrap();
    assert_eq!(
        config.entries_url().as_deref(),
        Some("https://journal.example.com/entries")
    );
    assert_eq!(config.autosave_delay_ms, 500);

    std::fs::write(&path, r#"{"api_base_url": "journal.example.com"}"#).unwrap();
    assert!(matches!(read_config_file(&path), Err(CliError::Config(_))));
}

#[tokio::test]
async fn write_without_remote_stays_local_and_reuses_current_entry() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal.db");

    let journal = local_journal(&db_path).await;
    let (first_id, outcome) = write_current_entry(&journal, "first draft").await.unwrap();
    assert_eq!(outcome, WriteOutcome::LocalOnly);
    drop(journal);

    let journal = local_journal(&db_path).await;
    let (second_id, _) = write_current_entry(&journal, "second draft").await.unwrap();
    assert_eq!(first_id, second_id);

    let entries = journal.engine.list_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content(), "second draft");
    assert_eq!(journal.engine.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn offline_write_is_queued_until_sync() {
    let dir = tempfile::tempdir().unwrap();
    let journal = offline_journal(&dir.path().join("journal.db")).await;

    let (id, outcome) = write_current_entry(&journal, "on the train").await.unwrap();
    assert_eq!(outcome, WriteOutcome::Queued(QueueReason::Offline));

    let queue = journal.engine.local().pending_queue().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].entry_id(), &id);

    assert_eq!(
        sync_journal(&journal).await.unwrap(),
        DrainOutcome::Offline
    );
    assert_eq!(journal.engine.pending_count().unwrap(), 1);
}

#[tokio::test]
async fn sync_requires_a_remote() {
    let dir = tempfile::tempdir().unwrap();
    let journal = local_journal(&dir.path().join("journal.db")).await;
    assert!(matches!(
        sync_journal(&journal).await,
        Err(CliError::SyncNotConfigured)
    ));
}

#[tokio::test]
async fn new_entry_binds_a_fresh_pointer() {
    let dir = tempfile::tempdir().unwrap();
    let journal = local_journal(&dir.path().join("journal.db")).await;
    let (old_id, _) = write_current_entry(&journal, "yesterday").await.unwrap();

    let (blank_id, outcome) = start_new_entry(&journal, None).await.unwrap();
    assert_ne!(blank_id, old_id);
    assert_eq!(outcome, None);
    assert_eq!(journal.engine.state().current_entry_id(), Some(blank_id));

    let (text_id, outcome) = start_new_entry(&journal, Some("today")).await.unwrap();
    assert_eq!(outcome, Some(WriteOutcome::LocalOnly));

    let ids = journal
        .engine
        .list_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.id().clone())
        .collect::<Vec<_>>();
    assert!(ids.contains(&old_id));
    assert!(ids.contains(&text_id));
    assert_eq!(ids.len(), 2);
}
