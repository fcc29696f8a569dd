// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History importer integration tests.

mod common;

use tokio_util::sync::CancellationToken;

use courier_core::{ChatStore, CourierError};
use courier_sync::{message_key, SyncError, SyncState};
use common::{days_ago, fixture, make_chat, make_msg, ACCOUNT};

#[tokio::test]
async fn example_scenario_two_created_one_skipped_watermark_advances() {
    let f = fixture();
    f.store.add_chat(make_chat("g1@group", "Project Team")).await;

    let old = make_msg("m-old", "g1@group", "old news", days_ago(5));
    let mid = make_msg("m-mid", "g1@group", "mid", days_ago(3));
    let new = make_msg("m-new", "g1@group", "latest", days_ago(1));
    f.store.add_message(old.clone()).await;
    f.store.add_message(mid.clone()).await;
    f.store.add_message(new.clone()).await;

    // The T-5d message was exported by an earlier run.
    let old_key = message_key(ACCOUNT, "g1@group", &old);
    f.store
        .mark_key_exported(ACCOUNT, "g1@group", &old_key, 9000)
        .await
        .unwrap();

    let mut opts = f.engine.default_options();
    opts.days_limit = 7;

    let progress = f
        .engine
        .sync_history(ACCOUNT, opts, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(progress.state, SyncState::Completed);
    assert_eq!(progress.synced_messages, 2);
    assert_eq!(progress.failed_messages, 0);
    assert_eq!(f.helpdesk.created_count().await, 2);

    let watermark = f
        .store
        .export_watermark(ACCOUNT, "g1@group")
        .await
        .unwrap()
        .expect("watermark must be set");
    assert_eq!(watermark, new.timestamp);
}

#[tokio::test]
async fn second_run_over_unchanged_chat_creates_nothing() {
    let f = fixture();
    f.store.add_chat(make_chat("c1@host", "Alice")).await;
    for i in 0..3 {
        f.store
            .add_message(make_msg(
                &format!("m{i}"),
                "c1@host",
                &format!("msg {i}"),
                days_ago(3) + chrono::Duration::minutes(i),
            ))
            .await;
    }

    let opts = f.engine.default_options();
    f.engine
        .sync_history(ACCOUNT, opts.clone(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(f.helpdesk.created_count().await, 3);

    let progress = f
        .engine
        .sync_history(ACCOUNT, opts, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        f.helpdesk.created_count().await,
        3,
        "re-run must not re-export"
    );
    assert_eq!(progress.synced_messages, 0);
    assert_eq!(progress.failed_messages, 0);
}

#[tokio::test]
async fn group_messages_carry_time_and_sender_prefix() {
    let f = fixture();
    f.store.add_chat(make_chat("g1@group", "Team")).await;
    f.store
        .add_message(make_msg("m1", "g1@group", "hello all", days_ago(1)))
        .await;

    f.engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap();

    let created = f.helpdesk.created_messages().await;
    assert_eq!(created.len(), 1);
    assert!(created[0].content.contains("15551230001: hello all"));
    assert!(created[0].content.starts_with('['));
    assert!(created[0].external_ref.is_some());
}

#[tokio::test]
async fn per_message_failures_are_isolated_and_counted() {
    let f = fixture();
    f.store.add_chat(make_chat("c1@host", "Alice")).await;
    f.store
        .add_message(make_msg("m1", "c1@host", "one", days_ago(3)))
        .await;
    f.store
        .add_message(make_msg("m2", "c1@host", "two", days_ago(2)))
        .await;

    f.helpdesk.fail_message_create(true);
    let progress = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(progress.state, SyncState::Completed);
    assert_eq!(progress.synced_messages, 0);
    assert_eq!(progress.failed_messages, 2);
    // Failed messages never advance the watermark.
    assert!(f
        .store
        .export_watermark(ACCOUNT, "c1@host")
        .await
        .unwrap()
        .is_none());

    // A retry after the outage exports everything.
    f.helpdesk.fail_message_create(false);
    let progress = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(progress.synced_messages, 2);
    assert_eq!(f.helpdesk.created_count().await, 2);
}

#[tokio::test]
async fn watermark_bounds_the_next_run() {
    let f = fixture();
    f.store.add_chat(make_chat("c1@host", "Alice")).await;
    f.store
        .add_message(make_msg("m1", "c1@host", "early", days_ago(4)))
        .await;

    f.engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(f.helpdesk.created_count().await, 1);

    // New message after the watermark; the old one is filtered by time, not
    // just by key.
    f.store
        .add_message(make_msg("m2", "c1@host", "late", days_ago(1)))
        .await;
    let progress = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(progress.synced_messages, 1);
    assert_eq!(progress.total_messages, 1, "watermark must bound the scan");
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one_run() {
    let f = fixture();
    f.store.add_chat(make_chat("c1@host", "Alice")).await;
    for i in 0..40 {
        f.store
            .add_message(make_msg(
                &format!("m{i}"),
                "c1@host",
                "x",
                days_ago(3) + chrono::Duration::seconds(i),
            ))
            .await;
    }

    let engine_a = f.engine.clone();
    let engine_b = f.engine.clone();
    let opts = f.engine.default_options();
    let opts_b = opts.clone();

    let a = tokio::spawn(async move {
        engine_a
            .sync_history(ACCOUNT, opts, CancellationToken::new())
            .await
    });
    let b = tokio::spawn(async move {
        engine_b
            .sync_history(ACCOUNT, opts_b, CancellationToken::new())
            .await
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    let already_running = results
        .iter()
        .filter(|r| matches!(r, Err(SyncError::AlreadyRunning(_))))
        .count();

    // Exactly one run proceeds; if the loser lost the race it got a live
    // snapshot back.
    assert_eq!(ok_count + already_running, 2);
    assert!(ok_count >= 1);
    if already_running == 1 {
        let Err(SyncError::AlreadyRunning(snapshot)) =
            results.iter().find(|r| r.is_err()).unwrap()
        else {
            panic!("expected AlreadyRunning");
        };
        assert_eq!(snapshot.account_id, ACCOUNT);
        assert!(snapshot.is_running());
    }

    // No message was exported twice.
    assert_eq!(f.helpdesk.created_count().await, 40);
}

#[tokio::test]
async fn cancellation_marks_run_failed_but_keeps_watermarks() {
    let f = fixture();
    f.store.add_chat(make_chat("c1@host", "Alice")).await;
    f.store
        .add_message(make_msg("m1", "c1@host", "done", days_ago(2)))
        .await;
    f.store.add_chat(make_chat("c2@host", "Bob")).await;
    f.store
        .add_message(make_msg("m2", "c2@host", "never", days_ago(2)))
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Engine(CourierError::Cancelled(_))
    ));

    let progress = f.engine.progress(ACCOUNT).await.unwrap();
    assert_eq!(progress.state, SyncState::Failed);
    assert!(progress.error.as_deref().unwrap_or("").contains("cancelled"));
    assert_eq!(f.helpdesk.created_count().await, 0);
}

#[tokio::test]
async fn unconfigured_helpdesk_fails_before_any_work() {
    let f = fixture();
    f.helpdesk.set_configured(false);
    f.store.add_chat(make_chat("c1@host", "Alice")).await;

    let err = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Engine(CourierError::Config(_))));
    assert!(f.engine.progress(ACCOUNT).await.is_none());
}

#[tokio::test]
async fn chat_enumeration_failure_fails_the_job() {
    let f = fixture();
    f.store.fail_chat_listing(true);

    let err = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Engine(CourierError::Storage { .. })));

    let progress = f.engine.progress(ACCOUNT).await.unwrap();
    assert_eq!(progress.state, SyncState::Failed);
}

#[tokio::test]
async fn groups_are_skipped_when_excluded() {
    let f = fixture();
    f.store.add_chat(make_chat("g1@group", "Team")).await;
    f.store
        .add_message(make_msg("m1", "g1@group", "group talk", days_ago(1)))
        .await;

    let mut opts = f.engine.default_options();
    opts.include_groups = false;

    let progress = f
        .engine
        .sync_history(ACCOUNT, opts, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(progress.synced_messages, 0);
    assert_eq!(f.helpdesk.created_count().await, 0);
    // The skipped chat still counts as handled, not failed.
    assert_eq!(progress.synced_chats, 1);
    assert_eq!(progress.failed_chats, 0);
}

#[tokio::test]
async fn progress_counters_never_exceed_scanned_messages() {
    let f = fixture();
    f.store.add_chat(make_chat("c1@host", "Alice")).await;
    for i in 0..10 {
        f.store
            .add_message(make_msg(
                &format!("m{i}"),
                "c1@host",
                "x",
                days_ago(3) + chrono::Duration::seconds(i),
            ))
            .await;
    }

    let progress = f
        .engine
        .sync_history(ACCOUNT, f.engine.default_options(), CancellationToken::new())
        .await
        .unwrap();
    assert!(progress.synced_messages + progress.failed_messages <= progress.total_messages);
    assert_eq!(progress.total_messages, 10);

    // Background avatar work submitted by the run drains cleanly.
    f.engine.shutdown().await;
}
