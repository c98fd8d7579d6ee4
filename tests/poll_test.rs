// ABOUTME: Integration tests for the submit-flag poller
// ABOUTME: Submission transition, locking, one-time acknowledgement and per-record failure isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{doc_url, jst, month, setup, TestEnv};
use shift_sync::constants::document_cells;
use shift_sync::external::CellValue;
use shift_sync::models::{Submission, SubmissionStatus};

async fn record(env: &TestEnv, teacher_id: &str, name: &str, doc: &str) {
    let m = month(2025, 5);
    env.ctx
        .lifecycle
        .ledger
        .append(
            &Submission::new(
                format!("{m}-{teacher_id}"),
                m,
                Some(teacher_id.to_owned()),
                name.to_owned(),
                SubmissionStatus::Created,
            )
            .with_document_url(doc_url(doc)),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn unchecked_flag_changes_nothing() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    record(&env, "T001", "山田 太郎", "doc1").await;

    let report = env.ctx.poller.run(jst(2025, 4, 20, 10, 0)).await.unwrap();
    assert!(report.is_clean());
    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Created);
    assert!(env.chat.sent().is_empty());
}

#[tokio::test]
async fn checked_flag_submits_locks_and_acknowledges_once() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    record(&env, "T001", "山田 太郎", "doc1").await;
    env.docs.set_flag("doc1", true);

    let now = jst(2025, 4, 20, 10, 0);
    let report = env.ctx.poller.run(now).await.unwrap();
    assert_eq!(report.processed, 1);

    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert_eq!(stored.submitted_at, Some(now));
    assert_eq!(stored.locked_at, Some(now));
    assert_eq!(stored.ack_notified_at, Some(now));
    assert!(env.docs.is_protected("doc1"));
    assert_eq!(
        env.docs.cell("doc1", document_cells::STATUS_LABEL),
        Some(CellValue::Text(document_cells::STATUS_SUBMITTED.to_owned()))
    );

    let pushes = env.chat.pushes_to("U1");
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].contains("【提出受理】"));

    // Second and third passes: nothing more is sent
    env.ctx.poller.run(now).await.unwrap();
    env.ctx.poller.run(now).await.unwrap();
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
}

#[tokio::test]
async fn teacher_without_email_is_acknowledged_but_not_locked() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    record(&env, "T001", "山田 太郎", "doc1").await;
    env.docs.set_flag("doc1", true);

    env.ctx.poller.run(jst(2025, 4, 20, 10, 0)).await.unwrap();
    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert!(stored.locked_at.is_none());
    assert!(!env.docs.is_protected("doc1"));
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
}

#[tokio::test]
async fn failed_lock_does_not_block_acknowledgement() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    record(&env, "T001", "山田 太郎", "doc1").await;
    env.docs.set_flag("doc1", true);
    env.docs.set_fail_protect(true);

    env.ctx.poller.run(jst(2025, 4, 20, 10, 0)).await.unwrap();
    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert!(stored.locked_at.is_none());
    assert!(stored.ack_notified_at.is_some());
}

#[tokio::test]
async fn failed_push_is_retried_on_the_next_pass() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    record(&env, "T001", "山田 太郎", "doc1").await;
    env.docs.set_flag("doc1", true);
    env.chat.set_fail_push(true);

    let now = jst(2025, 4, 20, 10, 0);
    env.ctx.poller.run(now).await.unwrap();
    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert!(stored.ack_notified_at.is_none());

    env.chat.set_fail_push(false);
    env.ctx.poller.run(now).await.unwrap();
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
    env.ctx.poller.run(now).await.unwrap();
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
}

#[tokio::test]
async fn one_bad_record_does_not_stop_the_batch() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    env.teacher("鈴木 花子", Some("U2"), Some("hanako@gmail.com")).await;
    record(&env, "T001", "山田 太郎", "doc1").await;
    record(&env, "T002", "鈴木 花子", "doc2").await;
    env.docs.make_unreadable("doc1");
    env.docs.set_flag("doc2", true);

    let report = env.ctx.poller.run(jst(2025, 4, 20, 10, 0)).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].item, "2025-05-T001");
    assert_eq!(report.processed, 1);
    assert_eq!(env.chat.pushes_to("U2").len(), 1);
}

#[tokio::test]
async fn scheduler_alerts_the_admin_about_item_failures() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    record(&env, "T001", "山田 太郎", "doc1").await;
    env.docs.make_unreadable("doc1");

    let report = env
        .ctx
        .scheduler
        .run_poll(jst(2025, 4, 20, 10, 0))
        .await
        .unwrap();
    assert_eq!(report.failures.len(), 1);
    let alerts = env.chat.pushes_to(common::ADMIN);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("【システムエラー通知】"));
    assert!(alerts[0].contains("poll_submissions"));
}

#[tokio::test]
async fn malformed_ledger_row_is_reported_and_the_rest_still_polled() {
    let env = setup().await;
    env.teacher("佐藤 花子", Some("U2"), Some("hanako@gmail.com")).await;
    record(&env, "T001", "佐藤 花子", "doc2").await;
    env.docs.set_flag("doc2", true);

    sqlx::query(
        r"INSERT INTO submissions
            (key, month_key, teacher_id, teacher_name, document_url, status, created_at, updated_at)
          VALUES ('2025-05-T009', '2025-05', 'T009', '壊れた 行', $1, 'locked',
                  '2025-01-01T00:00:00+00:00', '2025-01-01T00:00:00+00:00')",
    )
    .bind(doc_url("doc9"))
    .execute(env.ctx.database.pool())
    .await
    .unwrap();

    let report = env.ctx.poller.run(jst(2025, 4, 20, 10, 0)).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].item, "2025-05-T009");
    assert_eq!(report.processed, 1);

    let good = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(good.status, SubmissionStatus::Submitted);
    assert!(good.ack_notified_at.is_some());
    assert_eq!(env.chat.pushes_to("U2").len(), 1);

    // Month listings skip the bad row instead of failing outright
    let listed = env.ctx.lifecycle.ledger.list_by_month(month(2025, 5)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, "2025-05-T001");
}
