// ABOUTME: Integration tests for the reminder engine
// ABOUTME: Initial request gating, rule cascade, daily unsubmitted reminder and month-start digest
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{doc_url, jst, month, setup, TestEnv, ADMIN};
use shift_sync::lifecycle::reminders::InitialRequestOutcome;
use shift_sync::models::{MonthKey, Submission, SubmissionPatch, SubmissionStatus};

async fn record(env: &TestEnv, m: MonthKey, teacher_id: &str, name: &str, doc: Option<&str>) {
    let mut submission = Submission::new(
        format!("{m}-{teacher_id}"),
        m,
        Some(teacher_id.to_owned()),
        name.to_owned(),
        SubmissionStatus::Created,
    );
    if let Some(doc) = doc {
        submission = submission.with_document_url(doc_url(doc));
    }
    env.ctx.lifecycle.ledger.append(&submission).await.unwrap();
}

async fn mark_submitted(env: &TestEnv, key: &str) {
    env.ctx
        .lifecycle
        .ledger
        .update(key, SubmissionPatch::submitted(jst(2025, 4, 1, 9, 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn initial_request_waits_for_template_then_announces_once() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.teacher("鈴木 花子", None, None).await;
    // 21 days before 2025-05-01
    let now = jst(2025, 4, 10, 15, 0);
    let reminders = &env.ctx.reminders;

    let first = reminders.initial_request(now, false).await.unwrap();
    assert_eq!(
        first,
        InitialRequestOutcome::TemplateMissing {
            month: month(2025, 5),
            notified: true,
        }
    );
    let again = reminders.initial_request(now, false).await.unwrap();
    assert_eq!(
        again,
        InitialRequestOutcome::TemplateMissing {
            month: month(2025, 5),
            notified: false,
        }
    );
    let admin = env.chat.pushes_to(ADMIN);
    assert_eq!(admin.len(), 1);
    assert!(admin[0].starts_with("【シフト申請用紙作成依頼】"));

    env.docs.add_template(month(2025, 5));
    let announced = reminders.initial_request(now, false).await.unwrap();
    let InitialRequestOutcome::Announced {
        notified, created, ..
    } = announced
    else {
        panic!("expected Announced, got {announced:?}");
    };
    assert_eq!(notified, vec!["山田 太郎".to_owned()]);
    assert_eq!(created, 2);

    let to_teacher = env.chat.pushes_to("U1");
    assert_eq!(to_teacher.len(), 1);
    assert!(to_teacher[0].contains("山田先生、2025-05のシフト申請"));
    assert!(env.chat.pushes_to(ADMIN)[1].starts_with("【シフト申請依頼の送信結果】"));

    let ledger = &env.ctx.lifecycle.ledger;
    assert!(ledger.find_by_key("2025-05-T001").await.unwrap().is_some());
    assert!(ledger.find_by_key("2025-05-T002").await.unwrap().is_some());

    let repeat = reminders.initial_request(now, false).await.unwrap();
    assert_eq!(
        repeat,
        InitialRequestOutcome::AlreadyAnnounced {
            month: month(2025, 5)
        }
    );
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
}

#[tokio::test]
async fn initial_request_off_day_needs_force() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.docs.add_template(month(2025, 5));
    let now = jst(2025, 4, 11, 15, 0);

    let outcome = env.ctx.reminders.initial_request(now, false).await.unwrap();
    assert_eq!(outcome, InitialRequestOutcome::NotDue);
    assert!(env.chat.sent().is_empty());

    let forced = env.ctx.reminders.initial_request(now, true).await.unwrap();
    assert!(matches!(forced, InitialRequestOutcome::Announced { .. }));
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
}

#[tokio::test]
async fn cascade_reminds_teachers_and_manager_once_per_day() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.teacher("鈴木 花子", Some("U2"), None).await;
    let may = month(2025, 5);
    record(&env, may, "T001", "山田 太郎", Some("doc1")).await;
    record(&env, may, "T002", "鈴木 花子", Some("doc2")).await;
    mark_submitted(&env, "2025-05-T002").await;

    // One week before 2025-05-01
    let now = jst(2025, 4, 24, 15, 0);
    let report = env.ctx.reminders.cascade(now).await.unwrap();
    assert_eq!(report.processed, 2);

    let teacher = env.chat.pushes_to("U1");
    assert_eq!(teacher.len(), 1);
    assert!(teacher[0].starts_with("【シフト未提出リマインド（2025-05）】\n山田先生"));
    assert!(teacher[0].ends_with(&doc_url("doc1")));
    assert!(env.chat.pushes_to("U2").is_empty());

    let admin = env.chat.pushes_to(ADMIN);
    assert_eq!(admin.len(), 1);
    assert!(admin[0].contains("1. 山田 太郎（シート作成済み）"));
    assert!(!admin[0].contains("【提出済み】"));

    let rerun = env.ctx.reminders.cascade(now).await.unwrap();
    assert_eq!(rerun.processed, 0);
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
    assert_eq!(env.chat.pushes_to(ADMIN).len(), 1);
}

#[tokio::test]
async fn deadline_day_manager_notice_lists_submitted_teachers() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.teacher("鈴木 花子", Some("U2"), None).await;
    let may = month(2025, 5);
    record(&env, may, "T001", "山田 太郎", None).await;
    record(&env, may, "T002", "鈴木 花子", Some("doc2")).await;
    mark_submitted(&env, "2025-05-T002").await;

    env.ctx.reminders.cascade(jst(2025, 5, 1, 15, 0)).await.unwrap();
    let admin = env.chat.pushes_to(ADMIN);
    assert_eq!(admin.len(), 1);
    assert!(admin[0].starts_with("【シフト提出状況（2025-05）】"));
    assert!(admin[0].contains("1. 山田 太郎（シート未作成）"));
    assert!(admin[0].contains("【提出済み】\n1. 鈴木 花子"));

    // The teacher without a document still gets the rule text, with no link
    let teacher = env.chat.pushes_to("U1");
    assert_eq!(teacher.len(), 1);
    assert!(!teacher[0].contains("https://"));
}

#[tokio::test]
async fn daily_unsubmitted_reminder_once_per_local_day_skipping_leave() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.teacher("佐藤 次郎", Some("U3"), None).await;
    env.ctx.lifecycle.registry.set_on_leave("T002", true).await.unwrap();
    let may = month(2025, 5);
    record(&env, may, "T001", "山田 太郎", Some("doc1")).await;
    record(&env, may, "T002", "佐藤 次郎", Some("doc2")).await;

    let reminders = &env.ctx.reminders;
    reminders.daily_unsubmitted(jst(2025, 4, 20, 15, 0)).await.unwrap();
    reminders.daily_unsubmitted(jst(2025, 4, 20, 23, 0)).await.unwrap();
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
    assert!(env.chat.pushes_to("U3").is_empty());

    reminders.daily_unsubmitted(jst(2025, 4, 21, 15, 0)).await.unwrap();
    let pushes = env.chat.pushes_to("U1");
    assert_eq!(pushes.len(), 2);
    assert!(pushes[1].contains(&doc_url("doc1")));

    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.reminder_notified_at, Some(jst(2025, 4, 21, 15, 0)));
}

#[tokio::test]
async fn month_start_digest_reports_the_closed_month_once() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.teacher("鈴木 花子", Some("U2"), None).await;
    let april = month(2025, 4);
    record(&env, april, "T001", "山田 太郎", Some("doc1")).await;
    record(&env, april, "T002", "鈴木 花子", Some("doc2")).await;
    mark_submitted(&env, "2025-04-T002").await;

    let now = jst(2025, 5, 1, 15, 0);
    let report = env.ctx.reminders.month_start_digest(now).await.unwrap();
    assert_eq!(report.processed, 1);

    let admin = env.chat.pushes_to(ADMIN);
    assert_eq!(admin.len(), 1);
    assert!(admin[0].starts_with("【SHIFT SYNC - 2025-04】"));
    assert!(admin[0].contains("1. 山田 太郎（シート作成済み）"));
    assert!(admin[0].contains("【提出済み】\n1. 鈴木 花子"));

    let teacher = env.chat.pushes_to("U1");
    assert_eq!(teacher.len(), 1);
    assert!(teacher[0].contains("2025-04"));

    env.ctx.reminders.month_start_digest(now).await.unwrap();
    assert_eq!(env.chat.pushes_to(ADMIN).len(), 1);
    assert_eq!(env.chat.pushes_to("U1").len(), 1);

    let not_first = env
        .ctx
        .reminders
        .month_start_digest(jst(2025, 5, 2, 15, 0))
        .await
        .unwrap();
    assert!(not_first.is_clean());
    assert_eq!(not_first.processed, 0);
}
