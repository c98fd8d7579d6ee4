// ABOUTME: Integration tests for the admin reopen service
// ABOUTME: Unlock and reset, month choice, missing email and partial unlock failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{doc_url, jst, month, setup, TestEnv};
use shift_sync::constants::document_cells;
use shift_sync::external::CellValue;
use shift_sync::lifecycle::reopen::{ReopenOutcome, ReopenService};
use shift_sync::models::{Submission, SubmissionPatch, SubmissionStatus};

const NAME: &str = "鈴木一郎";

async fn submitted(env: &TestEnv, year: i32, m: u32, doc: Option<&str>) -> String {
    let month = month(year, m);
    let key = format!("{month}-T001");
    let mut record = Submission::new(
        key.clone(),
        month,
        Some("T001".to_owned()),
        NAME.to_owned(),
        SubmissionStatus::Created,
    );
    if let Some(doc) = doc {
        record = record.with_document_url(doc_url(doc));
    }
    let ledger = &env.ctx.lifecycle.ledger;
    ledger.append(&record).await.unwrap();
    let now = jst(year, m, 1, 9, 0);
    ledger.update(&key, SubmissionPatch::submitted(now)).await.unwrap();
    ledger
        .update(
            &key,
            SubmissionPatch {
                locked_at: Some(Some(now)),
                ack_notified_at: Some(Some(now)),
                ..SubmissionPatch::default()
            },
        )
        .await
        .unwrap();
    key
}

fn service(env: &TestEnv) -> ReopenService {
    ReopenService::new(env.ctx.lifecycle.clone())
}

#[tokio::test]
async fn single_submitted_month_is_reopened() {
    let env = setup().await;
    env.teacher(NAME, Some("U_SUZUKI"), Some("ichiro@gmail.com")).await;
    let key = submitted(&env, 2025, 4, Some("docA")).await;

    let outcome = service(&env).reopen(NAME, None).await.unwrap();
    assert_eq!(
        outcome,
        ReopenOutcome::Reopened {
            teacher_name: NAME.to_owned(),
            month: month(2025, 4),
            notified: true,
        }
    );
    assert!(outcome.reply_text().contains("鈴木"));

    let stored = env.ctx.lifecycle.ledger.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Created);
    assert!(stored.submitted_at.is_none());
    assert!(stored.locked_at.is_none());
    assert!(stored.ack_notified_at.is_none());

    assert!(env.docs.is_public_editable("docA"));
    assert_eq!(
        env.docs.cell("docA", document_cells::SUBMIT_FLAG),
        Some(CellValue::Bool(false))
    );
    assert_eq!(
        env.docs.cell("docA", document_cells::STATUS_LABEL),
        Some(CellValue::Text(document_cells::STATUS_NOT_SUBMITTED.to_owned()))
    );

    let pushes = env.chat.pushes_to("U_SUZUKI");
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].contains(&doc_url("docA")));
}

#[tokio::test]
async fn several_submitted_months_need_a_choice() {
    let env = setup().await;
    env.teacher(NAME, Some("U_SUZUKI"), Some("ichiro@gmail.com")).await;
    submitted(&env, 2025, 5, Some("docB")).await;
    submitted(&env, 2025, 4, Some("docA")).await;

    let outcome = service(&env).reopen(NAME, None).await.unwrap();
    assert_eq!(
        outcome,
        ReopenOutcome::NeedsMonthChoice {
            name: NAME.to_owned(),
            months: vec![month(2025, 4), month(2025, 5)],
        }
    );
    assert!(env.chat.sent().is_empty());
}

#[tokio::test]
async fn teacher_without_email_cannot_be_reopened() {
    let env = setup().await;
    env.teacher(NAME, Some("U_SUZUKI"), None).await;
    let key = submitted(&env, 2025, 4, Some("docA")).await;

    let outcome = service(&env).reopen(NAME, Some(month(2025, 4))).await.unwrap();
    assert_eq!(
        outcome,
        ReopenOutcome::EmailMissing {
            teacher_name: NAME.to_owned()
        }
    );
    let stored = env.ctx.lifecycle.ledger.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn partial_unlock_leaves_the_record_submitted() {
    let env = setup().await;
    env.teacher(NAME, Some("U_SUZUKI"), Some("ichiro@gmail.com")).await;
    let key = submitted(&env, 2025, 4, Some("docA")).await;
    env.docs.set_fail_principal_edit(true);

    let outcome = service(&env).reopen(NAME, Some(month(2025, 4))).await.unwrap();
    let ReopenOutcome::UnlockFailed { diagnostic, .. } = &outcome else {
        panic!("expected UnlockFailed, got {outcome:?}");
    };
    assert!(diagnostic.contains("ステップ1失敗"));
    assert!(diagnostic.contains("- シート所有者: owner@example.com"));

    let stored = env.ctx.lifecycle.ledger.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert!(env.chat.pushes_to("U_SUZUKI").is_empty());
}

#[tokio::test]
async fn unsubmitted_record_is_reported_with_its_status() {
    let env = setup().await;
    env.teacher(NAME, Some("U_SUZUKI"), Some("ichiro@gmail.com")).await;
    let m = month(2025, 4);
    env.ctx
        .lifecycle
        .ledger
        .append(&Submission::new(
            format!("{m}-T001"),
            m,
            Some("T001".to_owned()),
            NAME.to_owned(),
            SubmissionStatus::Created,
        ))
        .await
        .unwrap();

    let outcome = service(&env).reopen(NAME, Some(m)).await.unwrap();
    assert_eq!(
        outcome,
        ReopenOutcome::NotSubmitted {
            name: NAME.to_owned(),
            month: Some(m),
            status: Some(SubmissionStatus::Created),
        }
    );

    let nothing = service(&env).reopen("佐藤花子", None).await.unwrap();
    assert!(matches!(
        nothing,
        ReopenOutcome::NotSubmitted { month: None, status: None, .. }
    ));
}

#[tokio::test]
async fn submitted_record_without_link_is_reported() {
    let env = setup().await;
    env.teacher(NAME, Some("U_SUZUKI"), Some("ichiro@gmail.com")).await;
    submitted(&env, 2025, 4, None).await;

    let outcome = service(&env).reopen(NAME, None).await.unwrap();
    assert_eq!(outcome, ReopenOutcome::DocumentMissing);
}
