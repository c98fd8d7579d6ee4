// ABOUTME: Integration tests for form intake document provisioning
// ABOUTME: Fresh copy, reuse without resend, missing template and unresolved names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{doc_url, jst, month, setup};
use shift_sync::constants::document_cells;
use shift_sync::external::CellValue;
use shift_sync::lifecycle::intake::{FormSubmission, IntakeOutcome};
use shift_sync::models::SubmissionStatus;

fn form(name: &str, year: i32, m: u32) -> FormSubmission {
    FormSubmission {
        teacher_name: name.to_owned(),
        month_key: Some(month(year, m)),
    }
}

#[tokio::test]
async fn fresh_request_copies_template_and_sends_link() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), Some("taro@gmail.com")).await;
    env.docs.add_template(month(2025, 5));

    let outcome = env
        .ctx
        .intake
        .request_document(&form("山田太郎", 2025, 5), jst(2025, 4, 12, 9, 0))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IntakeOutcome::Created {
            key: "2025-05-T001".to_owned(),
            url: doc_url("doc1"),
            notified: true,
        }
    );
    assert_eq!(env.docs.copies(), 1);
    assert!(env.docs.is_public_editable("doc1"));
    assert_eq!(
        env.docs.cell("doc1", document_cells::TEACHER_NAME),
        Some(CellValue::Text("山田 太郎".to_owned()))
    );

    let pushes = env.chat.pushes_to("U1");
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].contains(&doc_url("doc1")));

    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Created);
    assert_eq!(stored.document_url, Some(doc_url("doc1")));
}

#[tokio::test]
async fn repeated_request_reuses_the_document_silently() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    env.docs.add_template(month(2025, 5));
    let now = jst(2025, 4, 12, 9, 0);

    env.ctx.intake.request_document(&form("山田 太郎", 2025, 5), now).await.unwrap();
    let again = env
        .ctx
        .intake
        .request_document(&form("山田 太郎", 2025, 5), now)
        .await
        .unwrap();

    assert_eq!(
        again,
        IntakeOutcome::Reused {
            key: "2025-05-T001".to_owned(),
            url: doc_url("doc1"),
        }
    );
    assert_eq!(env.docs.copies(), 1);
    assert_eq!(env.chat.pushes_to("U1").len(), 1);
}

#[tokio::test]
async fn missing_template_is_recorded_then_recovered() {
    let env = setup().await;
    env.teacher("山田 太郎", Some("U1"), None).await;
    let now = jst(2025, 4, 12, 9, 0);

    let outcome = env
        .ctx
        .intake
        .request_document(&form("山田 太郎", 2025, 5), now)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IntakeOutcome::TemplateNotFound {
            key: "2025-05-T001".to_owned(),
            notified: true,
        }
    );
    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::TemplateNotFound);
    assert!(stored.document_url.is_none());
    assert_eq!(env.docs.copies(), 0);

    env.docs.add_template(month(2025, 5));
    let retry = env
        .ctx
        .intake
        .request_document(&form("山田 太郎", 2025, 5), now)
        .await
        .unwrap();
    assert!(matches!(retry, IntakeOutcome::Created { .. }));
    let stored = env.ctx.lifecycle.ledger.find_by_key("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Created);
    assert_eq!(stored.document_url, Some(doc_url("doc1")));
}

#[tokio::test]
async fn unknown_teacher_is_recorded_without_a_document() {
    let env = setup().await;
    env.docs.add_template(month(2025, 5));

    let outcome = env
        .ctx
        .intake
        .request_document(&form("佐藤次郎", 2025, 5), jst(2025, 4, 12, 9, 0))
        .await
        .unwrap();
    let IntakeOutcome::TeacherNotFound { key } = outcome else {
        panic!("expected TeacherNotFound, got {outcome:?}");
    };
    assert!(key.starts_with("2025-05-"));

    let stored = env.ctx.lifecycle.ledger.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::TeacherNotFound);
    assert!(stored.teacher_id.is_none());
    assert_eq!(env.docs.copies(), 0);
    assert!(env.chat.sent().is_empty());
}

#[tokio::test]
async fn month_defaults_to_next_local_month() {
    let env = setup().await;
    env.teacher("山田 太郎", None, None).await;
    env.docs.add_template(month(2025, 5));

    // 2025-04-30 23:30 local is still April
    let outcome = env
        .ctx
        .intake
        .request_document(
            &FormSubmission {
                teacher_name: "山田 太郎".to_owned(),
                month_key: None,
            },
            jst(2025, 4, 30, 23, 30),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IntakeOutcome::Created {
            key: "2025-05-T001".to_owned(),
            url: doc_url("doc1"),
            notified: false,
        }
    );
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let env = setup().await;
    let result = env
        .ctx
        .intake
        .request_document(&form("   ", 2025, 5), jst(2025, 4, 12, 9, 0))
        .await;
    assert!(result.is_err());
}
