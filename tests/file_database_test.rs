// ABOUTME: Tests the SQLite store against an on-disk database file
// ABOUTME: Data and seeded reminder rules survive reconnecting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{jst, month};
use shift_sync::database::Database;
use shift_sync::ledger::SubmissionLedger;
use shift_sync::models::{default_reminder_rules, Submission, SubmissionStatus};
use shift_sync::names::NameMatcher;
use shift_sync::registry::TeacherRegistry;
use tempfile::TempDir;

fn url(dir: &TempDir) -> String {
    format!("sqlite:{}?mode=rwc", dir.path().join("shift_sync.db").display())
}

#[tokio::test]
async fn records_persist_across_reconnect() {
    common::init_test_logging();
    let dir = TempDir::new().unwrap();

    {
        let db = Database::connect(&url(&dir)).await.unwrap();
        let registry = TeacherRegistry::new(db.teachers(), NameMatcher::default());
        registry
            .create("山田 太郎", Some("U1"), Some("taro@gmail.com"), jst(2025, 4, 1, 9, 0))
            .await
            .unwrap();
        let ledger = SubmissionLedger::new(db.submissions());
        ledger
            .append(&Submission::new(
                "2025-05-T001".to_owned(),
                month(2025, 5),
                Some("T001".to_owned()),
                "山田 太郎".to_owned(),
                SubmissionStatus::Created,
            ))
            .await
            .unwrap();
        db.reminder_rules()
            .set_enabled("reminder_2weeks", false)
            .await
            .unwrap();
    }

    let db = Database::connect(&url(&dir)).await.unwrap();
    db.verify_schema().await.unwrap();

    let teacher = db.teachers().get("T001").await.unwrap().unwrap();
    assert_eq!(teacher.chat_user_id.as_deref(), Some("U1"));

    let record = db.submissions().get("2025-05-T001").await.unwrap().unwrap();
    assert_eq!(record.status, SubmissionStatus::Created);

    // Seeding does not run again over an existing policy
    let rules = db.reminder_rules().list().await.unwrap();
    assert_eq!(rules.len(), default_reminder_rules().len());
    let disabled = rules.iter().find(|r| r.id == "reminder_2weeks").unwrap();
    assert!(!disabled.enabled);
}
