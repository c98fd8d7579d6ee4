// ABOUTME: Shared test utilities for integration tests
// ABOUTME: In-memory database, recording chat and document fakes, and clock helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `shift_sync`

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use shift_sync::config::ServerConfig;
use shift_sync::context::ServerContext;
use shift_sync::database::Database;
use shift_sync::errors::{AppError, AppResult};
use shift_sync::external::{CellValue, ChatTransport, DocumentProvider, DocumentRef};
use shift_sync::models::{MonthKey, Teacher};

static INIT_LOGGER: Once = Once::new();

/// Chat identity of the administrator in every test context
pub const ADMIN: &str = "U_ADMIN";

/// Install a test-writer subscriber once per process
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("shift_sync=debug")
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Chat fake
// ============================================================================

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { token: String, text: String },
    Push { user: String, text: String },
}

/// Records every send; pushes can be made to fail
#[derive(Default)]
pub struct FakeChat {
    sent: Mutex<Vec<Sent>>,
    fail_push: AtomicBool,
}

impl FakeChat {
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn replies(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply { text, .. } => Some(text),
                Sent::Push { .. } => None,
            })
            .collect()
    }

    pub fn pushes_to(&self, user: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Push { user: u, text } if u == user => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for FakeChat {
    async fn reply_to(&self, reply_token: &str, text: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(Sent::Reply {
            token: reply_token.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn push_to(&self, user_id: &str, text: &str) -> AppResult<()> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(AppError::external_service("fake_chat", "push refused"));
        }
        self.sent.lock().unwrap().push(Sent::Push {
            user: user_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }
}

// ============================================================================
// Document fake
// ============================================================================

/// In-memory documents: templates per month, submit flags, written cells
#[derive(Default)]
pub struct FakeDocs {
    templates: Mutex<HashSet<MonthKey>>,
    flags: Mutex<HashMap<String, bool>>,
    cells: Mutex<Vec<(String, String, CellValue)>>,
    protected: Mutex<HashSet<String>>,
    public_edit: Mutex<HashSet<String>>,
    unreadable: Mutex<HashSet<String>>,
    copies: AtomicUsize,
    fail_protect: AtomicBool,
    fail_principal_edit: AtomicBool,
}

impl FakeDocs {
    pub fn add_template(&self, month: MonthKey) {
        self.templates.lock().unwrap().insert(month);
    }

    pub fn set_flag(&self, doc_id: &str, checked: bool) {
        self.flags.lock().unwrap().insert(doc_id.to_owned(), checked);
    }

    /// Reading the submit flag of `doc_id` fails
    pub fn make_unreadable(&self, doc_id: &str) {
        self.unreadable.lock().unwrap().insert(doc_id.to_owned());
    }

    pub fn set_fail_protect(&self, fail: bool) {
        self.fail_protect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_principal_edit(&self, fail: bool) {
        self.fail_principal_edit.store(fail, Ordering::SeqCst);
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn is_protected(&self, doc_id: &str) -> bool {
        self.protected.lock().unwrap().contains(doc_id)
    }

    pub fn is_public_editable(&self, doc_id: &str) -> bool {
        self.public_edit.lock().unwrap().contains(doc_id)
    }

    /// Last value written to `cell` of `doc_id`
    pub fn cell(&self, doc_id: &str, cell: &str) -> Option<CellValue> {
        self.cells
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(d, c, _)| d == doc_id && c == cell)
            .map(|(_, _, v)| v.clone())
    }
}

#[async_trait]
impl DocumentProvider for FakeDocs {
    async fn find_template(&self, month: MonthKey) -> AppResult<Option<DocumentRef>> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .contains(&month)
            .then(|| DocumentRef::new(format!("template-{month}"))))
    }

    async fn ensure_month_folder(&self, month: MonthKey) -> AppResult<String> {
        Ok(format!("folder-{month}"))
    }

    async fn copy_template(
        &self,
        _template: &DocumentRef,
        _dest_folder: &str,
        _name: &str,
    ) -> AppResult<DocumentRef> {
        let n = self.copies.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(DocumentRef::new(format!("doc{n}")))
    }

    async fn set_public_editable(&self, doc: &DocumentRef) -> AppResult<()> {
        self.public_edit.lock().unwrap().insert(doc.id().to_owned());
        Ok(())
    }

    async fn set_public_view_only(&self, doc: &DocumentRef) -> AppResult<()> {
        self.public_edit.lock().unwrap().remove(doc.id());
        Ok(())
    }

    async fn ensure_principal_can_edit(&self, _doc: &DocumentRef) -> AppResult<()> {
        if self.fail_principal_edit.load(Ordering::SeqCst) {
            return Err(AppError::external_service("fake_docs", "permission denied"));
        }
        Ok(())
    }

    async fn protect_all_sheets(&self, doc: &DocumentRef, _description: &str) -> AppResult<()> {
        if self.fail_protect.load(Ordering::SeqCst) {
            return Err(AppError::external_service("fake_docs", "protect refused"));
        }
        self.protected.lock().unwrap().insert(doc.id().to_owned());
        Ok(())
    }

    async fn remove_protections(
        &self,
        doc: &DocumentRef,
        _description: Option<&str>,
    ) -> AppResult<usize> {
        Ok(usize::from(self.protected.lock().unwrap().remove(doc.id())))
    }

    async fn read_flag(&self, doc: &DocumentRef, _cell: &str) -> AppResult<bool> {
        if self.unreadable.lock().unwrap().contains(doc.id()) {
            return Err(AppError::external_service("fake_docs", "read failed"));
        }
        Ok(self
            .flags
            .lock()
            .unwrap()
            .get(doc.id())
            .copied()
            .unwrap_or(false))
    }

    async fn write_cell(&self, doc: &DocumentRef, cell: &str, value: CellValue) -> AppResult<()> {
        self.cells
            .lock()
            .unwrap()
            .push((doc.id().to_owned(), cell.to_owned(), value));
        Ok(())
    }

    async fn principal(&self) -> AppResult<String> {
        Ok("svc@example.iam".to_owned())
    }

    async fn owner(&self, _doc: &DocumentRef) -> AppResult<String> {
        Ok("owner@example.com".to_owned())
    }
}

// ============================================================================
// Context
// ============================================================================

/// Wired context plus handles on the fakes
pub struct TestEnv {
    pub ctx: Arc<ServerContext>,
    pub chat: Arc<FakeChat>,
    pub docs: Arc<FakeDocs>,
}

/// Configuration for an in-memory database with an admin configured
pub fn test_config(extra: &[(&str, &str)]) -> ServerConfig {
    let mut pairs: HashMap<String, String> = [
        ("DATABASE_URL", "sqlite::memory:"),
        ("ADMIN_LINE_USER_ID", ADMIN),
        ("LINE_CHANNEL_ACCESS_TOKEN", "test-token"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect();
    for (k, v) in extra {
        pairs.insert((*k).to_owned(), (*v).to_owned());
    }
    ServerConfig::from_lookup(|key| pairs.get(key).cloned()).unwrap()
}

pub async fn setup_with(extra: &[(&str, &str)]) -> TestEnv {
    init_test_logging();
    let config = test_config(extra);
    let database = Database::connect(&config.database_url).await.unwrap();
    let chat = Arc::new(FakeChat::default());
    let docs = Arc::new(FakeDocs::default());
    let ctx = ServerContext::new(
        config,
        database,
        Arc::clone(&chat) as Arc<dyn ChatTransport>,
        Arc::clone(&docs) as Arc<dyn DocumentProvider>,
    );
    TestEnv {
        ctx: Arc::new(ctx),
        chat,
        docs,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(&[]).await
}

impl TestEnv {
    /// Roster entry with optional chat identity and email
    pub async fn teacher(&self, name: &str, chat: Option<&str>, email: Option<&str>) -> Teacher {
        self.ctx
            .lifecycle
            .registry
            .create(name, chat, email, jst(2025, 1, 1, 9, 0))
            .await
            .unwrap()
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Japan Standard Time, the default configured offset
pub fn jst_offset() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// A local wall-clock time as UTC
pub fn jst(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    jst_offset()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn month(year: i32, month: u32) -> MonthKey {
    MonthKey::new(year, month).unwrap()
}

pub fn doc_url(id: &str) -> String {
    DocumentRef::new(id).edit_url()
}
