// ABOUTME: Abstract chat transport and document provider used by the core
// ABOUTME: Real clients live in submodules; tests substitute recording fakes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! External collaborators
//!
//! The router and scheduler never talk HTTP directly. They hold
//! `Arc<dyn ChatTransport>` and `Arc<dyn DocumentProvider>` and the server
//! wires in [`line_client::LineClient`] and [`google_client::GoogleClient`].

/// Google Drive and Sheets client
pub mod google_client;
/// LINE Messaging API client
pub mod line_client;

use std::fmt;

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use crate::errors::{AppError, AppResult};
use crate::models::MonthKey;

/// Outbound chat messages
///
/// Sends are fire-and-forget from the caller's point of view: failures are
/// reported as errors so they can be logged, and are never retried.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Reply to an inbound event
    async fn reply_to(&self, reply_token: &str, text: &str) -> AppResult<()>;

    /// Push to a user without an inbound event
    async fn push_to(&self, user_id: &str, text: &str) -> AppResult<()>;
}

/// Push and log a failure; returns whether the send succeeded
pub async fn push_logged(chat: &dyn ChatTransport, user_id: &str, text: &str) -> bool {
    match chat.push_to(user_id, text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Push message failed");
            false
        }
    }
}

/// Reply and log a failure
pub async fn reply_logged(chat: &dyn ChatTransport, reply_token: &str, text: &str) {
    if let Err(e) = chat.reply_to(reply_token, text).await {
        warn!(error = %e, "Reply message failed");
    }
}

/// Value written into a document cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Checkbox state
    Bool(bool),
    /// Plain text
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A teacher document identified by its file id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    id: String,
}

impl DocumentRef {
    /// Wrap a bare file id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Parse a spreadsheet URL (`.../spreadsheets/d/{id}/...`) or a bare id
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no file id can be found
    pub fn from_url(text: &str) -> AppResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::invalid_input("Document URL is empty"));
        }

        let Ok(url) = Url::parse(text) else {
            if text.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Ok(Self::new(text));
            }
            return Err(AppError::invalid_input(format!(
                "Not a document URL or id: {text}"
            )));
        };

        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        segments
            .windows(2)
            .find(|pair| pair[0] == "d" && !pair[1].is_empty())
            .map(|pair| Self::new(pair[1]))
            .ok_or_else(|| AppError::invalid_input(format!("No document id in URL: {text}")))
    }

    /// File id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Browser edit link
    #[must_use]
    pub fn edit_url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}/edit", self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// File, sharing and cell operations on teacher documents
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Template for the month: a spreadsheet whose name starts with the month
    /// and contains `シフト提出テンプレ`
    async fn find_template(&self, month: MonthKey) -> AppResult<Option<DocumentRef>>;

    /// Folder for the month's copies, created when missing; returns its id
    async fn ensure_month_folder(&self, month: MonthKey) -> AppResult<String>;

    /// Copy a template into a folder under a new name
    async fn copy_template(
        &self,
        template: &DocumentRef,
        dest_folder: &str,
        name: &str,
    ) -> AppResult<DocumentRef>;

    /// Anyone with the link may edit
    async fn set_public_editable(&self, doc: &DocumentRef) -> AppResult<()>;

    /// Anyone with the link may only view
    async fn set_public_view_only(&self, doc: &DocumentRef) -> AppResult<()>;

    /// Make sure the service principal itself can edit the document
    async fn ensure_principal_can_edit(&self, doc: &DocumentRef) -> AppResult<()>;

    /// Protect every sheet; owner and service principal keep edit rights
    async fn protect_all_sheets(&self, doc: &DocumentRef, description: &str) -> AppResult<()>;

    /// Remove sheet protections, all of them or only those with `description`;
    /// returns how many were removed
    async fn remove_protections(
        &self,
        doc: &DocumentRef,
        description: Option<&str>,
    ) -> AppResult<usize>;

    /// Boolean checkbox value; anything other than `TRUE` reads as false
    async fn read_flag(&self, doc: &DocumentRef, cell: &str) -> AppResult<bool>;

    /// Write one cell
    async fn write_cell(&self, doc: &DocumentRef, cell: &str, value: CellValue) -> AppResult<()>;

    /// Identity the provider acts as, for diagnostics
    async fn principal(&self) -> AppResult<String>;

    /// Owner of a document, for diagnostics
    async fn owner(&self, doc: &DocumentRef) -> AppResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ref_from_edit_url() {
        let doc =
            DocumentRef::from_url("https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0")
                .unwrap();
        assert_eq!(doc.id(), "1AbC-d_9");
        assert_eq!(
            doc.edit_url(),
            "https://docs.google.com/spreadsheets/d/1AbC-d_9/edit"
        );
    }

    #[test]
    fn document_ref_accepts_bare_id() {
        assert_eq!(DocumentRef::from_url(" abc123 ").unwrap().id(), "abc123");
    }

    #[test]
    fn document_ref_rejects_other_urls() {
        assert!(DocumentRef::from_url("https://example.com/foo").is_err());
        assert!(DocumentRef::from_url("not a url").is_err());
        assert!(DocumentRef::from_url("").is_err());
    }
}
