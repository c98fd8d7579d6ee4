// ABOUTME: Multi-step document lock and unlock with per-step outcome reporting
// ABOUTME: Steps that succeed stay applied when a later step fails; the report says which failed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt::Write;

use tracing::{error, info, warn};

use crate::constants::document_cells;
use crate::external::{DocumentProvider, DocumentRef};

const UNKNOWN: &str = "(取得失敗)";

/// Outcome of one permission mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Step label
    pub step: &'static str,
    /// Failure detail, `None` on success
    pub error: Option<String>,
}

/// Aggregate result of a lock or unlock
#[derive(Debug, Clone)]
pub struct PermissionReport {
    /// Document acted on
    pub document: DocumentRef,
    /// Identity the provider acted as
    pub principal: String,
    /// Document owner
    pub owner: String,
    /// Whether the principal could edit after the first step
    pub principal_can_edit: bool,
    /// Per-step outcomes in execution order
    pub steps: Vec<StepOutcome>,
}

impl PermissionReport {
    fn new(document: DocumentRef, principal: String, owner: String) -> Self {
        Self {
            document,
            principal,
            owner,
            principal_can_edit: false,
            steps: Vec::new(),
        }
    }

    fn record(&mut self, step: &'static str, error: Option<String>) {
        if let Some(e) = &error {
            warn!(document = %self.document, step, error = %e, "Permission step failed");
        }
        self.steps.push(StepOutcome { step, error });
    }

    /// Every step succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    /// Whether the named step succeeded
    #[must_use]
    pub fn step_succeeded(&self, step: &str) -> bool {
        self.steps
            .iter()
            .any(|s| s.step == step && s.error.is_none())
    }

    /// Failure details in execution order
    #[must_use]
    pub fn failures(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| s.error.as_deref())
            .collect()
    }

    /// Multi-line admin diagnostic listing each failed step and the principals involved
    #[must_use]
    pub fn diagnostic(&self, headline: &str) -> String {
        let mut text = format!("{headline}\n\n{}\n\n詳細情報:", self.failures().join("\n\n"));
        let _ = write!(
            text,
            "\n- シートID: {}\n- スクリプト実行者: {}\n- シート所有者: {}\n- スクリプト実行者がエディター: {}",
            self.document.id(),
            self.principal,
            self.owner,
            if self.principal_can_edit { "はい" } else { "いいえ" }
        );
        text
    }
}

/// Unlock step labels
pub mod unlock_steps {
    /// Principal gains edit access
    pub const PRINCIPAL_EDIT: &str = "principal_edit";
    /// Every sheet protection removed
    pub const REMOVE_PROTECTIONS: &str = "remove_protections";
    /// Link sharing restored to editor
    pub const PUBLIC_EDIT: &str = "public_edit";
}

/// Lock step labels
pub mod lock_steps {
    /// Link sharing reduced to viewer
    pub const PUBLIC_VIEW: &str = "public_view";
    /// Earlier lock protections cleared
    pub const CLEAR_PREVIOUS: &str = "clear_previous";
    /// Every sheet protected
    pub const PROTECT: &str = "protect";
}

/// Headline for a partial unlock
pub const UNLOCK_PARTIAL_FAILURE: &str = "ロック解除が部分的に失敗しました：";

/// Headline for a partial lock
pub const LOCK_PARTIAL_FAILURE: &str = "ロックが部分的に失敗しました：";

async fn identities(docs: &dyn DocumentProvider, doc: &DocumentRef) -> (String, String) {
    let principal = docs
        .principal()
        .await
        .unwrap_or_else(|_| UNKNOWN.to_owned());
    let owner = docs.owner(doc).await.unwrap_or_else(|_| UNKNOWN.to_owned());
    (principal, owner)
}

/// Make a submitted document read-only
///
/// Link sharing drops to viewer, protections left by earlier locks are
/// cleared, then every sheet is protected. The document counts as locked
/// when the final protect step succeeds.
pub async fn lock_document(docs: &dyn DocumentProvider, doc: &DocumentRef) -> PermissionReport {
    let (principal, owner) = identities(docs, doc).await;
    let mut report = PermissionReport::new(doc.clone(), principal, owner);

    let view_only = docs.set_public_view_only(doc).await.err();
    report.record(
        lock_steps::PUBLIC_VIEW,
        view_only.map(|e| format!("リンク共有権限を閲覧者に変更できませんでした。{e}")),
    );

    let mut clear_error = None;
    for description in [
        document_cells::PROTECTION_DESCRIPTION,
        document_cells::LEGACY_PROTECTION_DESCRIPTION,
    ] {
        if let Err(e) = docs.remove_protections(doc, Some(description)).await {
            clear_error = Some(format!("既存の保護を削除できませんでした。{e}"));
        }
    }
    report.record(lock_steps::CLEAR_PREVIOUS, clear_error);

    let protect = docs
        .protect_all_sheets(doc, document_cells::PROTECTION_DESCRIPTION)
        .await
        .err();
    report.record(
        lock_steps::PROTECT,
        protect.map(|e| format!("シートを保護できませんでした。{e}")),
    );

    if report.step_succeeded(lock_steps::PROTECT) {
        info!(document = %doc, "Document locked");
    }
    report
}

/// Restore editing on a locked document
///
/// Three steps run regardless of earlier failures: the principal gains edit
/// access, every protection is removed, link sharing returns to editor.
pub async fn unlock_document(docs: &dyn DocumentProvider, doc: &DocumentRef) -> PermissionReport {
    let (principal, owner) = identities(docs, doc).await;
    let mut report = PermissionReport::new(doc.clone(), principal, owner);

    match docs.ensure_principal_can_edit(doc).await {
        Ok(()) => {
            report.principal_can_edit = true;
            report.record(unlock_steps::PRINCIPAL_EDIT, None);
        }
        Err(e) => {
            let message = format!(
                "ステップ1失敗: スクリプト実行者（{}）をエディターに追加できませんでした。所有者（{}）がスクリプト実行者の編集権限を手動で付与してください。（{e}）",
                report.principal, report.owner
            );
            report.record(unlock_steps::PRINCIPAL_EDIT, Some(message));
        }
    }

    let removed = docs.remove_protections(doc, None).await;
    report.record(
        unlock_steps::REMOVE_PROTECTIONS,
        removed
            .err()
            .map(|e| format!("ステップ2失敗: 保護の削除に失敗しました。\n{e}")),
    );

    let public_edit = docs.set_public_editable(doc).await;
    report.record(
        unlock_steps::PUBLIC_EDIT,
        public_edit
            .err()
            .map(|_| "ステップ3失敗: リンク共有権限を編集者に変更できませんでした。".to_owned()),
    );

    if report.is_success() {
        info!(document = %doc, "Document unlocked");
    } else {
        error!(document = %doc, failures = report.failures().len(), "Document unlock partially failed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_lists_failures_and_principals() {
        let mut report = PermissionReport::new(
            DocumentRef::new("doc1"),
            "svc@example.com".to_owned(),
            "owner@example.com".to_owned(),
        );
        report.record(unlock_steps::PRINCIPAL_EDIT, None);
        report.record(unlock_steps::REMOVE_PROTECTIONS, Some("ステップ2失敗: x".to_owned()));
        report.record(unlock_steps::PUBLIC_EDIT, Some("ステップ3失敗: y".to_owned()));

        assert!(!report.is_success());
        let text = report.diagnostic(UNLOCK_PARTIAL_FAILURE);
        assert!(text.starts_with("ロック解除が部分的に失敗しました：\n\nステップ2失敗: x\n\nステップ3失敗: y\n\n詳細情報:"));
        assert!(text.contains("- シートID: doc1"));
        assert!(text.contains("- スクリプト実行者: svc@example.com"));
        assert!(text.contains("- シート所有者: owner@example.com"));
        assert!(text.contains("- スクリプト実行者がエディター: いいえ"));
    }
}
