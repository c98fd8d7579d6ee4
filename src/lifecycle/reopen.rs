// ABOUTME: Admin reopen of a submitted record: unlock the document and reset the ledger row
// ABOUTME: Resolves the month, requires an email on file, and notifies the teacher with the link
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use tracing::{info, warn};

use super::permissions::{self, UNLOCK_PARTIAL_FAILURE};
use super::LifecycleContext;
use crate::constants::document_cells;
use crate::errors::AppResult;
use crate::external::{push_logged, CellValue, DocumentRef};
use crate::messages;
use crate::models::{extract_last_name, MonthKey, SubmissionPatch, SubmissionStatus, Teacher};

/// Result of a reopen request, each variant mapping to one admin reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReopenOutcome {
    /// No `submitted` record matched
    NotSubmitted {
        /// Name as given
        name: String,
        /// Month as given or resolved
        month: Option<MonthKey>,
        /// Status of a non-submitted record with the same name, if any
        status: Option<SubmissionStatus>,
    },
    /// Several submitted months; the admin must choose
    NeedsMonthChoice {
        /// Name as given
        name: String,
        /// Candidate months, ascending
        months: Vec<MonthKey>,
    },
    /// The record carries no document link
    DocumentMissing,
    /// The document link has no file id
    DocumentInvalid,
    /// The teacher has no email on file
    EmailMissing {
        /// Teacher name on the record
        teacher_name: String,
    },
    /// The document provider did not complete the unlock
    UnlockFailed {
        /// Teacher name on the record
        teacher_name: String,
        /// Month of the record
        month: MonthKey,
        /// Multi-line diagnostic
        diagnostic: String,
    },
    /// Unlocked and reset
    Reopened {
        /// Teacher name on the record
        teacher_name: String,
        /// Month of the record
        month: MonthKey,
        /// Teacher received the reopen notice
        notified: bool,
    },
}

impl ReopenOutcome {
    /// Reply sent to the admin
    #[must_use]
    pub fn reply_text(&self) -> String {
        match self {
            Self::NotSubmitted {
                name,
                month,
                status,
            } => messages::no_submitted_records(name, *month, status.map(SubmissionStatus::as_str)),
            Self::NeedsMonthChoice { name, months } => messages::month_menu(name, months),
            Self::DocumentMissing => messages::DOCUMENT_URL_MISSING.to_owned(),
            Self::DocumentInvalid => messages::DOCUMENT_ID_INVALID.to_owned(),
            Self::EmailMissing { teacher_name } => {
                messages::reopen_needs_email(extract_last_name(teacher_name))
            }
            Self::UnlockFailed {
                teacher_name,
                month,
                diagnostic,
            } => messages::reopen_failed(extract_last_name(teacher_name), *month, diagnostic),
            Self::Reopened {
                teacher_name,
                month,
                ..
            } => messages::reopened(extract_last_name(teacher_name), *month),
        }
    }
}

/// Admin reopen service
#[derive(Clone)]
pub struct ReopenService {
    ctx: LifecycleContext,
}

impl ReopenService {
    /// Create the reopen service
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Reopen the named teacher's submitted record
    ///
    /// Without a month, a single submitted month is chosen automatically and
    /// several produce [`ReopenOutcome::NeedsMonthChoice`].
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger or roster cannot be read or written
    pub async fn reopen(&self, name: &str, month: Option<MonthKey>) -> AppResult<ReopenOutcome> {
        let month = match month {
            Some(month) => month,
            None => {
                let months = self.ctx.ledger.submitted_months_for(name).await?;
                match months.as_slice() {
                    [] => {
                        return Ok(ReopenOutcome::NotSubmitted {
                            name: name.to_owned(),
                            month: None,
                            status: None,
                        })
                    }
                    [only] => *only,
                    _ => {
                        return Ok(ReopenOutcome::NeedsMonthChoice {
                            name: name.to_owned(),
                            months,
                        })
                    }
                }
            }
        };

        let Some(record) = self.ctx.ledger.find_submitted(name, Some(month)).await? else {
            let status = self.ctx.ledger.status_for(name, Some(month)).await?;
            return Ok(ReopenOutcome::NotSubmitted {
                name: name.to_owned(),
                month: Some(month),
                status,
            });
        };

        let Some(url) = record.document().map(ToOwned::to_owned) else {
            return Ok(ReopenOutcome::DocumentMissing);
        };
        let Ok(doc) = DocumentRef::from_url(&url) else {
            return Ok(ReopenOutcome::DocumentInvalid);
        };

        let teacher = self
            .ctx
            .registry
            .find_for_record(record.teacher_id.as_deref(), &record.teacher_name)
            .await?;
        if !teacher.as_ref().is_some_and(Teacher::has_email) {
            return Ok(ReopenOutcome::EmailMissing {
                teacher_name: record.teacher_name,
            });
        }

        let report = permissions::unlock_document(self.ctx.documents.as_ref(), &doc).await;
        if !report.is_success() {
            return Ok(ReopenOutcome::UnlockFailed {
                teacher_name: record.teacher_name,
                month: record.month_key,
                diagnostic: report.diagnostic(UNLOCK_PARTIAL_FAILURE),
            });
        }

        self.ctx
            .ledger
            .update(&record.key, SubmissionPatch::reopen())
            .await?;
        self.reset_document(&doc).await;

        let notified = match teacher.and_then(|t| t.chat_user_id) {
            Some(chat) => {
                let text = messages::reopen_notice(
                    extract_last_name(&record.teacher_name),
                    record.month_key,
                    &url,
                );
                push_logged(self.ctx.chat.as_ref(), &chat, &text).await
            }
            None => false,
        };

        info!(key = %record.key, "Submission reopened");
        Ok(ReopenOutcome::Reopened {
            teacher_name: record.teacher_name,
            month: record.month_key,
            notified,
        })
    }

    /// Clear the submit checkbox and restore the status label
    async fn reset_document(&self, doc: &DocumentRef) {
        let writes = [
            (document_cells::SUBMIT_FLAG, CellValue::Bool(false)),
            (
                document_cells::STATUS_LABEL,
                document_cells::STATUS_NOT_SUBMITTED.into(),
            ),
        ];
        for (cell, value) in writes {
            if let Err(e) = self.ctx.documents.write_cell(doc, cell, value).await {
                warn!(document = %doc, cell, error = %e, "Failed to reset document cell");
            }
        }
    }
}
