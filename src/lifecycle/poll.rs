// ABOUTME: Polls each teacher document's submit flag and advances the ledger
// ABOUTME: Marks submitted, locks the document, and sends exactly one acknowledgement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::permissions::{self, lock_steps, LOCK_PARTIAL_FAILURE};
use super::{BatchReport, LifecycleContext};
use crate::constants::document_cells;
use crate::errors::AppResult;
use crate::external::{push_logged, DocumentRef};
use crate::messages;
use crate::models::{extract_last_name, Submission, SubmissionPatch, SubmissionStatus, Teacher};

/// What polling did for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Nothing to do (no usable document, or already settled)
    Skipped,
    /// Flag still unset
    Unchanged,
    /// Newly marked submitted
    Submitted {
        /// Lock applied in this pass
        locked: bool,
        /// Acknowledgement delivered in this pass
        acknowledged: bool,
    },
    /// Already submitted; the pending acknowledgement was delivered
    Acknowledged,
    /// Already submitted; acknowledgement still pending (no chat identity or send failed)
    AckPending,
}

/// Submit-flag poller
#[derive(Clone)]
pub struct SubmissionPoller {
    ctx: LifecycleContext,
}

impl SubmissionPoller {
    /// Create a poller
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Check every pending record once
    ///
    /// # Errors
    ///
    /// Returns an error only if the pending set cannot be read; per-record
    /// failures and undecodable rows land in the report
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<BatchReport> {
        let pending = self.ctx.ledger.list_pending_poll().await?;
        debug!(
            records = pending.records.len(),
            malformed = pending.rejected.len(),
            "Polling submission documents"
        );

        let mut report = BatchReport::default();
        for (key, e) in &pending.rejected {
            report.fail(key.clone(), e);
        }
        for record in pending.records {
            match self.advance(&record, now).await {
                Ok(PollStep::Skipped | PollStep::AckPending) => report.skipped += 1,
                Ok(_) => report.processed += 1,
                Err(e) => report.fail(record.key.clone(), &e),
            }
        }
        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Submission poll finished"
        );
        Ok(report)
    }

    /// Advance a single record
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be read or the ledger write fails
    pub async fn advance(&self, record: &Submission, now: DateTime<Utc>) -> AppResult<PollStep> {
        if record.is_settled() {
            return Ok(PollStep::Skipped);
        }
        let Some(url) = record.document() else {
            return Ok(PollStep::Skipped);
        };
        let Ok(doc) = DocumentRef::from_url(url) else {
            debug!(key = %record.key, "Document URL has no file id");
            return Ok(PollStep::Skipped);
        };

        if record.status == SubmissionStatus::Submitted {
            let teacher = self.teacher_for(record).await;
            return Ok(if self.acknowledge(record, teacher.as_ref(), now).await? {
                PollStep::Acknowledged
            } else {
                PollStep::AckPending
            });
        }

        if !self
            .ctx
            .documents
            .read_flag(&doc, document_cells::SUBMIT_FLAG)
            .await?
        {
            return Ok(PollStep::Unchanged);
        }

        let record = self
            .ctx
            .ledger
            .update(&record.key, SubmissionPatch::submitted(now))
            .await?;
        info!(key = %record.key, "Submission marked submitted");

        if let Err(e) = self
            .ctx
            .documents
            .write_cell(
                &doc,
                document_cells::STATUS_LABEL,
                document_cells::STATUS_SUBMITTED.into(),
            )
            .await
        {
            warn!(key = %record.key, error = %e, "Failed to update document status label");
        }

        let teacher = self.teacher_for(&record).await;
        let locked = self.lock(&record, &doc, teacher.as_ref(), now).await;
        let acknowledged = self.acknowledge(&record, teacher.as_ref(), now).await?;
        Ok(PollStep::Submitted {
            locked,
            acknowledged,
        })
    }

    async fn teacher_for(&self, record: &Submission) -> Option<Teacher> {
        match self
            .ctx
            .registry
            .find_for_record(record.teacher_id.as_deref(), &record.teacher_name)
            .await
        {
            Ok(teacher) => teacher,
            Err(e) => {
                warn!(key = %record.key, error = %e, "Teacher lookup failed");
                None
            }
        }
    }

    /// Lock once, and only for teachers with an email on file
    async fn lock(
        &self,
        record: &Submission,
        doc: &DocumentRef,
        teacher: Option<&Teacher>,
        now: DateTime<Utc>,
    ) -> bool {
        if record.locked_at.is_some() || !teacher.is_some_and(Teacher::has_email) {
            return false;
        }

        let report = permissions::lock_document(self.ctx.documents.as_ref(), doc).await;
        if !report.is_success() {
            warn!(key = %record.key, diagnostic = %report.diagnostic(LOCK_PARTIAL_FAILURE), "Lock incomplete");
        }
        if !report.step_succeeded(lock_steps::PROTECT) {
            return false;
        }

        let stamped = self
            .ctx
            .ledger
            .update(
                &record.key,
                SubmissionPatch {
                    locked_at: Some(Some(now)),
                    ..SubmissionPatch::default()
                },
            )
            .await;
        if let Err(e) = &stamped {
            warn!(key = %record.key, error = %e, "Failed to stamp lock time");
        }
        stamped.is_ok()
    }

    /// Push the acknowledgement and stamp it; returns whether it was sent
    async fn acknowledge(
        &self,
        record: &Submission,
        teacher: Option<&Teacher>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        if record.ack_notified_at.is_some() {
            return Ok(false);
        }
        let Some(chat_user_id) = teacher.and_then(|t| t.chat_user_id.as_deref()) else {
            debug!(key = %record.key, "No chat identity for acknowledgement");
            return Ok(false);
        };

        let text = messages::submission_acknowledged(
            extract_last_name(&record.teacher_name),
            record.month_key,
        );
        if !push_logged(self.ctx.chat.as_ref(), chat_user_id, &text).await {
            return Ok(false);
        }

        self.ctx
            .ledger
            .update(
                &record.key,
                SubmissionPatch {
                    ack_notified_at: Some(Some(now)),
                    ..SubmissionPatch::default()
                },
            )
            .await?;
        Ok(true)
    }
}
