// ABOUTME: Form intake: provisions a teacher's monthly document from the month template
// ABOUTME: Reuses an existing document, records unresolved teachers and missing templates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::LifecycleContext;
use crate::constants::document_cells;
use crate::errors::{AppError, AppResult};
use crate::external::{push_logged, DocumentRef};
use crate::messages;
use crate::models::{submission_key, MonthKey, Submission, SubmissionPatch, SubmissionStatus, Teacher};
use crate::names::normalize;
use crate::registry::NameLookup;

/// A form submission asking for a document
#[derive(Debug, Clone, Deserialize)]
pub struct FormSubmission {
    /// Teacher name as typed
    pub teacher_name: String,
    /// Target month; the next month when absent
    #[serde(default)]
    pub month_key: Option<MonthKey>,
}

/// What intake did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    /// Name did not resolve to one teacher
    TeacherNotFound {
        /// Ledger key used
        key: String,
    },
    /// The record already had a document; it was reused without a push
    Reused {
        /// Ledger key
        key: String,
        /// Existing document link
        url: String,
    },
    /// No template exists for the month
    TemplateNotFound {
        /// Ledger key
        key: String,
        /// Teacher was told
        notified: bool,
    },
    /// A fresh document was copied
    Created {
        /// Ledger key
        key: String,
        /// New document link
        url: String,
        /// Link was pushed to the teacher
        notified: bool,
    },
}

/// Document provisioning service
#[derive(Clone)]
pub struct SubmissionIntake {
    ctx: LifecycleContext,
}

impl SubmissionIntake {
    /// Create the intake service
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Provision (or reuse) the document for a teacher and month
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, or the ledger or the document
    /// provider fails while provisioning
    pub async fn request_document(
        &self,
        form: &FormSubmission,
        now: DateTime<Utc>,
    ) -> AppResult<IntakeOutcome> {
        let raw_name = form.teacher_name.trim();
        if raw_name.is_empty() {
            return Err(AppError::invalid_input("Teacher name is required"));
        }
        let month = form
            .month_key
            .unwrap_or_else(|| self.ctx.current_month(now).next());

        match self.ctx.registry.find_by_name(raw_name).await? {
            NameLookup::Found(teacher) => self.provision(&teacher, month).await,
            NameLookup::Multiple(_) | NameLookup::NotFound => {
                self.record_unresolved(raw_name, month).await
            }
        }
    }

    async fn record_unresolved(&self, raw_name: &str, month: MonthKey) -> AppResult<IntakeOutcome> {
        let key = format!("{month}-{}", normalize(raw_name));
        let existing = self.ctx.ledger.find(&key, month, None, raw_name).await?;
        match existing {
            Some(record) => {
                self.ctx
                    .ledger
                    .update(
                        &record.key,
                        SubmissionPatch {
                            status: Some(SubmissionStatus::TeacherNotFound),
                            ..SubmissionPatch::default()
                        },
                    )
                    .await?;
            }
            None => {
                self.ctx
                    .ledger
                    .append(&Submission::new(
                        key.clone(),
                        month,
                        None,
                        raw_name.to_owned(),
                        SubmissionStatus::TeacherNotFound,
                    ))
                    .await?;
            }
        }
        warn!(month = %month, "Form submitted for an unresolved teacher name");
        Ok(IntakeOutcome::TeacherNotFound { key })
    }

    async fn provision(&self, teacher: &Teacher, month: MonthKey) -> AppResult<IntakeOutcome> {
        let key = submission_key(month, Some(&teacher.id), &normalize(&teacher.display_name));
        let existing = self
            .ctx
            .ledger
            .find(&key, month, Some(&teacher.id), &teacher.display_name)
            .await?;

        if let Some(record) = &existing {
            if let Some(url) = record.document().map(ToOwned::to_owned) {
                self.upsert(
                    existing.as_ref(),
                    teacher,
                    month,
                    &key,
                    SubmissionStatus::Created,
                    Some(url.clone()),
                )
                .await?;
                if let Ok(doc) = DocumentRef::from_url(&url) {
                    self.write_teacher_name(&doc, teacher).await;
                }
                info!(key, "Reused existing document");
                return Ok(IntakeOutcome::Reused { key, url });
            }
        }

        let Some(template) = self.ctx.documents.find_template(month).await? else {
            let notified = match teacher.chat_user_id.as_deref() {
                Some(chat) => {
                    push_logged(
                        self.ctx.chat.as_ref(),
                        chat,
                        &messages::template_unavailable(month),
                    )
                    .await
                }
                None => false,
            };
            self.upsert(
                existing.as_ref(),
                teacher,
                month,
                &key,
                SubmissionStatus::TemplateNotFound,
                None,
            )
            .await?;
            warn!(month = %month, key, "No template for month");
            return Ok(IntakeOutcome::TemplateNotFound { key, notified });
        };

        let folder = self.ctx.documents.ensure_month_folder(month).await?;
        let name = format!("{month}_{}_シフト提出", teacher.display_name);
        let doc = self
            .ctx
            .documents
            .copy_template(&template, &folder, &name)
            .await?;
        let url = doc.edit_url();

        if let Err(e) = self.ctx.documents.set_public_editable(&doc).await {
            warn!(document = %doc, error = %e, "Failed to open link sharing on new document");
        }

        self.upsert(
            existing.as_ref(),
            teacher,
            month,
            &key,
            SubmissionStatus::Created,
            Some(url.clone()),
        )
        .await?;
        self.write_teacher_name(&doc, teacher).await;

        let notified = match teacher.chat_user_id.as_deref() {
            Some(chat) => {
                push_logged(
                    self.ctx.chat.as_ref(),
                    chat,
                    &messages::document_ready(month, &url),
                )
                .await
            }
            None => false,
        };
        info!(key, document = %doc, "Provisioned submission document");
        Ok(IntakeOutcome::Created { key, url, notified })
    }

    /// Update the found record (re-keying it) or append a new one
    async fn upsert(
        &self,
        existing: Option<&Submission>,
        teacher: &Teacher,
        month: MonthKey,
        key: &str,
        status: SubmissionStatus,
        url: Option<String>,
    ) -> AppResult<()> {
        match existing {
            Some(record) => {
                let clears_ack = status == SubmissionStatus::Created;
                self.ctx
                    .ledger
                    .update(
                        &record.key,
                        SubmissionPatch {
                            key: Some(key.to_owned()),
                            teacher_id: Some(Some(teacher.id.clone())),
                            teacher_name: Some(teacher.display_name.clone()),
                            document_url: url.map(Some),
                            status: Some(status),
                            ack_notified_at: clears_ack.then_some(None),
                            ..SubmissionPatch::default()
                        },
                    )
                    .await?;
            }
            None => {
                let mut record = Submission::new(
                    key.to_owned(),
                    month,
                    Some(teacher.id.clone()),
                    teacher.display_name.clone(),
                    status,
                );
                record.document_url = url;
                self.ctx.ledger.append(&record).await?;
            }
        }
        Ok(())
    }

    async fn write_teacher_name(&self, doc: &DocumentRef, teacher: &Teacher) {
        if let Err(e) = self
            .ctx
            .documents
            .write_cell(
                doc,
                document_cells::TEACHER_NAME,
                teacher.display_name.as_str().into(),
            )
            .await
        {
            warn!(document = %doc, error = %e, "Failed to write teacher name into document");
        }
    }
}
