// ABOUTME: Domain model module root for the shift submission coordinator
// ABOUTME: Re-exports month keys, teachers, submissions, conversation topics and reminder rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

mod conversation;
mod month;
mod reminder;
mod submission;
mod teacher;

pub use conversation::{
    ConversationState, ConversationTopic, EmailConfirmPayload, EmailRequestPayload,
    MonthSelectPayload, TopicPayload,
};
pub use month::MonthKey;
pub use reminder::{
    default_reminder_rules, ReminderAudience, ReminderRule, TemplateVars, INITIAL_REQUEST_RULE_ID,
};
pub use submission::{submission_key, Submission, SubmissionPatch, SubmissionStatus};
pub use teacher::{extract_last_name, Teacher};
