// ABOUTME: Shared server context wiring configuration, storage, clients and lifecycle services
// ABOUTME: Built once at startup and handed to HTTP routes and the scheduler behind an Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::sync::Arc;

use crate::alerts::AdminAlerter;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::external::google_client::GoogleClient;
use crate::external::line_client::LineClient;
use crate::external::{ChatTransport, DocumentProvider};
use crate::health::HealthChecker;
use crate::ledger::SubmissionLedger;
use crate::lifecycle::intake::SubmissionIntake;
use crate::lifecycle::poll::SubmissionPoller;
use crate::lifecycle::reminders::ReminderEngine;
use crate::lifecycle::scheduler::Scheduler;
use crate::lifecycle::LifecycleContext;
use crate::registry::TeacherRegistry;
use crate::router::ConversationRouter;

/// Everything an entry point needs
#[derive(Clone)]
pub struct ServerContext {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Database handle
    pub database: Database,
    /// Shared lifecycle collaborators
    pub lifecycle: LifecycleContext,
    /// Inbound chat message router
    pub router: ConversationRouter,
    /// Form-driven document provisioning
    pub intake: SubmissionIntake,
    /// Reminder duties
    pub reminders: ReminderEngine,
    /// Submit-flag poller
    pub poller: SubmissionPoller,
    /// Job runner
    pub scheduler: Scheduler,
    /// Admin failure notifications
    pub alerter: AdminAlerter,
    /// Health checks
    pub health: HealthChecker,
}

impl ServerContext {
    /// Wire a context over already constructed clients
    #[must_use]
    pub fn new(
        config: ServerConfig,
        database: Database,
        chat: Arc<dyn ChatTransport>,
        documents: Arc<dyn DocumentProvider>,
    ) -> Self {
        let lifecycle = LifecycleContext {
            registry: TeacherRegistry::new(database.teachers(), config.conversation.matcher),
            ledger: SubmissionLedger::new(database.submissions()),
            reminder_rules: database.reminder_rules(),
            chat: Arc::clone(&chat),
            documents,
            admin_chat_user_id: config.admin_chat_user_id.clone(),
            timezone: config.schedule.timezone,
        };
        let states = database.conversation_states(config.conversation.state_ttl);
        let alerter = AdminAlerter::new(
            chat,
            config.admin_chat_user_id.clone(),
            config.schedule.timezone,
        );

        Self {
            router: ConversationRouter::new(
                lifecycle.clone(),
                states.clone(),
                config.conversation.clone(),
            ),
            intake: SubmissionIntake::new(lifecycle.clone()),
            reminders: ReminderEngine::new(lifecycle.clone()),
            poller: SubmissionPoller::new(lifecycle.clone()),
            scheduler: Scheduler::new(lifecycle.clone(), states, alerter.clone(), config.schedule),
            alerter,
            lifecycle,
            health: HealthChecker::new(database.clone()),
            database,
            config: Arc::new(config),
        }
    }

    /// Connect the database and build the real messaging and document clients
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, or an
    /// HTTP client cannot be built
    pub async fn connect(config: ServerConfig) -> AppResult<Self> {
        let database = Database::connect(&config.database_url).await?;
        let chat: Arc<dyn ChatTransport> = Arc::new(LineClient::new(config.line.clone())?);
        let documents: Arc<dyn DocumentProvider> =
            Arc::new(GoogleClient::new(config.documents.clone())?);
        Ok(Self::new(config, database, chat, documents))
    }
}
