// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation engine: routes inbound events to per-user sessions.
//!
//! The session map is a [`DashMap`] of `Arc<tokio::sync::Mutex<_>>`, so
//! events for different users proceed in parallel while events from the
//! same user are applied one at a time. A session is removed from the map
//! while its lock is still held; a waiter that then acquires the lock sees
//! the terminal phase and retries against the map.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ticketbot_config::model::IntakeConfig;
use ticketbot_core::{ChannelRecord, InboundEvent, Platform, Reply, TicketbotError};
use ticketbot_storage::Database;
use ticketbot_storage::queries::channels::get_channel;
use ticketbot_storage::queries::tickets::{pending_rating_ticket, record_rating};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::finalizer::{FinalizeRequest, TicketFinalizer, discard_staged};
use crate::session::{AnswerOutcome, ConversationState, Phase, SessionKey};
use crate::templates::TemplateStore;

type SessionHandle = Arc<Mutex<ConversationState>>;

pub struct ConversationEngine {
    db: Database,
    store: Arc<TemplateStore>,
    finalizer: TicketFinalizer,
    config: IntakeConfig,
    sessions: DashMap<SessionKey, SessionHandle>,
}

impl ConversationEngine {
    pub fn new(
        db: Database,
        store: Arc<TemplateStore>,
        finalizer: TicketFinalizer,
        config: IntakeConfig,
    ) -> Self {
        Self {
            db,
            store,
            finalizer,
            config,
            sessions: DashMap::new(),
        }
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Process one inbound event and return the replies to send back.
    ///
    /// Fails only for an unknown channel, storage errors, and a ticket
    /// finalization that was rolled back.
    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<Reply>, TicketbotError> {
        let channel = get_channel(&self.db, &event.channel_id)
            .await?
            .ok_or_else(|| TicketbotError::NotFound {
                entity: "channel",
                id: event.channel_id.clone(),
            })?;
        let key = SessionKey::new(&event.platform_user_id, &event.channel_id);

        if !self.sessions.contains_key(&key)
            && let Some(replies) = self.capture_rating(&channel, &event).await?
        {
            return Ok(replies);
        }

        loop {
            let (handle, created) = self.session_for(&key, &channel);
            let mut state = handle.lock().await;
            if state.phase() == Phase::Terminal {
                continue;
            }

            let outcome = if created {
                Ok(self.greet(&mut state, channel.platform, event))
            } else {
                self.step(&mut state, channel.platform, event).await
            };

            if state.phase() == Phase::Terminal {
                self.sessions
                    .remove_if(&key, |_, current| Arc::ptr_eq(current, &handle));
            }
            return outcome;
        }
    }

    /// Drop sessions idle for longer than `idle_timeout_secs` and delete
    /// their staged attachments. Sessions busy with an event are skipped.
    pub async fn sweep_idle(&self) -> usize {
        let timeout = Duration::from_secs(self.config.idle_timeout_secs);
        let now = Instant::now();
        let candidates: Vec<(SessionKey, SessionHandle)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut swept = 0;
        for (key, handle) in candidates {
            let Ok(mut state) = handle.try_lock() else {
                continue;
            };
            if state.phase() == Phase::Terminal || !state.is_idle(now, timeout) {
                continue;
            }
            let staged = state.cancel();
            self.sessions
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &handle));
            drop(state);
            discard_staged(&staged).await;
            tracing::info!(
                user_id = %key.user_id,
                channel_id = %key.channel_id,
                "idle intake session expired"
            );
            swept += 1;
        }
        swept
    }

    fn session_for(&self, key: &SessionKey, channel: &ChannelRecord) -> (SessionHandle, bool) {
        if let Some(existing) = self.sessions.get(key) {
            return (existing.value().clone(), false);
        }
        let mut created = false;
        let handle = self
            .sessions
            .entry(key.clone())
            .or_insert_with(|| {
                created = true;
                let snapshot = self.store.snapshot();
                let template = snapshot.question_template_for(channel).clone();
                tracing::debug!(
                    user_id = %key.user_id,
                    channel_id = %key.channel_id,
                    template = %template.id,
                    "intake session started"
                );
                Arc::new(Mutex::new(ConversationState::start(
                    key.clone(),
                    snapshot,
                    &template,
                )))
            })
            .value()
            .clone();
        (handle, created)
    }

    fn greet(
        &self,
        state: &mut ConversationState,
        platform: Platform,
        event: InboundEvent,
    ) -> Vec<Reply> {
        state.add_attachments(event.attachments);
        vec![
            Reply::text(&self.config.greeting),
            self.prompt(state, platform),
        ]
    }

    async fn step(
        &self,
        state: &mut ConversationState,
        platform: Platform,
        event: InboundEvent,
    ) -> Result<Vec<Reply>, TicketbotError> {
        state.touch();
        let text = event.trimmed_text().map(str::to_string);

        if let Some(text) = &text
            && self.is_cancel_keyword(text)
        {
            let mut staged = state.cancel();
            staged.extend(event.attachments);
            discard_staged(&staged).await;
            tracing::info!(
                user_id = %state.key().user_id,
                channel_id = %state.key().channel_id,
                "intake cancelled by user"
            );
            return Ok(vec![Reply::text(&self.config.cancelled_message)]);
        }

        match state.phase() {
            Phase::Asking => {
                state.add_attachments(event.attachments);
                let Some(text) = text else {
                    tracing::debug!("answer without text, re-prompting");
                    return Ok(vec![self.prompt(state, platform)]);
                };
                match state.submit_answer(&text) {
                    Ok(AnswerOutcome::Rejected { .. }) => Ok(vec![
                        Reply::text(&self.config.invalid_option_prompt),
                        self.prompt(state, platform),
                    ]),
                    Ok(AnswerOutcome::Accepted) => Ok(vec![self.prompt(state, platform)]),
                    Err(e) => {
                        tracing::debug!(error = %e, "re-prompting");
                        Ok(vec![self.prompt(state, platform)])
                    }
                }
            }
            Phase::AwaitingFreeText => {
                if text.is_none() && event.attachments.is_empty() {
                    return Ok(vec![self.prompt(state, platform)]);
                }
                state.add_attachments(event.attachments);
                let (answers, attachments) = state.finish();
                let request = FinalizeRequest {
                    channel_id: state.key().channel_id.clone(),
                    user_id: state.key().user_id.clone(),
                    answers,
                    problem: text.unwrap_or_default(),
                    attachments,
                };
                let ticket_id = self.finalizer.finalize(request).await?;
                Ok(vec![Reply::text(
                    self.config
                        .ticket_created_message
                        .replace("{ticket_id}", &ticket_id),
                )])
            }
            Phase::Terminal => Ok(Vec::new()),
        }
    }

    /// The prompt for wherever the session currently stands.
    fn prompt(&self, state: &ConversationState, platform: Platform) -> Reply {
        let Some(question) = state.current_question() else {
            return Reply::text(&self.config.free_text_prompt);
        };
        let options = state.current_options();
        let caps = platform.capabilities();
        let limit = self.config.quick_reply_limit.min(caps.max_quick_replies);
        let quick_replies = if caps.quick_replies && !options.is_empty() && options.len() <= limit {
            options
        } else {
            Vec::new()
        };
        Reply {
            text: question.text.clone(),
            quick_replies,
        }
    }

    fn is_cancel_keyword(&self, text: &str) -> bool {
        self.config
            .cancel_keywords
            .iter()
            .any(|k| k.trim().eq_ignore_ascii_case(text))
    }

    /// Record a bare-number rating for the user's last resolved ticket.
    async fn capture_rating(
        &self,
        channel: &ChannelRecord,
        event: &InboundEvent,
    ) -> Result<Option<Vec<Reply>>, TicketbotError> {
        let Some(value) = event.trimmed_text().and_then(|t| t.parse::<u8>().ok()) else {
            return Ok(None);
        };
        let snapshot = self.store.snapshot();
        let Some(template) = snapshot.rating_template_for(channel) else {
            return Ok(None);
        };
        let Some(response) = template.response_for(value) else {
            return Ok(None);
        };
        let Some(ticket) =
            pending_rating_ticket(&self.db, &channel.id, &event.platform_user_id).await?
        else {
            return Ok(None);
        };
        if !record_rating(&self.db, &ticket.ticket_id, Some(&template.id), i64::from(value)).await? {
            return Ok(None);
        }
        tracing::info!(ticket_id = %ticket.ticket_id, value, "rating recorded");
        Ok(Some(vec![Reply::text(response)]))
    }
}
