// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation state.
//!
//! A session walks the snapshot of one question template. It never touches
//! storage; the engine drives it and performs all I/O.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ticketbot_core::{StagedAttachment, TicketbotError};
use tokio::time::Instant;

use crate::templates::{IntakeSnapshot, QuestionDefinition, QuestionKind, QuestionTemplate};

/// Where a conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Asking,
    AwaitingFreeText,
    Terminal,
}

/// Sessions are keyed by the platform user and the channel they wrote to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: String,
    pub channel_id: String,
}

impl SessionKey {
    pub fn new(user_id: &str, channel_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
        }
    }
}

/// Result of submitting an answer to the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Accepted,
    /// The text is not one of the valid options. Nothing changed.
    Rejected { options: Vec<String> },
}

#[derive(Debug)]
pub struct ConversationState {
    key: SessionKey,
    snapshot: Arc<IntakeSnapshot>,
    template_id: String,
    questions: Vec<QuestionDefinition>,
    answers: BTreeMap<String, String>,
    cursor: usize,
    phase: Phase,
    attachments: Vec<StagedAttachment>,
    last_activity: Instant,
}

impl ConversationState {
    /// Start walking `template`. A template without questions goes straight
    /// to free-text capture.
    pub fn start(key: SessionKey, snapshot: Arc<IntakeSnapshot>, template: &QuestionTemplate) -> Self {
        let phase = if template.questions.is_empty() {
            Phase::AwaitingFreeText
        } else {
            Phase::Asking
        };
        Self {
            key,
            snapshot,
            template_id: template.id.clone(),
            questions: template.questions.clone(),
            answers: BTreeMap::new(),
            cursor: 0,
            phase,
            attachments: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub fn attachments(&self) -> &[StagedAttachment] {
        &self.attachments
    }

    /// The question waiting for an answer, while asking.
    pub fn current_question(&self) -> Option<&QuestionDefinition> {
        match self.phase {
            Phase::Asking => self.questions.get(self.cursor),
            _ => None,
        }
    }

    /// Valid answers to the current question given the answers so far.
    ///
    /// Empty means any text is accepted.
    pub fn current_options(&self) -> Vec<String> {
        let Some(question) = self.current_question() else {
            return Vec::new();
        };
        match (&question.kind, &question.preset) {
            (QuestionKind::Preset, Some(preset)) => self
                .snapshot
                .presets
                .options_for(&preset.field, &self.answers)
                .into_iter()
                .filter(|o| !question.excluded_options.contains(o))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Record `text` as the answer to the current question.
    ///
    /// Matching is exact after trimming. A rejected answer leaves the
    /// cursor and the answers untouched.
    pub fn submit_answer(&mut self, text: &str) -> Result<AnswerOutcome, TicketbotError> {
        let text = text.trim();
        let Some(question) = self.current_question() else {
            return Err(TicketbotError::SessionProtocol(format!(
                "no question awaits an answer in phase {:?}",
                self.phase
            )));
        };
        let key = question.answer_key(self.cursor);
        let options = self.current_options();
        if !options.is_empty() && !options.iter().any(|o| o == text) {
            return Ok(AnswerOutcome::Rejected { options });
        }

        self.answers.insert(key, text.to_string());
        self.cursor += 1;
        if self.cursor >= self.questions.len() {
            self.phase = Phase::AwaitingFreeText;
        }
        Ok(AnswerOutcome::Accepted)
    }

    /// Keep attachments that arrive before the problem text.
    pub fn add_attachments(&mut self, attachments: Vec<StagedAttachment>) {
        self.attachments.extend(attachments);
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) >= timeout
    }

    /// End the session for finalization, handing over answers and attachments.
    pub fn finish(&mut self) -> (BTreeMap<String, String>, Vec<StagedAttachment>) {
        self.phase = Phase::Terminal;
        (
            std::mem::take(&mut self.answers),
            std::mem::take(&mut self.attachments),
        )
    }

    /// End the session without a ticket. Returns staged files to delete.
    pub fn cancel(&mut self) -> Vec<StagedAttachment> {
        self.phase = Phase::Terminal;
        self.answers.clear();
        std::mem::take(&mut self.attachments)
    }
}
