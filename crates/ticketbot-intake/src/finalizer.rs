// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a completed conversation into a persisted ticket.
//!
//! Everything happens in one transaction: the ticket row, the originating
//! message, the problem text history entry, and one history entry per
//! attachment copied into `<root>/<ticket_id>/`. A failed copy or statement
//! rolls the transaction back and removes the ticket directory. Staged
//! files are deleted afterwards whatever the outcome.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rusqlite::Transaction;
use ticketbot_config::model::AttachmentsConfig;
use ticketbot_core::{StagedAttachment, TicketbotError, now_timestamp};
use ticketbot_storage::models::{AUTHOR_USER, NewTicket, TicketMessage};
use ticketbot_storage::queries::tickets::{
    append_history_tx, insert_origin_message_tx, insert_ticket_tx, is_unique_violation,
};
use ticketbot_storage::{Database, StorageFailure};

/// Fresh ids to try before giving up on a colliding ticket id.
const MAX_ID_ATTEMPTS: usize = 5;

/// A finished conversation ready to become a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRequest {
    pub channel_id: String,
    pub user_id: String,
    pub answers: BTreeMap<String, String>,
    pub problem: String,
    pub attachments: Vec<StagedAttachment>,
}

/// Allocate an opaque ticket id: UTC date plus eight random hex digits.
pub fn new_ticket_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        chrono::Utc::now().format("%y%m%d"),
        random[..8].to_uppercase()
    )
}

/// Delete staged attachment files. Missing files are not an error.
pub async fn discard_staged(attachments: &[StagedAttachment]) {
    for attachment in attachments {
        match tokio::fs::remove_file(&attachment.temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %attachment.temp_path.display(),
                error = %e,
                "failed to remove staged attachment"
            ),
        }
    }
}

#[derive(Clone)]
pub struct TicketFinalizer {
    db: Database,
    root_dir: PathBuf,
}

impl TicketFinalizer {
    pub fn new(db: Database, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            root_dir: root_dir.into(),
        }
    }

    pub fn from_config(db: Database, config: &AttachmentsConfig) -> Self {
        Self::new(db, &config.root_dir)
    }

    /// Persist the ticket and return its id.
    pub async fn finalize(&self, request: FinalizeRequest) -> Result<String, TicketbotError> {
        let result = self.persist(&request).await;
        discard_staged(&request.attachments).await;
        if let Err(e) = &result {
            tracing::error!(
                channel_id = %request.channel_id,
                user_id = %request.user_id,
                error = %e,
                "ticket finalization failed"
            );
        }
        result
    }

    async fn persist(&self, request: &FinalizeRequest) -> Result<String, TicketbotError> {
        let attachments = transferable(&request.attachments).await;
        let created_at = now_timestamp();

        for _ in 0..MAX_ID_ATTEMPTS {
            let ticket_id = new_ticket_id();
            let job = PersistJob {
                ticket: NewTicket {
                    ticket_id: ticket_id.clone(),
                    channel_id: request.channel_id.clone(),
                    user_id: request.user_id.clone(),
                    created_at: created_at.clone(),
                },
                message: origin_message(&ticket_id, request, &created_at),
                attachments: attachments.clone(),
                ticket_dir: self.root_dir.join(&ticket_id),
            };
            match self.db.call(move |conn| job.run(conn)).await? {
                Persisted::Created => {
                    tracing::info!(
                        ticket_id = %ticket_id,
                        channel_id = %request.channel_id,
                        attachments = attachments.len(),
                        "ticket created"
                    );
                    return Ok(ticket_id);
                }
                Persisted::IdTaken => {
                    tracing::debug!(ticket_id = %ticket_id, "ticket id collision, regenerating");
                }
            }
        }
        Err(TicketbotError::Finalization {
            message: "could not allocate a unique ticket id".to_string(),
            source: None,
        })
    }
}

fn origin_message(ticket_id: &str, request: &FinalizeRequest, created_at: &str) -> TicketMessage {
    let answer = |key: &str| request.answers.get(key).cloned();
    TicketMessage {
        ticket_id: ticket_id.to_string(),
        channel_id: request.channel_id.clone(),
        user_id: request.user_id.clone(),
        business: answer("business"),
        location_type: answer("location_type"),
        city: answer("city"),
        location_name: answer("location_name"),
        problem: request.problem.clone(),
        fields: serde_json::Value::Object(
            request
                .answers
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        ),
        created_at: created_at.to_string(),
    }
}

/// A staged file that made it to the staging area, with its final name.
#[derive(Debug, Clone)]
struct Transfer {
    temp_path: PathBuf,
    file_name: String,
}

/// Keep attachments whose staged file exists; drop the rest with a warning.
async fn transferable(attachments: &[StagedAttachment]) -> Vec<Transfer> {
    let mut used = HashSet::new();
    let mut out = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        match tokio::fs::metadata(&attachment.temp_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) | Err(_) => {
                tracing::warn!(
                    file_name = %attachment.file_name,
                    path = %attachment.temp_path.display(),
                    "staged attachment missing, dropping it"
                );
                continue;
            }
        }
        let base = safe_file_name(&attachment.file_name);
        let mut file_name = base.clone();
        let mut n = 2;
        while !used.insert(file_name.clone()) {
            file_name = format!("{n}_{base}");
            n += 1;
        }
        out.push(Transfer {
            temp_path: attachment.temp_path.clone(),
            file_name,
        });
    }
    out
}

/// Strip directories from a user-supplied name.
fn safe_file_name(name: &str) -> String {
    Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
        .unwrap_or_else(|| "attachment".to_string())
}

enum Persisted {
    Created,
    IdTaken,
}

#[derive(Debug)]
enum FinalizeFailure {
    Sql(rusqlite::Error),
    Io { path: PathBuf, source: std::io::Error },
}

impl From<rusqlite::Error> for FinalizeFailure {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e)
    }
}

impl StorageFailure for FinalizeFailure {
    fn is_busy(&self) -> bool {
        matches!(self, Self::Sql(e) if e.is_busy())
    }

    fn into_error(self) -> TicketbotError {
        match self {
            Self::Sql(e) => TicketbotError::Finalization {
                message: format!("database write failed: {e}"),
                source: Some(Box::new(e)),
            },
            Self::Io { path, source } => TicketbotError::Finalization {
                message: format!("could not store attachment {}: {source}", path.display()),
                source: Some(Box::new(source)),
            },
        }
    }
}

/// One attempt at writing a ticket. Runs on the database thread.
#[derive(Clone)]
struct PersistJob {
    ticket: NewTicket,
    message: TicketMessage,
    attachments: Vec<Transfer>,
    ticket_dir: PathBuf,
}

impl PersistJob {
    fn run(self, conn: &mut rusqlite::Connection) -> Result<Persisted, FinalizeFailure> {
        let tx = conn.transaction()?;
        match insert_ticket_tx(&tx, &self.ticket) {
            Err(e) if is_unique_violation(&e) => return Ok(Persisted::IdTaken),
            other => other?,
        }
        let result = self.write_rest(&tx).and_then(|()| tx.commit().map_err(FinalizeFailure::from));
        if result.is_err() && !self.attachments.is_empty() {
            // The transaction is rolled back on drop; the copied files go too.
            if let Err(e) = std::fs::remove_dir_all(&self.ticket_dir)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(dir = %self.ticket_dir.display(), error = %e, "failed to clean ticket directory");
            }
        }
        result.map(|()| Persisted::Created)
    }

    fn write_rest(&self, tx: &Transaction<'_>) -> Result<(), FinalizeFailure> {
        let ticket_id = &self.ticket.ticket_id;
        let created_at = &self.ticket.created_at;
        insert_origin_message_tx(tx, &self.message)?;
        append_history_tx(
            tx,
            ticket_id,
            AUTHOR_USER,
            Some(self.message.problem.as_str()),
            None,
            created_at,
        )?;

        if self.attachments.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.ticket_dir).map_err(|source| FinalizeFailure::Io {
            path: self.ticket_dir.clone(),
            source,
        })?;
        for transfer in &self.attachments {
            let target = self.ticket_dir.join(&transfer.file_name);
            std::fs::copy(&transfer.temp_path, &target).map_err(|source| FinalizeFailure::Io {
                path: target.clone(),
                source,
            })?;
            let stored = format!("{ticket_id}/{}", transfer.file_name);
            append_history_tx(tx, ticket_id, AUTHOR_USER, None, Some(stored.as_str()), created_at)?;
        }
        Ok(())
    }
}
