// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Questionnaire and rating templates.
//!
//! Raw settings are never trusted: [`sanitize`] drops what it cannot use
//! and fills in defaults, so the rest of the intake path can rely on there
//! always being an active question template and on every rating value
//! having response text.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ticketbot_core::{ChannelRecord, TicketbotError};
use ticketbot_storage::Database;
use ticketbot_storage::models::{
    SETTINGS_PRESET_CATALOGUE, SETTINGS_PRESET_SCHEMA, SETTINGS_QUESTIONNAIRE,
};
use ticketbot_storage::queries::settings::get_setting;

use crate::catalogue::Catalogue;
use crate::resolver::{PresetResolver, PresetSchema};

/// ID of the template substituted when no configured template survives.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Response text for rating values the template leaves unset.
pub const DEFAULT_RATING_RESPONSE: &str = "Thank you for your feedback!";

const DEFAULT_SCALE_SIZE: u8 = 5;

static DEFAULT_TEMPLATE: LazyLock<QuestionTemplate> = LazyLock::new(QuestionTemplate::builtin);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Preset,
    Custom,
}

/// Reference to a preset field in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRef {
    pub group: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: Option<String>,
    pub kind: QuestionKind,
    pub text: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetRef>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_options: BTreeSet<String>,
}

impl QuestionDefinition {
    /// Key under which the answer is stored: the preset field, else the
    /// question id, else `question_<n>` for the 1-based position.
    pub fn answer_key(&self, index: usize) -> String {
        if let Some(preset) = &self.preset {
            return preset.field.clone();
        }
        match &self.id {
            Some(id) => id.clone(),
            None => format!("question_{}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub id: String,
    pub name: String,
    pub questions: Vec<QuestionDefinition>,
}

impl QuestionTemplate {
    /// The built-in template: no questions, straight to the problem text.
    pub fn builtin() -> Self {
        Self {
            id: DEFAULT_TEMPLATE_ID.to_string(),
            name: "Default".to_string(),
            questions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingTemplate {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub scale_size: u8,
    /// One entry for every value in `1..=scale_size`.
    pub responses: BTreeMap<u8, String>,
}

impl RatingTemplate {
    /// Response text for a rating value, `None` when out of range.
    pub fn response_for(&self, value: u8) -> Option<&str> {
        self.responses.get(&value).map(String::as_str)
    }

    /// Rating values as strings, for quick-reply palettes.
    pub fn values(&self) -> Vec<String> {
        (1..=self.scale_size).map(|v| v.to_string()).collect()
    }
}

/// Sanitized questionnaire settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSettings {
    /// Never empty.
    pub question_templates: Vec<QuestionTemplate>,
    /// Always names one of `question_templates`.
    pub active_question_template: String,
    pub rating_templates: Vec<RatingTemplate>,
    pub active_rating_template: Option<String>,
}

impl Default for NormalizedSettings {
    fn default() -> Self {
        Self {
            question_templates: vec![QuestionTemplate::builtin()],
            active_question_template: DEFAULT_TEMPLATE_ID.to_string(),
            rating_templates: Vec::new(),
            active_rating_template: None,
        }
    }
}

impl NormalizedSettings {
    /// The template with `id`, else the active one.
    pub fn question_template(&self, id: Option<&str>) -> &QuestionTemplate {
        id.and_then(|id| self.question_templates.iter().find(|t| t.id == id))
            .or_else(|| {
                self.question_templates
                    .iter()
                    .find(|t| t.id == self.active_question_template)
            })
            .or_else(|| self.question_templates.first())
            .unwrap_or(&*DEFAULT_TEMPLATE)
    }

    /// The rating template with `id`, else the active one, if any.
    pub fn rating_template(&self, id: Option<&str>) -> Option<&RatingTemplate> {
        id.and_then(|id| self.rating_templates.iter().find(|t| t.id == id))
            .or_else(|| {
                let active = self.active_rating_template.as_deref()?;
                self.rating_templates.iter().find(|t| t.id == active)
            })
    }
}

/// Sanitize a raw questionnaire document.
///
/// Expected shape:
/// `{"question_templates": [...], "active_question_template": "...",
///   "rating_templates": [...], "active_rating_template": "..."}`.
pub fn sanitize(raw: &Value, presets: &PresetResolver, max_scale: u8) -> NormalizedSettings {
    let max_scale = max_scale.max(1);

    let mut template_ids = UniqueIds::default();
    let mut question_templates: Vec<QuestionTemplate> = array(raw, "question_templates")
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| sanitize_question_template(entry, i, presets, &mut template_ids))
        .collect();
    if question_templates.is_empty() {
        tracing::warn!("no usable question template configured, using built-in default");
        question_templates.push(QuestionTemplate::builtin());
    }
    let active_question_template = pick_active(
        raw.get("active_question_template").and_then(Value::as_str),
        question_templates.iter().map(|t| t.id.as_str()),
    )
    .unwrap_or(DEFAULT_TEMPLATE_ID)
    .to_string();

    let mut rating_ids = UniqueIds::default();
    let rating_templates: Vec<RatingTemplate> = array(raw, "rating_templates")
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| sanitize_rating_template(entry, i, max_scale, &mut rating_ids))
        .collect();
    let active_rating_template = pick_active(
        raw.get("active_rating_template").and_then(Value::as_str),
        rating_templates.iter().map(|t| t.id.as_str()),
    )
    .map(str::to_string);

    NormalizedSettings {
        question_templates,
        active_question_template,
        rating_templates,
        active_rating_template,
    }
}

fn array<'a>(raw: &'a Value, key: &str) -> &'a [Value] {
    raw.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn pick_active<'a>(
    requested: Option<&str>,
    mut available: impl Iterator<Item = &'a str> + Clone,
) -> Option<&'a str> {
    let requested = requested.map(str::trim);
    available
        .clone()
        .find(|id| Some(*id) == requested)
        .or_else(|| available.next())
}

fn text_field(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Hands out ids, suffixing `_2`, `_3`, ... on collision.
#[derive(Default)]
struct UniqueIds {
    seen: HashSet<String>,
}

impl UniqueIds {
    fn claim(&mut self, base: String) -> String {
        if self.seen.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.seen.insert(candidate.clone()) {
                tracing::warn!(id = %base, rekeyed = %candidate, "duplicate template id rekeyed");
                return candidate;
            }
            n += 1;
        }
    }
}

fn sanitize_question_template(
    entry: &Value,
    index: usize,
    presets: &PresetResolver,
    ids: &mut UniqueIds,
) -> Option<QuestionTemplate> {
    if !entry.is_object() {
        tracing::warn!(index, "dropping malformed question template");
        return None;
    }
    let id = ids.claim(text_field(entry, "id").unwrap_or_else(|| format!("template_{}", index + 1)));
    let name = text_field(entry, "name").unwrap_or_else(|| id.clone());

    let mut question_ids = UniqueIds::default();
    let mut questions: Vec<(i64, usize, QuestionDefinition)> = array(entry, "questions")
        .iter()
        .enumerate()
        .filter_map(|(i, q)| {
            sanitize_question(q, presets, &mut question_ids).map(|q| (q.order, i, q))
        })
        .collect();
    questions.sort_by_key(|(order, i, _)| (*order, *i));

    Some(QuestionTemplate {
        id,
        name,
        questions: questions.into_iter().map(|(_, _, q)| q).collect(),
    })
}

fn sanitize_question(
    entry: &Value,
    presets: &PresetResolver,
    ids: &mut UniqueIds,
) -> Option<QuestionDefinition> {
    let text = text_field(entry, "text")?;
    let preset = entry.get("preset").and_then(|p| {
        Some(PresetRef {
            group: text_field(p, "group")?,
            field: text_field(p, "field")?,
        })
    });
    let kind = match entry.get("kind").and_then(Value::as_str).map(str::trim) {
        Some("preset") => QuestionKind::Preset,
        Some("custom") => QuestionKind::Custom,
        None if preset.is_some() => QuestionKind::Preset,
        None => QuestionKind::Custom,
        Some(other) => {
            tracing::warn!(kind = other, "dropping question with unknown kind");
            return None;
        }
    };

    let (preset, excluded_options) = match kind {
        QuestionKind::Custom => (None, BTreeSet::new()),
        QuestionKind::Preset => {
            let preset = preset?;
            if !presets.schema().contains(&preset.group, &preset.field) {
                tracing::warn!(
                    group = %preset.group,
                    field = %preset.field,
                    "dropping question bound to unknown preset field"
                );
                return None;
            }
            let known: BTreeSet<String> = presets.all_options(&preset.field).into_iter().collect();
            let excluded: BTreeSet<String> = entry
                .get("excluded_options")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_str().map(str::trim))
                        .filter(|v| known.contains(*v))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            (Some(preset), excluded)
        }
    };

    let id = text_field(entry, "id").map(|id| ids.claim(id));
    let order = entry.get("order").and_then(Value::as_i64).unwrap_or(0);
    Some(QuestionDefinition {
        id,
        kind,
        text,
        order,
        preset,
        excluded_options,
    })
}

fn sanitize_rating_template(
    entry: &Value,
    index: usize,
    max_scale: u8,
    ids: &mut UniqueIds,
) -> Option<RatingTemplate> {
    if !entry.is_object() {
        tracing::warn!(index, "dropping malformed rating template");
        return None;
    }
    let id = ids.claim(text_field(entry, "id").unwrap_or_else(|| format!("rating_{}", index + 1)));
    let name = text_field(entry, "name").unwrap_or_else(|| id.clone());
    let requested = entry
        .get("scale_size")
        .and_then(Value::as_i64)
        .unwrap_or(i64::from(DEFAULT_SCALE_SIZE));
    let scale_size = requested.clamp(1, i64::from(max_scale)) as u8;
    let prompt = text_field(entry, "prompt")
        .unwrap_or_else(|| format!("How would you rate our support from 1 to {scale_size}?"));

    let configured: BTreeMap<u8, String> = match entry.get("responses") {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| {
                let value = k.trim().parse::<u8>().ok()?;
                let text = v.as_str().map(str::trim).filter(|t| !t.is_empty())?;
                Some((value, text.to_string()))
            })
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let text = v.as_str().map(str::trim).filter(|t| !t.is_empty())?;
                Some((u8::try_from(i + 1).ok()?, text.to_string()))
            })
            .collect(),
        _ => BTreeMap::new(),
    };
    let responses = (1..=scale_size)
        .map(|value| {
            let text = configured
                .get(&value)
                .cloned()
                .unwrap_or_else(|| DEFAULT_RATING_RESPONSE.to_string());
            (value, text)
        })
        .collect();

    Some(RatingTemplate {
        id,
        name,
        prompt,
        scale_size,
        responses,
    })
}

/// Presets and templates in effect at one point in time.
#[derive(Debug, Clone, Default)]
pub struct IntakeSnapshot {
    pub presets: PresetResolver,
    pub settings: NormalizedSettings,
}

impl IntakeSnapshot {
    /// Question template for a channel: its own selection, else the global active one.
    pub fn question_template_for(&self, channel: &ChannelRecord) -> &QuestionTemplate {
        self.settings
            .question_template(channel.question_template_id.as_deref())
    }

    /// Rating template for a channel, if ratings are configured.
    pub fn rating_template_for(&self, channel: &ChannelRecord) -> Option<&RatingTemplate> {
        self.settings
            .rating_template(channel.rating_template_id.as_deref())
    }
}

/// Holds the current [`IntakeSnapshot`]; reloads swap it atomically.
///
/// Conversations keep the snapshot they started with.
pub struct TemplateStore {
    current: ArcSwap<IntakeSnapshot>,
    max_scale: u8,
}

impl TemplateStore {
    /// A store with an empty catalogue and the built-in template.
    pub fn new(max_scale: u8) -> Self {
        Self {
            current: ArcSwap::from_pointee(IntakeSnapshot::default()),
            max_scale,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<IntakeSnapshot> {
        self.current.load_full()
    }

    /// Sanitize and install new settings documents.
    pub fn replace(&self, catalogue: &Value, schema: &Value, questionnaire: &Value) {
        let presets = PresetResolver::new(
            Catalogue::from_value(catalogue),
            PresetSchema::from_value(schema),
        );
        let settings = sanitize(questionnaire, &presets, self.max_scale);
        tracing::info!(
            question_templates = settings.question_templates.len(),
            rating_templates = settings.rating_templates.len(),
            active = %settings.active_question_template,
            "intake settings loaded"
        );
        self.current
            .store(Arc::new(IntakeSnapshot { presets, settings }));
    }

    /// Reload all settings documents from storage.
    pub async fn reload(&self, db: &Database) -> Result<(), TicketbotError> {
        let catalogue = get_setting(db, SETTINGS_PRESET_CATALOGUE).await?;
        let schema = get_setting(db, SETTINGS_PRESET_SCHEMA).await?;
        let questionnaire = get_setting(db, SETTINGS_QUESTIONNAIRE).await?;
        self.replace(
            &catalogue.unwrap_or(Value::Null),
            &schema.unwrap_or(Value::Null),
            &questionnaire.unwrap_or(Value::Null),
        );
        Ok(())
    }
}
