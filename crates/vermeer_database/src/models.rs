//! Diesel models for the prompts table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use vermeer_core::Thumbnail;

/// Database row for the prompts table.
///
/// Tracks one distinct prompt (keyed by its normalized hash) together with
/// its usage and failure counters and an optional thumbnail preview.
#[derive(
    Debug,
    Clone,
    Queryable,
    Identifiable,
    Selectable,
    Serialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[diesel(table_name = crate::schema::prompts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[builder(setter(into), pattern = "owned")]
pub struct PromptRow {
    id: i32,
    prompt_text: String,
    prompt_hash: String,
    #[builder(default)]
    total_uses: i32,
    #[builder(default)]
    total_fails: i32,
    first_used_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    #[builder(default)]
    model: Option<String>,
    #[serde(skip_serializing)]
    #[builder(default)]
    thumbnail_data: Option<Vec<u8>>,
    #[builder(default)]
    thumbnail_mime: Option<String>,
    #[builder(default)]
    thumbnail_width: Option<i32>,
    #[builder(default)]
    thumbnail_height: Option<i32>,
}

impl PromptRow {
    /// Creates a builder for `PromptRow`.
    pub fn builder() -> PromptRowBuilder {
        PromptRowBuilder::default()
    }
}

impl PromptRow {
    /// True when the record carries a thumbnail preview.
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_data.is_some()
    }
}

/// Insertable struct for creating a new prompt record.
///
/// Timestamps are assigned by the database on insert.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::prompts)]
pub struct NewPromptRow {
    pub prompt_text: String,
    pub prompt_hash: String,
    pub total_uses: i32,
    pub model: Option<String>,
    pub thumbnail_data: Option<Vec<u8>>,
    pub thumbnail_mime: Option<String>,
    pub thumbnail_width: Option<i32>,
    pub thumbnail_height: Option<i32>,
}

impl NewPromptRow {
    /// Builds an insertable row from prompt text, hashing included.
    ///
    /// Thumbnail fields are all-or-nothing: they are populated together
    /// from the rendered thumbnail or left entirely null.
    pub fn new(
        text: &str,
        model: Option<&str>,
        thumbnail: Option<&Thumbnail>,
        initial_uses: i32,
    ) -> Self {
        Self {
            prompt_text: text.to_string(),
            prompt_hash: vermeer_core::hash_prompt(text),
            total_uses: initial_uses,
            model: model.map(str::to_string),
            thumbnail_data: thumbnail.map(|t| t.data().clone()),
            thumbnail_mime: thumbnail.map(|t| t.mime().clone()),
            thumbnail_width: thumbnail.map(|t| *t.width() as i32),
            thumbnail_height: thumbnail.map(|t| *t.height() as i32),
        }
    }
}
