//! The prompt ledger: deduplication and usage/failure accounting.

use crate::LedgerResult;
use crate::connection::PgPool;
use crate::models::{NewPromptRow, PromptRow};
use crate::schema::prompts;
use chrono::{Duration, Utc};
use diesel::dsl::{exists, select, sum};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use vermeer_core::{Thumbnail, hash_prompt, render_thumbnail};
use vermeer_error::{LedgerError, LedgerErrorKind};

/// Aggregate statistics over the prompts table.
#[derive(Debug, Clone, Serialize, derive_getters::Getters)]
pub struct PromptStats {
    total_prompts: i64,
    total_uses: i64,
    total_fails: i64,
    prompts_with_thumbnails: i64,
    most_popular_prompt: Option<String>,
    most_popular_uses: i32,
    most_failed_prompt: Option<String>,
    most_failed_count: i32,
}

/// Single source of truth for prompt deduplication and usage/failure
/// accounting.
///
/// Every mutating operation is one atomic statement against the backing
/// store; the unique index on `prompt_hash` is the dedup safety net under
/// concurrent creation.
#[derive(Clone)]
pub struct PromptLedger {
    pool: PgPool,
}

impl PromptLedger {
    /// Creates a ledger over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> LedgerResult<PooledConnection<ConnectionManager<PgConnection>>> {
        self.pool.get().map_err(LedgerError::from)
    }

    /// True when a record with the same normalized hash exists.
    pub fn exists_by_text(&self, text: &str) -> LedgerResult<bool> {
        let hash = hash_prompt(text);
        let mut conn = self.conn()?;
        select(exists(
            prompts::table.filter(prompts::prompt_hash.eq(&hash)),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(LedgerError::from)
    }

    /// Fetch a record by its surrogate key.
    pub fn get_by_id(&self, id: i32) -> LedgerResult<Option<PromptRow>> {
        let mut conn = self.conn()?;
        prompts::table
            .find(id)
            .select(PromptRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(LedgerError::from)
    }

    /// Fetch a record by its normalized hash.
    pub fn get_by_hash(&self, hash: &str) -> LedgerResult<Option<PromptRow>> {
        let mut conn = self.conn()?;
        prompts::table
            .filter(prompts::prompt_hash.eq(hash))
            .select(PromptRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(LedgerError::from)
    }

    /// Insert a new prompt record.
    ///
    /// # Errors
    ///
    /// Fails with [`LedgerErrorKind::DuplicateHash`] when a record with the
    /// same normalized hash already exists. Callers are expected to check
    /// [`Self::exists_by_text`] first; the unique index is the guard.
    #[instrument(skip(self, text, thumbnail), fields(prompt_len = text.len(), has_thumbnail = thumbnail.is_some()))]
    pub fn create_prompt(
        &self,
        text: &str,
        model: Option<&str>,
        thumbnail: Option<&Thumbnail>,
        initial_uses: i32,
    ) -> LedgerResult<PromptRow> {
        let new_row = NewPromptRow::new(text, model, thumbnail, initial_uses);
        debug!(hash = %new_row.prompt_hash, "Inserting new prompt");
        let mut conn = self.conn()?;
        let row: PromptRow = diesel::insert_into(prompts::table)
            .values(&new_row)
            .returning(PromptRow::as_returning())
            .get_result(&mut conn)?;
        info!(id = row.id(), uses = row.total_uses(), "Created prompt");
        Ok(row)
    }

    /// Increment usage for the record matching the hash of `text` and
    /// refresh its `last_used_at`. When `model` is given, the label is
    /// updated to the backend that served the generation.
    ///
    /// # Errors
    ///
    /// Fails with [`LedgerErrorKind::NotFound`] when no record exists;
    /// update never creates.
    #[instrument(skip(self, text), fields(prompt_len = text.len()))]
    pub fn update_prompt(&self, text: &str, model: Option<&str>) -> LedgerResult<PromptRow> {
        let hash = hash_prompt(text);
        let mut conn = self.conn()?;
        let target = prompts::table.filter(prompts::prompt_hash.eq(&hash));
        let row: PromptRow = match model {
            Some(model) => diesel::update(target)
                .set((
                    prompts::total_uses.eq(prompts::total_uses + 1),
                    prompts::last_used_at.eq(Utc::now()),
                    prompts::model.eq(model.to_string()),
                ))
                .returning(PromptRow::as_returning())
                .get_result(&mut conn)?,
            None => diesel::update(target)
                .set((
                    prompts::total_uses.eq(prompts::total_uses + 1),
                    prompts::last_used_at.eq(Utc::now()),
                ))
                .returning(PromptRow::as_returning())
                .get_result(&mut conn)?,
        };
        info!(id = row.id(), uses = row.total_uses(), "Updated prompt");
        Ok(row)
    }

    /// Best-effort save: update the existing record or create a new one
    /// with usage 1, rendering a thumbnail from `image_bytes` when given.
    ///
    /// Never propagates storage errors; returns `None` instead so the
    /// caller's primary response is not blocked. A concurrent-create race
    /// on the same new hash falls back to update, so exactly one record
    /// exists afterwards.
    #[instrument(skip(self, text, image_bytes), fields(prompt_len = text.len(), has_image = image_bytes.is_some()))]
    pub fn attempt_save_prompt(
        &self,
        text: &str,
        model: Option<&str>,
        image_bytes: Option<&[u8]>,
    ) -> Option<PromptRow> {
        let thumbnail = image_bytes.and_then(|bytes| match render_thumbnail(bytes) {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                warn!(error = %e, "Failed to render thumbnail, saving without preview");
                None
            }
        });
        match self.save_inner(text, model, thumbnail.as_ref()) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(error = %e, "Best-effort prompt save failed");
                None
            }
        }
    }

    fn save_inner(
        &self,
        text: &str,
        model: Option<&str>,
        thumbnail: Option<&Thumbnail>,
    ) -> LedgerResult<PromptRow> {
        if self.exists_by_text(text)? {
            return self.update_prompt(text, model);
        }
        match self.create_prompt(text, model, thumbnail, 1) {
            Ok(row) => Ok(row),
            // Lost a concurrent-create race: the row exists now.
            Err(e) if matches!(e.kind, LedgerErrorKind::DuplicateHash(_)) => {
                debug!("Concurrent insert beat us to the hash, updating instead");
                self.update_prompt(text, model)
            }
            Err(e) => Err(e),
        }
    }

    /// Increment the usage counter for a known prompt id.
    ///
    /// Returns false when no row matches; never errors for "not found".
    pub fn increment_usage_by_id(&self, id: i32) -> LedgerResult<bool> {
        let mut conn = self.conn()?;
        let affected = diesel::update(prompts::table.find(id))
            .set((
                prompts::total_uses.eq(prompts::total_uses + 1),
                prompts::last_used_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(affected > 0)
    }

    /// Increment the failure counter for a known prompt id.
    ///
    /// Returns false when no row matches; never errors for "not found".
    pub fn track_failure_by_id(&self, id: i32) -> LedgerResult<bool> {
        let mut conn = self.conn()?;
        let affected = diesel::update(prompts::table.find(id))
            .set((
                prompts::total_fails.eq(prompts::total_fails + 1),
                prompts::last_used_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(affected > 0)
    }

    /// Increment the failure counter for the record matching the hash of
    /// `text`.
    ///
    /// Returns false when no record exists; unseen failing prompts are not
    /// persisted.
    pub fn track_failure(&self, text: &str) -> LedgerResult<bool> {
        let hash = hash_prompt(text);
        let mut conn = self.conn()?;
        let affected = diesel::update(prompts::table.filter(prompts::prompt_hash.eq(&hash)))
            .set((
                prompts::total_fails.eq(prompts::total_fails + 1),
                prompts::last_used_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(affected > 0)
    }

    /// Recently used prompts with thumbnails, newest first.
    pub fn get_recent(&self, limit: i64, model: Option<&str>) -> LedgerResult<Vec<PromptRow>> {
        let mut conn = self.conn()?;
        let mut query = prompts::table
            .filter(prompts::thumbnail_data.is_not_null())
            .select(PromptRow::as_select())
            .order(prompts::last_used_at.desc())
            .limit(limit)
            .into_boxed();
        if let Some(model) = model {
            query = query.filter(prompts::model.eq(model.to_string()));
        }
        query.load(&mut conn).map_err(LedgerError::from)
    }

    /// Most used prompts with thumbnails.
    pub fn get_popular(&self, limit: i64, model: Option<&str>) -> LedgerResult<Vec<PromptRow>> {
        let mut conn = self.conn()?;
        let mut query = prompts::table
            .filter(prompts::thumbnail_data.is_not_null())
            .select(PromptRow::as_select())
            .order((prompts::total_uses.desc(), prompts::last_used_at.desc()))
            .limit(limit)
            .into_boxed();
        if let Some(model) = model {
            query = query.filter(prompts::model.eq(model.to_string()));
        }
        query.load(&mut conn).map_err(LedgerError::from)
    }

    /// Most failed prompts with thumbnails.
    pub fn get_most_failed(
        &self,
        limit: i64,
        model: Option<&str>,
    ) -> LedgerResult<Vec<PromptRow>> {
        let mut conn = self.conn()?;
        let mut query = prompts::table
            .filter(prompts::thumbnail_data.is_not_null())
            .select(PromptRow::as_select())
            .order((prompts::total_fails.desc(), prompts::last_used_at.desc()))
            .limit(limit)
            .into_boxed();
        if let Some(model) = model {
            query = query.filter(prompts::model.eq(model.to_string()));
        }
        query.load(&mut conn).map_err(LedgerError::from)
    }

    /// Case-insensitive substring search over prompt text, restricted to
    /// records with thumbnails.
    pub fn search(&self, query_text: &str, limit: i64) -> LedgerResult<Vec<PromptRow>> {
        let pattern = format!("%{}%", query_text);
        let mut conn = self.conn()?;
        prompts::table
            .filter(prompts::thumbnail_data.is_not_null())
            .filter(prompts::prompt_text.ilike(pattern))
            .select(PromptRow::as_select())
            .order((prompts::total_uses.desc(), prompts::last_used_at.desc()))
            .limit(limit)
            .load(&mut conn)
            .map_err(LedgerError::from)
    }

    /// Thumbnail bytes for a prompt id, when present.
    pub fn get_thumbnail(&self, id: i32) -> LedgerResult<Option<Vec<u8>>> {
        let mut conn = self.conn()?;
        let data: Option<Option<Vec<u8>>> = prompts::table
            .find(id)
            .select(prompts::thumbnail_data)
            .first(&mut conn)
            .optional()?;
        Ok(data.flatten())
    }

    /// Aggregate statistics over the whole table.
    ///
    /// Administrative path: storage errors propagate to the caller.
    #[instrument(skip(self))]
    pub fn get_stats(&self) -> LedgerResult<PromptStats> {
        let mut conn = self.conn()?;

        let total_prompts: i64 = prompts::table.count().get_result(&mut conn)?;
        let total_uses: Option<i64> = prompts::table
            .select(sum(prompts::total_uses))
            .get_result(&mut conn)?;
        let total_fails: Option<i64> = prompts::table
            .select(sum(prompts::total_fails))
            .get_result(&mut conn)?;
        let prompts_with_thumbnails: i64 = prompts::table
            .filter(prompts::thumbnail_data.is_not_null())
            .count()
            .get_result(&mut conn)?;
        let most_popular: Option<(String, i32)> = prompts::table
            .select((prompts::prompt_text, prompts::total_uses))
            .order(prompts::total_uses.desc())
            .first(&mut conn)
            .optional()?;
        let most_failed: Option<(String, i32)> = prompts::table
            .select((prompts::prompt_text, prompts::total_fails))
            .order(prompts::total_fails.desc())
            .first(&mut conn)
            .optional()?;

        Ok(PromptStats {
            total_prompts,
            total_uses: total_uses.unwrap_or(0),
            total_fails: total_fails.unwrap_or(0),
            prompts_with_thumbnails,
            most_popular_prompt: most_popular.as_ref().map(|(text, _)| text.clone()),
            most_popular_uses: most_popular.map(|(_, uses)| uses).unwrap_or(0),
            most_failed_prompt: most_failed.as_ref().map(|(text, _)| text.clone()),
            most_failed_count: most_failed.map(|(_, fails)| fails).unwrap_or(0),
        })
    }

    /// Delete a record by id. Returns false when no row matched.
    #[instrument(skip(self))]
    pub fn delete(&self, id: i32) -> LedgerResult<bool> {
        let mut conn = self.conn()?;
        let affected = diesel::delete(prompts::table.find(id)).execute(&mut conn)?;
        Ok(affected > 0)
    }

    /// Delete thumbnail-less records whose `last_used_at` is strictly older
    /// than `days`. Records with thumbnails are never auto-deleted.
    ///
    /// Administrative path: storage errors propagate to the caller.
    #[instrument(skip(self))]
    pub fn cleanup_old(&self, days: i64) -> LedgerResult<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            prompts::table
                .filter(prompts::thumbnail_data.is_null())
                .filter(prompts::last_used_at.lt(cutoff)),
        )
        .execute(&mut conn)?;
        info!(deleted, days, "Cleaned up old prompts without thumbnails");
        Ok(deleted)
    }
}
