//! Seam between the orchestrator and the prompt ledger.

use vermeer_core::Thumbnail;
use vermeer_database::{LedgerResult, PromptLedger, PromptRow, PromptStats};

/// Ledger operations the orchestrator depends on.
///
/// [`PromptLedger`] is the production implementation; tests substitute
/// in-memory stores.
pub trait PromptStore: Send + Sync {
    /// True when a record with the same normalized hash exists.
    fn exists_by_text(&self, text: &str) -> LedgerResult<bool>;

    /// Fetch a record by its normalized hash.
    fn get_by_hash(&self, hash: &str) -> LedgerResult<Option<PromptRow>>;

    /// Insert a new record; fails on a duplicate hash.
    fn create_prompt(
        &self,
        text: &str,
        model: Option<&str>,
        thumbnail: Option<&Thumbnail>,
        initial_uses: i32,
    ) -> LedgerResult<PromptRow>;

    /// Increment usage for an existing record; fails when absent.
    fn update_prompt(&self, text: &str, model: Option<&str>) -> LedgerResult<PromptRow>;

    /// Best-effort create-or-update; never propagates storage errors.
    fn attempt_save_prompt(
        &self,
        text: &str,
        model: Option<&str>,
        image_bytes: Option<&[u8]>,
    ) -> Option<PromptRow>;

    /// Increment the usage counter by id; false when no row matches.
    fn increment_usage_by_id(&self, id: i32) -> LedgerResult<bool>;

    /// Increment the failure counter by id; false when no row matches.
    fn track_failure_by_id(&self, id: i32) -> LedgerResult<bool>;

    /// Increment the failure counter by text; false when no record exists.
    fn track_failure(&self, text: &str) -> LedgerResult<bool>;

    /// Aggregate statistics; storage errors propagate.
    fn get_stats(&self) -> LedgerResult<PromptStats>;

    /// Cleanup sweep over thumbnail-less records; storage errors propagate.
    fn cleanup_old(&self, days: i64) -> LedgerResult<usize>;
}

impl PromptStore for PromptLedger {
    fn exists_by_text(&self, text: &str) -> LedgerResult<bool> {
        PromptLedger::exists_by_text(self, text)
    }

    fn get_by_hash(&self, hash: &str) -> LedgerResult<Option<PromptRow>> {
        PromptLedger::get_by_hash(self, hash)
    }

    fn create_prompt(
        &self,
        text: &str,
        model: Option<&str>,
        thumbnail: Option<&Thumbnail>,
        initial_uses: i32,
    ) -> LedgerResult<PromptRow> {
        PromptLedger::create_prompt(self, text, model, thumbnail, initial_uses)
    }

    fn update_prompt(&self, text: &str, model: Option<&str>) -> LedgerResult<PromptRow> {
        PromptLedger::update_prompt(self, text, model)
    }

    fn attempt_save_prompt(
        &self,
        text: &str,
        model: Option<&str>,
        image_bytes: Option<&[u8]>,
    ) -> Option<PromptRow> {
        PromptLedger::attempt_save_prompt(self, text, model, image_bytes)
    }

    fn increment_usage_by_id(&self, id: i32) -> LedgerResult<bool> {
        PromptLedger::increment_usage_by_id(self, id)
    }

    fn track_failure_by_id(&self, id: i32) -> LedgerResult<bool> {
        PromptLedger::track_failure_by_id(self, id)
    }

    fn track_failure(&self, text: &str) -> LedgerResult<bool> {
        PromptLedger::track_failure(self, text)
    }

    fn get_stats(&self) -> LedgerResult<PromptStats> {
        PromptLedger::get_stats(self)
    }

    fn cleanup_old(&self, days: i64) -> LedgerResult<usize> {
        PromptLedger::cleanup_old(self, days)
    }
}
