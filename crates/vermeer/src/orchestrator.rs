//! The generation orchestrator: the only component coupling the provider
//! abstraction and the prompt ledger.

use crate::settings::Settings;
use crate::store::PromptStore;
use derive_getters::Getters;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vermeer_core::{
    GeneratedImage, ImageSource, ImageUpload, MAX_PROMPT_CHARS, hash_prompt, render_thumbnail,
};
use vermeer_database::{LedgerResult, PromptRow, PromptStats};
use vermeer_error::{
    InvalidInputError, LedgerError, LedgerErrorKind, ProviderError, VermeerResult,
};
use vermeer_providers::{
    ImageProvider, ProviderFactory, PromptGeneratorFactory, mime_for_filename,
};

/// One generation request, as handed over by the multipart layer.
#[derive(Debug, Clone, Getters, derive_builder::Builder)]
#[builder(setter(into), pattern = "owned")]
pub struct GenerationRequest {
    /// Prompt text
    prompt: String,
    /// Reference images, in order
    #[builder(default)]
    images: Vec<ImageUpload>,
    /// Provider name; the configured default applies when absent
    #[builder(default, setter(strip_option, into))]
    provider: Option<String>,
    /// Known ledger id of the prompt, when the caller has one
    #[builder(default, setter(strip_option))]
    prompt_id: Option<i32>,
}

impl GenerationRequest {
    /// Creates a builder for `GenerationRequest`.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }
}

/// Successful generation result.
#[derive(Debug, Clone, Getters)]
pub struct GenerationOutcome {
    /// The generated image payload
    image: GeneratedImage,
    /// Data URL of the first reference image, when one was supplied
    reference_data_url: Option<String>,
}

/// Service layer gluing provider resolution, generation dispatch, and
/// ledger accounting.
///
/// One ledger instance per process, injected at construction.
pub struct GenerationOrchestrator {
    settings: Settings,
    ledger: Arc<dyn PromptStore>,
}

impl GenerationOrchestrator {
    /// Creates an orchestrator over the given settings and ledger.
    pub fn new(settings: Settings, ledger: Arc<dyn PromptStore>) -> Self {
        Self { settings, ledger }
    }

    /// Generate an image, resolving the provider by name.
    ///
    /// Validation failures and unknown provider names surface before any
    /// vendor call. On success the prompt's usage is recorded; on failure
    /// its failure count is recorded and the original error re-raised.
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len(), images = request.images.len()))]
    pub async fn generate(&self, request: GenerationRequest) -> VermeerResult<GenerationOutcome> {
        self.validate(&request)?;
        let provider_name = request
            .provider
            .clone()
            .unwrap_or_else(|| self.settings.default_provider().clone());
        let provider = ProviderFactory::create(&provider_name, None, self.settings.providers())?;
        self.generate_with(provider.as_ref(), request).await
    }

    /// Generate with an already-resolved provider instance.
    pub async fn generate_with(
        &self,
        provider: &dyn ImageProvider,
        mut request: GenerationRequest,
    ) -> VermeerResult<GenerationOutcome> {
        self.validate(&request)?;
        info!(
            provider = provider.name(),
            model = provider.model(),
            images = request.images.len(),
            "Starting generation"
        );
        match self.dispatch(provider, &mut request).await {
            Ok(outcome) => {
                self.record_success(&request, provider.model(), outcome.image.bytes())
                    .await;
                Ok(outcome)
            }
            Err(err) => {
                self.record_failure(&request).await;
                Err(err.into())
            }
        }
    }

    /// Explicitly save a prompt, rendering its thumbnail from a text-only
    /// generation on the default provider. The generation is best-effort:
    /// the prompt is saved without a preview when it fails.
    #[instrument(skip(self, text), fields(prompt_len = text.len()))]
    pub async fn save_prompt(&self, text: &str) -> VermeerResult<PromptRow> {
        validate_prompt_text(text)?;
        let provider =
            ProviderFactory::create(self.settings.default_provider(), None, self.settings.providers())?;
        let preview = match provider.generate_from_text(text).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "Failed to generate thumbnail, saving without preview");
                None
            }
        };

        let ledger = Arc::clone(&self.ledger);
        let text = text.to_string();
        let model = provider.model().to_string();
        let saved = tokio::task::spawn_blocking(move || {
            ledger.attempt_save_prompt(&text, Some(&model), preview.as_ref().map(|p| p.bytes().as_slice()))
        })
        .await
        .map_err(join_error)?;

        saved.ok_or_else(|| {
            LedgerError::new(LedgerErrorKind::Query("Failed to save prompt".to_string())).into()
        })
    }

    /// Derive a reusable prompt from an image and record it with usage 0
    /// and a thumbnail rendered from the upload.
    #[instrument(skip(self, image), fields(filename = %image.filename()))]
    pub async fn inspire(
        &self,
        mut image: ImageUpload,
        style: &str,
        detail_level: &str,
    ) -> VermeerResult<PromptRow> {
        self.validate_image(&image, 1)?;
        let generator =
            PromptGeneratorFactory::create("gemini", None, self.settings.providers())?;
        let prompt = generator
            .generate_prompt_from_image(&mut image, style, detail_level)
            .await?;
        debug!(prompt_len = prompt.len(), "Derived prompt from image");

        let image_bytes = image
            .read_bytes()
            .map_err(|e| InvalidInputError::new(format!("Failed to read image: {}", e)))?;
        let ledger = Arc::clone(&self.ledger);
        let model = self.settings.providers().gemini_model().clone();
        let row = tokio::task::spawn_blocking(move || -> LedgerResult<PromptRow> {
            let thumbnail = match render_thumbnail(&image_bytes) {
                Ok(thumb) => Some(thumb),
                Err(e) => {
                    warn!(error = %e, "Failed to render thumbnail, saving without preview");
                    None
                }
            };
            match ledger.create_prompt(&prompt, Some(&model), thumbnail.as_ref(), 0) {
                Ok(row) => Ok(row),
                // The derived prompt already exists; reuse the record.
                Err(e) if matches!(e.kind, LedgerErrorKind::DuplicateHash(_)) => ledger
                    .get_by_hash(&hash_prompt(&prompt))?
                    .ok_or_else(|| LedgerError::new(LedgerErrorKind::NotFound)),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(join_error)??;
        Ok(row)
    }

    /// Aggregate ledger statistics. Storage errors propagate.
    pub async fn stats(&self) -> VermeerResult<PromptStats> {
        let ledger = Arc::clone(&self.ledger);
        let stats = tokio::task::spawn_blocking(move || ledger.get_stats())
            .await
            .map_err(join_error)??;
        Ok(stats)
    }

    /// Delete thumbnail-less records older than the configured age.
    /// Storage errors propagate.
    pub async fn cleanup_old(&self, days: Option<i64>) -> VermeerResult<usize> {
        let days = days.unwrap_or(*self.settings.cleanup_days());
        let ledger = Arc::clone(&self.ledger);
        let deleted = tokio::task::spawn_blocking(move || ledger.cleanup_old(days))
            .await
            .map_err(join_error)??;
        Ok(deleted)
    }

    async fn dispatch(
        &self,
        provider: &dyn ImageProvider,
        request: &mut GenerationRequest,
    ) -> Result<GenerationOutcome, ProviderError> {
        match request.images.len() {
            0 => {
                let image = provider.generate_from_text(&request.prompt).await?;
                Ok(GenerationOutcome {
                    image,
                    reference_data_url: None,
                })
            }
            1 => {
                let source = &mut request.images[0];
                let reference_data_url = provider.process_reference_image(source)?;
                let image = provider
                    .generate_from_image_and_text(source, &request.prompt)
                    .await?;
                Ok(GenerationOutcome {
                    image,
                    reference_data_url: Some(reference_data_url),
                })
            }
            _ => {
                let mut images = std::mem::take(&mut request.images);
                let reference_data_url = provider.process_reference_image(&mut images[0])?;
                let mut sources: Vec<Box<dyn ImageSource>> = images
                    .into_iter()
                    .map(|upload| Box::new(upload) as Box<dyn ImageSource>)
                    .collect();
                let image = provider
                    .generate_from_multiple_images_and_text(&mut sources, &request.prompt)
                    .await?;
                Ok(GenerationOutcome {
                    image,
                    reference_data_url: Some(reference_data_url),
                })
            }
        }
    }

    /// Usage accounting after a successful generation. Ledger errors are
    /// logged and swallowed so they never disturb the response.
    async fn record_success(
        &self,
        request: &GenerationRequest,
        model: &str,
        image_bytes: &[u8],
    ) {
        let ledger = Arc::clone(&self.ledger);
        let prompt = request.prompt.clone();
        let prompt_id = request.prompt_id;
        let model = model.to_string();
        let auto_save = *self.settings.auto_save_generated();
        let preview = auto_save.then(|| image_bytes.to_vec());

        let tracked = tokio::task::spawn_blocking(move || {
            if let Some(id) = prompt_id {
                match ledger.increment_usage_by_id(id) {
                    Ok(true) => debug!(id, "Incremented usage"),
                    Ok(false) => warn!(id, "No prompt found for usage tracking"),
                    Err(e) => warn!(error = %e, "Failed to track prompt usage"),
                }
                return;
            }
            match ledger.exists_by_text(&prompt) {
                Ok(true) => {
                    if let Err(e) = ledger.update_prompt(&prompt, Some(&model)) {
                        warn!(error = %e, "Failed to track prompt usage");
                    }
                }
                Ok(false) => {
                    if auto_save
                        && let Some(row) =
                            ledger.attempt_save_prompt(&prompt, Some(&model), preview.as_deref())
                    {
                        debug!(id = row.id(), "Auto-saved new prompt");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to check prompt existence"),
            }
        })
        .await;
        if let Err(e) = tracked {
            warn!(error = %e, "Usage tracking task failed");
        }
    }

    /// Failure accounting. Ledger errors are logged and swallowed so they
    /// never mask the original generation error.
    async fn record_failure(&self, request: &GenerationRequest) {
        let ledger = Arc::clone(&self.ledger);
        let prompt = request.prompt.clone();
        let prompt_id = request.prompt_id;

        let tracked = tokio::task::spawn_blocking(move || {
            let result = match prompt_id {
                Some(id) => ledger.track_failure_by_id(id),
                None => ledger.track_failure(&prompt),
            };
            match result {
                Ok(tracked) => debug!(tracked, "Recorded generation failure"),
                Err(e) => warn!(error = %e, "Failed to track generation failure"),
            }
        })
        .await;
        if let Err(e) = tracked {
            warn!(error = %e, "Failure tracking task failed");
        }
    }

    fn validate(&self, request: &GenerationRequest) -> Result<(), InvalidInputError> {
        validate_prompt_text(&request.prompt)?;
        if request.images.len() > *self.settings.max_images_per_request() {
            return Err(InvalidInputError::new(format!(
                "Maximum {} images allowed",
                self.settings.max_images_per_request()
            )));
        }
        for (idx, image) in request.images.iter().enumerate() {
            self.validate_image(image, idx + 1)?;
        }
        Ok(())
    }

    fn validate_image(&self, image: &ImageUpload, position: usize) -> Result<(), InvalidInputError> {
        if image.is_empty() {
            return Err(InvalidInputError::new(format!(
                "Image {} is empty",
                position
            )));
        }
        if image.len() as u64 > *self.settings.max_upload_bytes() {
            return Err(InvalidInputError::new(format!(
                "Image {} too large. Maximum size is {}MB",
                position,
                self.settings.max_upload_bytes() / (1024 * 1024)
            )));
        }
        let mime = image
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_for_filename(image.filename()).to_string());
        if !self.settings.is_allowed_mime(&mime) {
            return Err(InvalidInputError::new(format!(
                "Image {} has invalid file type: {}. Allowed types: {}",
                position,
                mime,
                self.settings.allowed_image_types().join(", ")
            )));
        }
        Ok(())
    }
}

fn validate_prompt_text(text: &str) -> Result<(), InvalidInputError> {
    if text.trim().is_empty() {
        return Err(InvalidInputError::new("Prompt cannot be empty"));
    }
    if text.chars().count() > MAX_PROMPT_CHARS {
        return Err(InvalidInputError::new(format!(
            "Prompt too long (max {} characters)",
            MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

fn join_error(err: tokio::task::JoinError) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Query(format!("Task join error: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};
    use vermeer_core::Thumbnail;
    use vermeer_error::{ProviderErrorKind, VermeerErrorKind};
    use vermeer_providers::ProviderResult;

    #[derive(Debug, Clone)]
    struct StoredPrompt {
        id: i32,
        text: String,
        hash: String,
        uses: i32,
        fails: i32,
        has_thumbnail: bool,
    }

    #[derive(Default)]
    struct StubStore {
        records: Mutex<Vec<StoredPrompt>>,
        next_id: AtomicI32,
    }

    impl StubStore {
        fn seeded(text: &str, id: i32, uses: i32) -> Self {
            let store = Self::default();
            store.next_id.store(id + 1, Ordering::SeqCst);
            store.records.lock().unwrap().push(StoredPrompt {
                id,
                text: text.to_string(),
                hash: hash_prompt(text),
                uses,
                fails: 0,
                has_thumbnail: false,
            });
            store
        }

        fn record(&self, id: i32) -> Option<StoredPrompt> {
            self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
        }

        fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        fn to_row(record: &StoredPrompt) -> PromptRow {
            PromptRow::builder()
                .id(record.id)
                .prompt_text(record.text.clone())
                .prompt_hash(record.hash.clone())
                .total_uses(record.uses)
                .total_fails(record.fails)
                .first_used_at(Utc::now())
                .last_used_at(Utc::now())
                .build()
                .expect("valid row")
        }
    }

    impl PromptStore for StubStore {
        fn exists_by_text(&self, text: &str) -> LedgerResult<bool> {
            let hash = hash_prompt(text);
            Ok(self.records.lock().unwrap().iter().any(|r| r.hash == hash))
        }

        fn get_by_hash(&self, hash: &str) -> LedgerResult<Option<PromptRow>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.hash == hash)
                .map(Self::to_row))
        }

        fn create_prompt(
            &self,
            text: &str,
            _model: Option<&str>,
            thumbnail: Option<&Thumbnail>,
            initial_uses: i32,
        ) -> LedgerResult<PromptRow> {
            let hash = hash_prompt(text);
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|r| r.hash == hash) {
                return Err(LedgerError::new(LedgerErrorKind::DuplicateHash(hash)));
            }
            let record = StoredPrompt {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                text: text.to_string(),
                hash,
                uses: initial_uses,
                fails: 0,
                has_thumbnail: thumbnail.is_some(),
            };
            records.push(record.clone());
            Ok(Self::to_row(&record))
        }

        fn update_prompt(&self, text: &str, _model: Option<&str>) -> LedgerResult<PromptRow> {
            let hash = hash_prompt(text);
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.hash == hash)
                .ok_or_else(|| LedgerError::new(LedgerErrorKind::NotFound))?;
            record.uses += 1;
            Ok(Self::to_row(record))
        }

        fn attempt_save_prompt(
            &self,
            text: &str,
            model: Option<&str>,
            image_bytes: Option<&[u8]>,
        ) -> Option<PromptRow> {
            if self.exists_by_text(text).ok()? {
                return self.update_prompt(text, model).ok();
            }
            let hash = hash_prompt(text);
            let record = StoredPrompt {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                text: text.to_string(),
                hash,
                uses: 1,
                fails: 0,
                has_thumbnail: image_bytes.is_some(),
            };
            self.records.lock().unwrap().push(record.clone());
            Some(Self::to_row(&record))
        }

        fn increment_usage_by_id(&self, id: i32) -> LedgerResult<bool> {
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    record.uses += 1;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn track_failure_by_id(&self, id: i32) -> LedgerResult<bool> {
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    record.fails += 1;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn track_failure(&self, text: &str) -> LedgerResult<bool> {
            let hash = hash_prompt(text);
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.hash == hash) {
                Some(record) => {
                    record.fails += 1;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn get_stats(&self) -> LedgerResult<PromptStats> {
            Err(LedgerError::new(LedgerErrorKind::Query(
                "not supported in stub".to_string(),
            )))
        }

        fn cleanup_old(&self, _days: i64) -> LedgerResult<usize> {
            Ok(0)
        }
    }

    /// Stub store where every operation fails, for verifying that ledger
    /// errors never mask the generation result.
    struct BrokenStore;

    impl PromptStore for BrokenStore {
        fn exists_by_text(&self, _text: &str) -> LedgerResult<bool> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn get_by_hash(&self, _hash: &str) -> LedgerResult<Option<PromptRow>> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn create_prompt(
            &self,
            _text: &str,
            _model: Option<&str>,
            _thumbnail: Option<&Thumbnail>,
            _initial_uses: i32,
        ) -> LedgerResult<PromptRow> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn update_prompt(&self, _text: &str, _model: Option<&str>) -> LedgerResult<PromptRow> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn attempt_save_prompt(
            &self,
            _text: &str,
            _model: Option<&str>,
            _image_bytes: Option<&[u8]>,
        ) -> Option<PromptRow> {
            None
        }
        fn increment_usage_by_id(&self, _id: i32) -> LedgerResult<bool> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn track_failure_by_id(&self, _id: i32) -> LedgerResult<bool> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn track_failure(&self, _text: &str) -> LedgerResult<bool> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn get_stats(&self) -> LedgerResult<PromptStats> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
        fn cleanup_old(&self, _days: i64) -> LedgerResult<usize> {
            Err(LedgerError::new(LedgerErrorKind::Connection("down".to_string())))
        }
    }

    struct StubProvider {
        fail_with: Option<ProviderErrorKind>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl StubProvider {
        fn succeeding() -> Self {
            Self {
                fail_with: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(kind: ProviderErrorKind) -> Self {
            Self {
                fail_with: Some(kind),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn result(&self) -> ProviderResult<GeneratedImage> {
            match &self.fail_with {
                Some(kind) => Err(ProviderError::new(kind.clone())),
                None => Ok(GeneratedImage::new(vec![9, 9, 9], "image/png")),
            }
        }
    }

    #[async_trait]
    impl ImageProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn generate_from_text(&self, _prompt: &str) -> ProviderResult<GeneratedImage> {
            self.calls.lock().unwrap().push("text");
            self.result()
        }

        async fn generate_from_image_and_text(
            &self,
            image: &mut dyn ImageSource,
            _prompt: &str,
        ) -> ProviderResult<GeneratedImage> {
            self.calls.lock().unwrap().push("single");
            image.read_bytes().expect("readable image");
            self.result()
        }

        async fn generate_from_multiple_images_and_text(
            &self,
            images: &mut [Box<dyn ImageSource>],
            _prompt: &str,
        ) -> ProviderResult<GeneratedImage> {
            self.calls.lock().unwrap().push("multi");
            images[0].read_bytes().expect("readable image");
            self.result()
        }
    }

    fn settings(auto_save: bool) -> Settings {
        serde_json::from_value(serde_json::json!({ "auto_save_generated": auto_save }))
            .expect("valid settings")
    }

    fn orchestrator(store: Arc<dyn PromptStore>, auto_save: bool) -> GenerationOrchestrator {
        GenerationOrchestrator::new(settings(auto_save), store)
    }

    fn upload(name: &str) -> ImageUpload {
        ImageUpload::new(name, Some("image/png".to_string()), vec![1, 2, 3])
    }

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::builder()
            .prompt(prompt)
            .build()
            .expect("valid request")
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_vendor_call() {
        let store = Arc::new(StubStore::default());
        let orchestrator = orchestrator(store.clone(), false);
        let provider = StubProvider::succeeding();

        let empty = request("   ");
        let err = orchestrator
            .generate_with(&provider, empty)
            .await
            .expect_err("empty prompt");
        assert!(matches!(err.kind(), VermeerErrorKind::Input(_)));
        assert_eq!(err.http_status(), 400);

        let long = request(&"x".repeat(MAX_PROMPT_CHARS + 1));
        assert!(orchestrator.generate_with(&provider, long).await.is_err());

        let bad_mime = GenerationRequest::builder()
            .prompt("a cat")
            .images(vec![ImageUpload::new(
                "scan.tiff",
                Some("image/tiff".to_string()),
                vec![1],
            )])
            .build()
            .unwrap();
        assert!(orchestrator.generate_with(&provider, bad_mime).await.is_err());

        let too_many = GenerationRequest::builder()
            .prompt("a cat")
            .images((0..11).map(|i| upload(&format!("{i}.png"))).collect::<Vec<_>>())
            .build()
            .unwrap();
        assert!(orchestrator.generate_with(&provider, too_many).await.is_err());

        assert!(provider.calls().is_empty());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn dispatch_follows_input_shape() {
        let store = Arc::new(StubStore::default());
        let orchestrator = orchestrator(store, false);
        let provider = StubProvider::succeeding();

        let text_only = orchestrator
            .generate_with(&provider, request("a cat"))
            .await
            .expect("text-only");
        assert!(text_only.reference_data_url().is_none());

        let single = GenerationRequest::builder()
            .prompt("a cat")
            .images(vec![upload("ref.png")])
            .build()
            .unwrap();
        let single_outcome = orchestrator
            .generate_with(&provider, single)
            .await
            .expect("single image");
        assert!(
            single_outcome
                .reference_data_url()
                .as_deref()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );

        let multi = GenerationRequest::builder()
            .prompt("a cat")
            .images(vec![upload("a.png"), upload("b.png")])
            .build()
            .unwrap();
        orchestrator
            .generate_with(&provider, multi)
            .await
            .expect("multi image");

        assert_eq!(provider.calls(), vec!["text", "single", "multi"]);
    }

    #[tokio::test]
    async fn success_with_known_id_increments_usage() {
        let store = Arc::new(StubStore::seeded("a red bicycle", 7, 5));
        let orchestrator = orchestrator(store.clone(), false);
        let provider = StubProvider::succeeding();

        let req = GenerationRequest::builder()
            .prompt("something else entirely")
            .prompt_id(7)
            .build()
            .unwrap();
        orchestrator.generate_with(&provider, req).await.expect("generation");

        let record = store.record(7).expect("seeded record");
        assert_eq!(record.uses, 6);
        assert_eq!(record.fails, 0);
    }

    #[tokio::test]
    async fn success_with_known_text_updates_the_existing_record() {
        let store = Arc::new(StubStore::seeded("a red bicycle", 1, 2));
        let orchestrator = orchestrator(store.clone(), false);
        let provider = StubProvider::succeeding();

        // Case and whitespace variants hit the same record.
        orchestrator
            .generate_with(&provider, request("A Red  Bicycle"))
            .await
            .expect("generation");

        let record = store.record(1).expect("seeded record");
        assert_eq!(record.uses, 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unseen_prompts_are_not_persisted_by_default() {
        let store = Arc::new(StubStore::default());
        let orchestrator = orchestrator(store.clone(), false);
        let provider = StubProvider::succeeding();

        orchestrator
            .generate_with(&provider, request("a brand new idea"))
            .await
            .expect("generation");

        assert_eq!(store.len(), 0);
        assert!(!store.exists_by_text("a brand new idea").unwrap());
    }

    #[tokio::test]
    async fn auto_save_persists_unseen_prompts_with_a_preview() {
        let store = Arc::new(StubStore::default());
        let orchestrator = orchestrator(store.clone(), true);
        let provider = StubProvider::succeeding();

        orchestrator
            .generate_with(&provider, request("a brand new idea"))
            .await
            .expect("generation");

        assert_eq!(store.len(), 1);
        let record = store.record(0).expect("auto-saved record");
        assert_eq!(record.uses, 1);
        assert!(record.has_thumbnail);
    }

    #[tokio::test]
    async fn failure_with_known_id_tracks_and_reraises() {
        let store = Arc::new(StubStore::seeded("a red bicycle", 3, 1));
        let orchestrator = orchestrator(store.clone(), false);
        let provider = StubProvider::failing(ProviderErrorKind::RateLimit("slow down".to_string()));

        let req = GenerationRequest::builder()
            .prompt("a red bicycle")
            .prompt_id(3)
            .build()
            .unwrap();
        let err = orchestrator
            .generate_with(&provider, req)
            .await
            .expect_err("provider failure");
        assert_eq!(err.http_status(), 429);

        let record = store.record(3).expect("seeded record");
        assert_eq!(record.fails, 2);
        assert_eq!(record.uses, 1);
    }

    #[tokio::test]
    async fn failure_on_unseen_prompt_creates_no_record() {
        let store = Arc::new(StubStore::default());
        let orchestrator = orchestrator(store.clone(), true);
        let provider = StubProvider::failing(ProviderErrorKind::ContentPolicy {
            message: "refused".to_string(),
            reason: Some("SAFETY".to_string()),
        });

        let err = orchestrator
            .generate_with(&provider, request("never seen before"))
            .await
            .expect_err("provider failure");

        // Original classification survives failure tracking.
        assert_eq!(err.http_status(), 400);
        assert!(err.user_message().contains("SAFETY"));
        assert_eq!(store.len(), 0);
        assert!(!store.exists_by_text("never seen before").unwrap());
    }

    #[tokio::test]
    async fn ledger_errors_never_mask_the_generation_result() {
        let orchestrator = orchestrator(Arc::new(BrokenStore), true);

        let provider = StubProvider::succeeding();
        let outcome = orchestrator
            .generate_with(&provider, request("a cat"))
            .await
            .expect("success despite broken ledger");
        assert!(!outcome.image().is_empty());

        let provider = StubProvider::failing(ProviderErrorKind::Upstream("down".to_string()));
        let err = orchestrator
            .generate_with(&provider, request("a cat"))
            .await
            .expect_err("provider failure");
        // The upstream error surfaces, not the ledger's connection error.
        assert!(matches!(err.kind(), VermeerErrorKind::Provider(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn unknown_provider_fails_without_tracking() {
        let store = Arc::new(StubStore::seeded("a red bicycle", 1, 0));
        let orchestrator = orchestrator(store.clone(), false);

        let req = GenerationRequest::builder()
            .prompt("a red bicycle")
            .provider("not-a-provider")
            .build()
            .unwrap();
        let err = orchestrator.generate(req).await.expect_err("unknown provider");
        assert!(matches!(
            err.kind(),
            VermeerErrorKind::UnsupportedProvider(_)
        ));

        let record = store.record(1).expect("seeded record");
        assert_eq!(record.fails, 0);
        assert_eq!(record.uses, 0);
    }
}
