//! Live Gemini API tests. Require GOOGLE_AI_API_KEY and the `api` feature.

use vermeer_providers::{GeminiClient, ImageProvider, ProviderSettings};

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
async fn test_gemini_text_to_image() {
    dotenvy::dotenv().ok();
    let client =
        GeminiClient::new(None, &ProviderSettings::default()).expect("GOOGLE_AI_API_KEY set");

    let image = client
        .generate_from_text("A watercolor painting of a red bicycle leaning against a wall.")
        .await
        .expect("API call succeeded");

    assert!(!image.is_empty());
    assert!(image.content_type().starts_with("image/"));
}
