//! Tests for provider factory resolution.

use vermeer_error::VermeerErrorKind;
use vermeer_providers::{ProviderFactory, ProviderSettings, PromptGeneratorFactory};

fn settings_with_keys() -> ProviderSettings {
    serde_json::from_value(serde_json::json!({
        "gemini_api_key": "test-key",
        "replicate_api_key": "test-key",
        "stability_api_key": "test-key",
        "huggingface_api_key": "test-key",
    }))
    .expect("valid settings")
}

#[test]
fn create_is_case_insensitive_and_trimmed() {
    let settings = settings_with_keys();
    for name in ["gemini", "GEMINI", " gemini "] {
        let provider = ProviderFactory::create(name, None, &settings)
            .unwrap_or_else(|e| panic!("{name:?} should resolve: {e}"));
        assert_eq!(provider.name(), "gemini");
    }
}

#[test]
fn every_registered_name_resolves() {
    let settings = settings_with_keys();
    for name in ProviderFactory::available_providers() {
        let provider = ProviderFactory::create(&name, None, &settings)
            .unwrap_or_else(|e| panic!("{name:?} should resolve: {e}"));
        assert_eq!(provider.name(), name);
    }
}

#[test]
fn unknown_provider_lists_the_registered_set() {
    let err = ProviderFactory::create("not-a-provider", None, &settings_with_keys())
        .expect_err("unknown name must fail");
    match err.kind() {
        VermeerErrorKind::UnsupportedProvider(e) => {
            assert_eq!(e.requested, "not-a-provider");
            assert_eq!(
                e.available,
                vec!["gemini", "replicate", "stability", "huggingface"]
            );
        }
        other => panic!("expected UnsupportedProvider, got {other:?}"),
    }
    assert_eq!(err.http_status(), 400);
}

#[test]
fn explicit_api_key_bypasses_settings() {
    let provider =
        ProviderFactory::create("replicate", Some("explicit".to_string()), &ProviderSettings::default())
            .expect("explicit key suffices");
    assert_eq!(provider.name(), "replicate");
}

#[test]
fn prompt_generator_factory_is_gemini_only() {
    let settings = settings_with_keys();
    assert!(PromptGeneratorFactory::create("Gemini", None, &settings).is_ok());

    let err = PromptGeneratorFactory::create("stability", None, &settings)
        .expect_err("stability has no prompt generator");
    match err.kind() {
        VermeerErrorKind::UnsupportedProvider(e) => {
            assert_eq!(e.available, vec!["gemini"]);
        }
        other => panic!("expected UnsupportedProvider, got {other:?}"),
    }
}
