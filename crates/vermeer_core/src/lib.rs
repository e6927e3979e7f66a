//! Core data types for the Vermeer image generation library.
//!
//! This crate provides the foundation types shared by the provider adapters
//! and the prompt ledger: prompt normalization and hashing, the uploaded
//! image capability, generated image payloads, and thumbnail rendering.

mod generated;
mod prompt;
mod thumbnail;
mod upload;

pub use generated::GeneratedImage;
pub use prompt::{MAX_PROMPT_CHARS, hash_prompt, normalize_prompt};
pub use thumbnail::{THUMBNAIL_JPEG_QUALITY, THUMBNAIL_MAX_EDGE, Thumbnail, render_thumbnail};
pub use upload::{ImageSource, ImageUpload};
