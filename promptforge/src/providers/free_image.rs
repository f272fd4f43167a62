//! The free public image endpoint.
//!
//! Unlike the paid provider there is no job to track: the image URL is fully
//! determined by the prompt and parameters, so the generation completes
//! synchronously at creation time.

use crate::api::models::generations::FreeImageModel;
use crate::config::FreeImageConfig;
use crate::providers::{ProviderError, Result};
use url::Url;

/// Model ids accepted by the free endpoint.
pub const MODELS: &[(&str, &str, &str, &str)] = &[
    (
        "flux",
        "Flux",
        "Ultra-high quality realistic images with incredible detail",
        "Photorealistic, hyper-detailed, professional",
    ),
    (
        "stability-ai",
        "Stability AI",
        "Artistic and creative images with unique stylized results",
        "Artistic, creative, stylized",
    ),
    (
        "turbo",
        "Turbo",
        "Lightning-fast generation with good quality output",
        "Fast, efficient, quality-optimized",
    ),
];

pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MIN_DIMENSION: u32 = 64;
pub const MAX_DIMENSION: u32 = 2048;

/// Fully resolved parameters for one free-image generation.
#[derive(Debug, Clone)]
pub struct FreeImageParams {
    pub prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
}

impl FreeImageParams {
    /// Apply configured defaults and a random seed to a partially specified
    /// request.
    pub fn resolve(
        prompt: String,
        model: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        seed: Option<u64>,
        config: &FreeImageConfig,
    ) -> Self {
        use rand::Rng;

        Self {
            prompt,
            model: model.unwrap_or_else(|| config.default_model.clone()),
            width: width.unwrap_or(config.default_width),
            height: height.unwrap_or(config.default_height),
            seed: seed.unwrap_or_else(|| rand::thread_rng().gen()),
        }
    }

    /// External job identifier stored for free generations, prefixed to
    /// distinguish them from paid task ids.
    pub fn external_job_id(&self) -> String {
        format!("free_{}_{}", self.model, self.seed)
    }
}

/// Validate parameters, returning every violation rather than just the first.
pub fn validate(params: &FreeImageParams) -> Vec<String> {
    let mut errors = Vec::new();

    if params.prompt.trim().is_empty() {
        errors.push("Prompt is required".to_string());
    }

    if params.prompt.chars().count() > MAX_PROMPT_CHARS {
        errors.push(format!("Prompt must be less than {MAX_PROMPT_CHARS} characters"));
    }

    for (name, value) in [("Width", params.width), ("Height", params.height)] {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
            errors.push(format!("{name} must be between {MIN_DIMENSION} and {MAX_DIMENSION} pixels"));
        }
    }

    if !MODELS.iter().any(|(id, ..)| *id == params.model) {
        errors.push(format!("Unknown model: {}", params.model));
    }

    errors
}

/// Build the final image URL: prompt percent-encoded into the path, the
/// remaining parameters as query parameters.
pub fn build_image_url(config: &FreeImageConfig, params: &FreeImageParams) -> Result<Url> {
    let mut url = config.base_url.clone();

    url.path_segments_mut()
        .map_err(|()| ProviderError::Config("free image base URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push("prompt")
        .push(&params.prompt);

    url.query_pairs_mut()
        .append_pair("width", &params.width.to_string())
        .append_pair("height", &params.height.to_string())
        .append_pair("seed", &params.seed.to_string())
        .append_pair("model", &params.model);

    Ok(url)
}

/// Catalog served by the models endpoint.
pub fn model_catalog() -> Vec<FreeImageModel> {
    MODELS
        .iter()
        .map(|(id, name, description, style)| FreeImageModel {
            id: (*id).to_string(),
            name: (*name).to_string(),
            description: (*description).to_string(),
            style: (*style).to_string(),
        })
        .collect()
}
