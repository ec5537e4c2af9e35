//! Pure pricing and capability validation for generation requests
//!
//! Runs before any balance reservation: a request that fails validation here
//! must never reach the ledger.

use crate::error::{AppError, Result};
use crate::models::{ModelConfig, NewGeneration};

/// Resolve the token cost of a request against a model's pricing
///
/// Per-second priced models multiply by the requested duration; everything
/// else uses the fixed price.
pub fn resolve_cost(model: &ModelConfig, duration: Option<u32>) -> i64 {
    match (model.price_per_second, duration) {
        (Some(per_second), Some(duration)) => per_second * i64::from(duration),
        _ => model.price_tokens,
    }
}

/// Validate a request against the model's capability flags
pub fn validate_request(model: &ModelConfig, request: &NewGeneration) -> Result<()> {
    if !model.enabled {
        return Err(AppError::Validation(format!(
            "Model '{}' is currently unavailable",
            model.code
        )));
    }

    if model.requires_image && request.image_url.is_none() {
        return Err(AppError::Validation(format!(
            "Model '{}' requires an input image",
            model.code
        )));
    }

    if model.requires_video && request.video_url.is_none() {
        return Err(AppError::Validation(format!(
            "Model '{}' requires a reference video",
            model.code
        )));
    }

    if !model.aspect_ratios.is_empty() && !model.aspect_ratios.contains(&request.aspect_ratio) {
        return Err(AppError::Validation(format!(
            "Aspect ratio '{}' is not supported by model '{}'",
            request.aspect_ratio, model.code
        )));
    }

    if let Some(duration) = request.duration {
        if !model.durations.is_empty() && !model.durations.contains(&duration) {
            return Err(AppError::Validation(format!(
                "Duration {}s is not supported by model '{}'",
                duration, model.code
            )));
        }
    }

    Ok(())
}
