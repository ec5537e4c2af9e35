//! Default model catalog seeded into the store at startup
//!
//! Prices set by an administrator survive restarts in a durable store; the
//! seed only inserts codes that do not exist yet.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::models::{MediaType, ModelConfig};
use crate::storage::Store;

fn model(
    code: &str,
    name: &str,
    provider: &str,
    provider_model: &str,
    media_type: MediaType,
    price_tokens: i64,
) -> ModelConfig {
    ModelConfig {
        code: code.to_string(),
        name: name.to_string(),
        description: None,
        enabled: true,
        provider: provider.to_string(),
        provider_model: provider_model.to_string(),
        media_type,
        price_tokens,
        price_per_second: None,
        requires_image: false,
        requires_video: false,
        aspect_ratios: Vec::new(),
        durations: Vec::new(),
        sort_order: 0,
        icon: None,
    }
}

/// Built-in catalog of generation models
pub fn default_models() -> Vec<ModelConfig> {
    let mut models = vec![
        // Text-to-image
        ModelConfig {
            description: Some("Google Gemini Flash, fast image generation".to_string()),
            aspect_ratios: vec!["1:1", "16:9", "9:16", "4:3", "3:4"]
                .into_iter()
                .map(String::from)
                .collect(),
            icon: Some("🍌".to_string()),
            ..model("nano-banana", "Nano Banana", "poyo", "nano-banana", MediaType::Image, 4)
        },
        ModelConfig {
            description: Some("OpenAI GPT-4o Image, premium quality".to_string()),
            aspect_ratios: vec!["1:1", "16:9", "9:16"].into_iter().map(String::from).collect(),
            icon: Some("🎨".to_string()),
            ..model("gpt-4o-image", "GPT-4o Image", "poyo", "gpt-4o-image", MediaType::Image, 8)
        },
        ModelConfig {
            description: Some("ByteDance Seedream 4.5, 4K output".to_string()),
            aspect_ratios: vec!["1:1", "16:9", "9:16", "4:3", "3:4"]
                .into_iter()
                .map(String::from)
                .collect(),
            icon: Some("🌱".to_string()),
            ..model("seedream-4.5", "Seedream 4.5", "poyo", "seedream-4.5", MediaType::Image, 5)
        },
        // Image edit
        ModelConfig {
            description: Some("Google Gemini image editing".to_string()),
            requires_image: true,
            aspect_ratios: vec!["1:1", "16:9", "9:16"].into_iter().map(String::from).collect(),
            icon: Some("🍌".to_string()),
            ..model("nano-banana-edit", "Nano Banana Edit", "poyo", "nano-banana-edit", MediaType::Image, 4)
        },
        // Text-to-video
        ModelConfig {
            description: Some("Google Veo 3.1, fast video with audio".to_string()),
            price_per_second: Some(8),
            aspect_ratios: vec!["16:9", "9:16"].into_iter().map(String::from).collect(),
            durations: vec![8],
            icon: Some("🎬".to_string()),
            ..model("veo3-fast", "Veo 3.1 Fast", "kie", "veo3_fast", MediaType::Video, 8)
        },
        ModelConfig {
            description: Some("OpenAI Sora 2 video generation".to_string()),
            price_per_second: Some(5),
            aspect_ratios: vec!["16:9", "9:16", "1:1"].into_iter().map(String::from).collect(),
            durations: vec![10, 15],
            icon: Some("🎥".to_string()),
            ..model("sora-2", "Sora 2", "poyo", "sora-2", MediaType::Video, 5)
        },
        ModelConfig {
            description: Some("Alibaba Wan 2.6, multi-shot 1080p".to_string()),
            price_per_second: Some(3),
            aspect_ratios: vec!["16:9", "9:16"].into_iter().map(String::from).collect(),
            durations: vec![5, 10, 15],
            icon: Some("🎭".to_string()),
            ..model("wan-2.6", "Wan 2.6", "poyo", "wan2.6-text-to-video", MediaType::Video, 3)
        },
        // Image-to-video
        ModelConfig {
            description: Some("Kling 2.6, video from an image".to_string()),
            price_per_second: Some(4),
            requires_image: true,
            aspect_ratios: vec!["16:9", "9:16", "1:1"].into_iter().map(String::from).collect(),
            durations: vec![5, 10],
            icon: Some("🎞️".to_string()),
            ..model("kling-2.6-i2v", "Kling 2.6", "kie", "kling-2.6/image-to-video", MediaType::Video, 4)
        },
        // Motion transfer
        ModelConfig {
            description: Some("Transfers motion from a reference video onto an image".to_string()),
            price_per_second: Some(1),
            requires_image: true,
            requires_video: true,
            icon: Some("🕺".to_string()),
            ..model(
                "kling-2.6-motion-control",
                "Kling 2.6 Motion Control",
                "kie",
                "kling-2.6/motion-control",
                MediaType::Video,
                1,
            )
        },
    ];

    for (i, m) in models.iter_mut().enumerate() {
        m.sort_order = i as i32;
    }
    models
}

/// Insert any catalog models missing from the store
pub async fn seed_default_models(store: &Arc<dyn Store>) -> Result<()> {
    for model in default_models() {
        if store.model_by_code(&model.code).await?.is_none() {
            info!(code = %model.code, provider = %model.provider, "Seeded model");
            store.upsert_model(model).await?;
        }
    }
    Ok(())
}
