use crate::{error::Result, models::AspectRatio};
use async_trait::async_trait;

/// Turns icon text plus an opaque style fragment into a displayable image reference.
///
/// Every call is treated as producing a distinct result; implementations must not cache.
#[async_trait]
pub trait IconGenerator: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        style_suffix: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String>;
}

pub fn build_icon_prompt(text: &str, style_suffix: &str, aspect_ratio: AspectRatio) -> String {
    let mut prompt = format!(
        "Design a professional brand icon that prominently features the exact text \"{}\". \
The lettering must be spelled exactly as given, sharp and legible. \
Style: {}. Aspect ratio: {}.",
        text.trim(),
        style_suffix,
        aspect_ratio.request_ratio()
    );
    if aspect_ratio.is_circular() {
        prompt.push_str(" Keep every element inside a centered circle so the icon survives a circular crop.");
    }
    prompt
}
