use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Appended to the user's text as-is; never parsed.
    pub prompt_suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl StylePreset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        prompt_suffix: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            prompt_suffix: prompt_suffix.into(),
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

static BUILTIN_PRESETS: Lazy<Vec<StylePreset>> = Lazy::new(|| {
    vec![
        StylePreset::new(
            "minimalist",
            "Minimalist",
            "minimalist design, flat vector, clean sans-serif typography, solid background, professional tech aesthetic",
        )
        .with_description("Clean, simple typography with flat design elements.")
        .with_icon("◻"),
        StylePreset::new(
            "neon",
            "Cyberpunk Neon",
            "cyberpunk style, glowing neon lights, futuristic font, dark background, cyan and magenta accents",
        )
        .with_description("Glowing type with high-contrast futuristic colors.")
        .with_icon("⚡"),
        StylePreset::new(
            "3d-glass",
            "3D Glassmorphism",
            "3D render, glassmorphism, frosted glass texture, soft shadows, premium feel, modern gradient background",
        )
        .with_description("A modern 3D look with translucent frosted glass.")
        .with_icon("◈"),
        StylePreset::new(
            "bold-gradient",
            "Bold Gradient",
            "vibrant color gradient, bold typography, dynamic layout, energetic, high contrast, studio lighting",
        )
        .with_description("Vivid colors with dynamic, flowing typography.")
        .with_icon("🌈"),
    ]
});

pub fn builtin_presets() -> &'static [StylePreset] {
    &BUILTIN_PRESETS
}

pub fn default_preset() -> &'static StylePreset {
    &BUILTIN_PRESETS[0]
}

pub fn find_preset(id: &str) -> Option<&'static StylePreset> {
    BUILTIN_PRESETS.iter().find(|preset| preset.id == id)
}
