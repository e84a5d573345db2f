pub mod config;
pub mod download;
pub mod error;
pub mod generator;
pub mod logger;
pub mod models;
pub mod storage;
pub mod studio;

pub use config::{GeminiConfig, HistoryConfig, StudioConfig};
pub use error::{ErrorKind, IconError, Result};
pub use generator::{build_icon_prompt, GeminiImageClient, IconGenerator};
pub use models::{
    builtin_presets, default_preset, find_preset, AspectRatio, GeneratedImage, IconRequest,
    StylePreset,
};
pub use storage::{FileHistoryBackend, HistoryBackend, HistoryStore, MemoryHistoryBackend};
pub use studio::{BatchEvent, GenerationState, IconStudio};
