pub mod gemini;
pub mod traits;

pub use gemini::GeminiImageClient;
pub use traits::{build_icon_prompt, IconGenerator};
