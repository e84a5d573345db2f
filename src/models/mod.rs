pub mod aspect;
pub mod image;
pub mod record;
pub mod style;

pub use aspect::*;
pub use image::*;
pub use record::*;
pub use style::*;
