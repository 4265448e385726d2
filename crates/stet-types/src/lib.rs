//! Shared types and error hierarchy for stet.

pub mod error;
pub mod glyphs;

pub use error::{BufferError, ConfigError, DisplayError, StetError};
pub use glyphs::BorderGlyphs;
