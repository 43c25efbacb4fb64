pub mod features;
pub mod gemini;
pub mod history;
pub mod languages;
