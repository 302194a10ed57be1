//! Production collaborators: a hosted Gradio OCR space and the Gemini API.

pub mod gemini;
pub mod gradio;
