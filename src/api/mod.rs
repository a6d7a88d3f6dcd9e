pub mod edge_tts;
pub mod gemini;
