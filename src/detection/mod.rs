//! # Voice Detection
//!
//! Wraps the two pre-trained classifiers (human-vs-AI voice authenticity,
//! spoken language) behind a single engine that turns a feature vector
//! into a complete verdict.

pub mod classifier;
pub mod engine;
pub mod labels;

pub use engine::{DetectionEngine, DetectionVerdict};
pub use labels::VoiceClass;
