//! # Detection Engine
//!
//! Owns both pre-trained classifiers and turns a feature vector into a
//! complete verdict: authenticity class, confidence, detected language and
//! a human-readable explanation.
//!
//! Both artifacts are loaded once at process start; the engine is
//! read-only afterwards and shared across requests behind an `Arc`.

use anyhow::Result;
use candle_core::Device;
use serde::Serialize;

use crate::config::ModelsConfig;
use crate::detection::classifier::LinearClassifier;
use crate::detection::labels::{language_name, VoiceClass};
use crate::device;
use crate::features::FEATURE_LEN;

/// Confidence above which the stronger explanation template is used.
const HIGH_CONFIDENCE: f32 = 0.85;

/// Voice authenticity classes (human, AI-generated).
const VOICE_CLASSES: usize = 2;
/// Language classes (see `labels::LANGUAGES`).
const LANGUAGE_CLASSES: usize = 5;

/// The complete verdict for one clip.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionVerdict {
    pub classification: VoiceClass,
    pub confidence_score: f32,
    pub detected_language: String,
    pub explanation: String,
}

/// Engine holding both classifiers.
pub struct DetectionEngine {
    voice: LinearClassifier,
    language: LinearClassifier,
    device: Device,
}

impl DetectionEngine {
    /// Load both classifier artifacts per the models configuration.
    ///
    /// A missing or misshaped artifact fails startup; there is no lazy or
    /// per-request loading.
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let device = device::select_device(&config.device);
        tracing::info!(
            "Loading detection models on {}",
            device::device_name(&device)
        );

        let voice =
            LinearClassifier::load(&config.voice_model_path, FEATURE_LEN, VOICE_CLASSES, &device)?;
        let language = LinearClassifier::load(
            &config.language_model_path,
            FEATURE_LEN,
            LANGUAGE_CLASSES,
            &device,
        )?;

        tracing::info!("Detection models loaded and ready");
        Ok(Self {
            voice,
            language,
            device,
        })
    }

    /// Build an engine from already-constructed classifiers (tests).
    pub fn from_parts(voice: LinearClassifier, language: LinearClassifier) -> Self {
        let device = Device::Cpu;
        Self {
            voice,
            language,
            device,
        }
    }

    /// Run both classifiers over one feature vector.
    pub fn classify(&self, features: &[f32]) -> Result<DetectionVerdict> {
        let authenticity = self.voice.predict(features)?;
        let classification = VoiceClass::from_class(authenticity.class);

        let language = self.language.predict(features)?;
        let detected_language = language_name(language.class).to_string();

        let explanation = explanation_for(classification, authenticity.confidence).to_string();

        tracing::debug!(
            classification = %classification,
            confidence = authenticity.confidence,
            language = %detected_language,
            "Classification complete"
        );

        Ok(DetectionVerdict {
            classification,
            confidence_score: authenticity.confidence,
            detected_language,
            explanation,
        })
    }

    pub fn device_name(&self) -> String {
        device::device_name(&self.device)
    }
}

/// Pick the explanation template for a verdict.
///
/// Templates and the 0.85 threshold reproduce the wording the service has
/// always returned.
pub fn explanation_for(classification: VoiceClass, confidence: f32) -> &'static str {
    match (classification, confidence > HIGH_CONFIDENCE) {
        (VoiceClass::AiGenerated, true) => {
            "The voice shows highly uniform pitch and low background noise, \
             which are common patterns in AI-generated speech."
        }
        (VoiceClass::AiGenerated, false) => {
            "The voice contains synthetic characteristics, but with moderate confidence."
        }
        (VoiceClass::Human, true) => {
            "The voice contains natural pauses, breathing patterns, and background \
             noise typical of human speech."
        }
        (VoiceClass::Human, false) => {
            "The voice appears human, but some synthetic traits were detected."
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use candle_core::Tensor;

    /// Tiny engine over the real 384-element feature space: the voice
    /// classifier keys on feature 0, the language classifier on features
    /// 1..6 one-hot.
    pub(crate) fn toy_engine() -> DetectionEngine {
        let mut voice_w = vec![0.0f32; 2 * FEATURE_LEN];
        voice_w[FEATURE_LEN] = 1.0; // class 1 (AI) fires on feature 0
        let voice = LinearClassifier::from_tensors(
            Tensor::from_slice(&voice_w, (2, FEATURE_LEN), &Device::Cpu).unwrap(),
            Tensor::from_slice(&[0.0f32, 0.0], (2,), &Device::Cpu).unwrap(),
        )
        .unwrap();

        let mut lang_w = vec![0.0f32; 5 * FEATURE_LEN];
        for class in 0..5 {
            lang_w[class * FEATURE_LEN + class + 1] = 1.0;
        }
        let language = LinearClassifier::from_tensors(
            Tensor::from_slice(&lang_w, (5, FEATURE_LEN), &Device::Cpu).unwrap(),
            Tensor::from_slice(&[0.0f32; 5], (5,), &Device::Cpu).unwrap(),
        )
        .unwrap();

        DetectionEngine::from_parts(voice, language)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::toy_engine;
    use super::*;

    #[test]
    fn test_classify_produces_full_verdict() {
        let engine = toy_engine();
        let mut features = vec![0.0f32; FEATURE_LEN];
        features[0] = 8.0; // drives the AI class
        features[2] = 8.0; // drives language class 1 (english)

        let verdict = engine.classify(&features).unwrap();
        assert_eq!(verdict.classification, VoiceClass::AiGenerated);
        assert!(verdict.confidence_score > 0.9);
        assert_eq!(verdict.detected_language, "english");
        assert!(verdict.explanation.contains("AI-generated"));
    }

    #[test]
    fn test_classify_human_path() {
        let engine = toy_engine();
        let mut features = vec![0.0f32; FEATURE_LEN];
        features[0] = -8.0;
        features[1] = 8.0; // language class 0 (tamil)

        let verdict = engine.classify(&features).unwrap();
        assert_eq!(verdict.classification, VoiceClass::Human);
        assert_eq!(verdict.detected_language, "tamil");
    }

    #[test]
    fn test_explanation_thresholds() {
        assert!(explanation_for(VoiceClass::AiGenerated, 0.95).contains("highly uniform pitch"));
        assert!(explanation_for(VoiceClass::AiGenerated, 0.6).contains("moderate confidence"));
        assert!(explanation_for(VoiceClass::Human, 0.95).contains("natural pauses"));
        assert!(explanation_for(VoiceClass::Human, 0.6).contains("appears human"));
        // The boundary itself takes the moderate wording
        assert!(explanation_for(VoiceClass::Human, 0.85).contains("appears human"));
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = DetectionVerdict {
            classification: VoiceClass::AiGenerated,
            confidence_score: 0.91,
            detected_language: "hindi".to_string(),
            explanation: "test".to_string(),
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["classification"], "AI_GENERATED");
        assert_eq!(json["detected_language"], "hindi");
    }
}
