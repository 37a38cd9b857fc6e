//! # Linear Classifier Loading and Inference
//!
//! Loads a pre-trained logistic-regression style classifier from a
//! safetensors artifact and runs inference with Candle.
//!
//! ## Artifact Layout:
//! Each artifact holds two tensors:
//! - `weight`: `[n_classes, n_features]` (f32)
//! - `bias`: `[n_classes]` (f32)
//!
//! ## Inference:
//! A single forward pass through the linear layer followed by a softmax;
//! the predicted class is the argmax and the confidence is its
//! probability.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::ops::softmax_last_dim;
use candle_nn::{Linear, Module, VarBuilder};
use std::cmp::Ordering;
use std::path::Path;

/// Result of a single classification.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Argmax class index.
    pub class: usize,
    /// Softmax probability of the predicted class (0.0 to 1.0).
    pub confidence: f32,
}

/// A loaded linear classifier ready for inference.
///
/// Inference only reads the weights, so a single instance is safely shared
/// across concurrent requests.
pub struct LinearClassifier {
    linear: Linear,
    device: Device,
    n_features: usize,
    n_classes: usize,
}

impl LinearClassifier {
    /// Load a classifier artifact from disk.
    ///
    /// ## Parameters:
    /// - **path**: safetensors file holding `weight` and `bias`
    /// - **n_features** / **n_classes**: expected tensor shape; a mismatch
    ///   is a startup error, never a silent truncation
    pub fn load(
        path: impl AsRef<Path>,
        n_features: usize,
        n_classes: usize,
        device: &Device,
    ) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading classifier from {}", path.display());

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };
        let weight = vb.get((n_classes, n_features), "weight").map_err(|e| {
            anyhow!(
                "{}: missing or misshaped 'weight' tensor (expected [{}, {}]): {}",
                path.display(),
                n_classes,
                n_features,
                e
            )
        })?;
        let bias = vb.get(n_classes, "bias").map_err(|e| {
            anyhow!(
                "{}: missing or misshaped 'bias' tensor (expected [{}]): {}",
                path.display(),
                n_classes,
                e
            )
        })?;

        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            device: device.clone(),
            n_features,
            n_classes,
        })
    }

    /// Build a classifier from in-memory tensors.
    ///
    /// Used by tests and by any caller that materializes weights itself;
    /// `weight` must be `[n_classes, n_features]` and `bias` `[n_classes]`.
    pub fn from_tensors(weight: Tensor, bias: Tensor) -> Result<Self> {
        let (n_classes, n_features) = weight.dims2()?;
        let bias_len = bias.dims1()?;
        if bias_len != n_classes {
            return Err(anyhow!(
                "bias length {} does not match {} classes",
                bias_len,
                n_classes
            ));
        }

        let device = weight.device().clone();
        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            device,
            n_features,
            n_classes,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Classify one feature vector.
    pub fn predict(&self, features: &[f32]) -> Result<Prediction> {
        if features.len() != self.n_features {
            return Err(anyhow!(
                "feature vector has {} elements, classifier expects {}",
                features.len(),
                self.n_features
            ));
        }

        let input = Tensor::from_slice(features, (1, self.n_features), &self.device)?;
        let logits = self.linear.forward(&input)?;
        let probs = softmax_last_dim(&logits)?.squeeze(0)?.to_vec1::<f32>()?;

        let (class, confidence) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
            .map(|(i, p)| (i, *p))
            .unwrap_or((0, 0.0));

        Ok(Prediction { class, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn toy_classifier() -> LinearClassifier {
        // Two classes over three features: class 0 fires on feature 0,
        // class 1 fires on feature 2
        let weight = Tensor::from_slice(
            &[1.0f32, 0.0, 0.0, 0.0, 0.0, 1.0],
            (2, 3),
            &Device::Cpu,
        )
        .unwrap();
        let bias = Tensor::from_slice(&[0.0f32, 0.0], (2,), &Device::Cpu).unwrap();
        LinearClassifier::from_tensors(weight, bias).unwrap()
    }

    #[test]
    fn test_predict_argmax() {
        let clf = toy_classifier();

        let p = clf.predict(&[5.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.class, 0);
        assert!(p.confidence > 0.9);

        let p = clf.predict(&[0.0, 0.0, 5.0]).unwrap();
        assert_eq!(p.class, 1);
        assert!(p.confidence > 0.9);
    }

    #[test]
    fn test_confidence_is_probability() {
        let clf = toy_classifier();
        let p = clf.predict(&[0.0, 0.0, 0.0]).unwrap();
        // Symmetric input gives an even split
        assert!((p.confidence - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_predict_rejects_wrong_length() {
        let clf = toy_classifier();
        assert!(clf.predict(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_from_tensors_rejects_bias_mismatch() {
        let weight = Tensor::zeros((2, 3), DType::F32, &Device::Cpu).unwrap();
        let bias = Tensor::zeros(3, DType::F32, &Device::Cpu).unwrap();
        assert!(LinearClassifier::from_tensors(weight, bias).is_err());
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("vg-clf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("toy.safetensors");

        let weight = Tensor::from_slice(
            &[1.0f32, 0.0, 0.0, 0.0, 0.0, 1.0],
            (2, 3),
            &Device::Cpu,
        )
        .unwrap();
        let bias = Tensor::from_slice(&[0.1f32, -0.1], (2,), &Device::Cpu).unwrap();
        let tensors: HashMap<String, Tensor> =
            [("weight".to_string(), weight), ("bias".to_string(), bias)]
                .into_iter()
                .collect();
        candle_core::safetensors::save(&tensors, &path).unwrap();

        let clf = LinearClassifier::load(&path, 3, 2, &Device::Cpu).unwrap();
        assert_eq!(clf.n_features(), 3);
        assert_eq!(clf.n_classes(), 2);
        let p = clf.predict(&[4.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.class, 0);

        // Shape mismatch must fail loudly
        assert!(LinearClassifier::load(&path, 4, 2, &Device::Cpu).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
