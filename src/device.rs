//! # Inference Device Selection
//!
//! Resolves the configured device preference ("auto", "cpu", "cuda",
//! "metal") to a Candle device, falling back to CPU whenever the requested
//! accelerator is unavailable.

use candle_core::Device;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Cached auto-detected device so detection runs once per process.
static BEST_DEVICE: OnceLock<Device> = OnceLock::new();

/// Resolve a device preference string to a concrete device.
///
/// Unknown preference strings log a warning and fall back to auto
/// detection rather than failing startup.
pub fn select_device(preference: &str) -> Device {
    match preference.to_lowercase().as_str() {
        "cpu" => Device::Cpu,
        "cuda" | "gpu" => cuda_device().unwrap_or(Device::Cpu),
        "metal" => metal_device().unwrap_or(Device::Cpu),
        "auto" | "automatic" => best_device(),
        other => {
            warn!("Unknown device preference '{}', using auto detection", other);
            best_device()
        }
    }
}

/// Best available device, detected once and cached.
pub fn best_device() -> Device {
    BEST_DEVICE.get_or_init(detect_best_device).clone()
}

fn detect_best_device() -> Device {
    if let Some(device) = cuda_device() {
        info!("Selected CUDA GPU for classifier inference");
        return device;
    }

    if let Some(device) = metal_device() {
        info!("Selected Metal GPU for classifier inference");
        return device;
    }

    info!("Using CPU for classifier inference (no GPU acceleration available)");
    Device::Cpu
}

fn cuda_device() -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("CUDA not available: {}", e);
            None
        }
    }
}

fn metal_device() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("Metal not available: {}", e);
            None
        }
    }
}

/// Short device description for logs and the health endpoint.
pub fn device_name(device: &Device) -> String {
    match device {
        Device::Cpu => "cpu".to_string(),
        Device::Cuda(_) => "cuda".to_string(),
        Device::Metal(_) => "metal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_preference_always_resolves() {
        let device = select_device("cpu");
        assert_eq!(device_name(&device), "cpu");
    }

    #[test]
    fn test_unknown_preference_falls_back() {
        // Must not panic, whatever the build's accelerators are
        let device = select_device("tpu");
        assert!(!device_name(&device).is_empty());
    }
}
