//! Device selection for GGUF inference.

use candle_core::Device;
use tracing::{debug, info, warn};

/// Kind of device a model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// CPU
    Cpu,
    /// CUDA GPU with its ordinal
    Cuda(usize),
    /// Metal GPU (macOS)
    Metal,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(index) => write!(f, "cuda:{index}"),
            Self::Metal => write!(f, "metal"),
        }
    }
}

/// Pick the device for a model.
///
/// Any positive `gpu_layers` asks for an accelerator: CUDA first, then
/// Metal on macOS. Quantized weights are loaded whole, so the count itself
/// only matters as a switch. Falls back to the CPU when no accelerator is
/// available.
pub fn select_device(gpu_layers: i64) -> (Device, DeviceKind) {
    if gpu_layers <= 0 {
        debug!("gpu_layers = {}, using CPU", gpu_layers);
        return (Device::Cpu, DeviceKind::Cpu);
    }

    match Device::new_cuda(0) {
        Ok(device) => {
            info!("Using CUDA device 0");
            return (device, DeviceKind::Cuda(0));
        }
        Err(e) => debug!("CUDA device not available: {}", e),
    }

    if cfg!(target_os = "macos") {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal device");
                return (device, DeviceKind::Metal);
            }
            Err(e) => debug!("Metal device not available: {}", e),
        }
    }

    warn!(
        "gpu_layers = {} requested but no GPU is available, falling back to CPU",
        gpu_layers
    );
    (Device::Cpu, DeviceKind::Cpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_when_no_layers_offloaded() {
        let (device, kind) = select_device(0);
        assert!(device.is_cpu());
        assert_eq!(kind, DeviceKind::Cpu);
        assert_eq!(kind.to_string(), "cpu");
    }

    #[test]
    fn test_gpu_request_always_yields_a_device() {
        let (_, kind) = select_device(35);
        assert!(matches!(
            kind,
            DeviceKind::Cpu | DeviceKind::Cuda(_) | DeviceKind::Metal
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceKind::Cuda(1).to_string(), "cuda:1");
        assert_eq!(DeviceKind::Metal.to_string(), "metal");
    }
}
