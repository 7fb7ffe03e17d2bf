//! Accelerator detection and device choice.

use athena_types::generation::{Device, DevicePreference};
use tracing::warn;

/// Reports whether an accelerator is usable. Queried once per model load.
pub trait AcceleratorProbe: Send + Sync {
    fn accelerator_available(&self) -> bool;
}

/// A probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl AcceleratorProbe for FixedProbe {
    fn accelerator_available(&self) -> bool {
        self.0
    }
}

/// Pick the load device from the configured preference.
///
/// An explicit accelerator request without an accelerator falls back to the
/// CPU with a warning rather than failing the load.
pub fn resolve_device(preference: DevicePreference, accelerator_available: bool) -> Device {
    match (preference, accelerator_available) {
        (DevicePreference::Cpu, _) => Device::Cpu,
        (DevicePreference::Auto, true) | (DevicePreference::Accelerator, true) => {
            Device::Accelerator
        }
        (DevicePreference::Auto, false) => Device::Cpu,
        (DevicePreference::Accelerator, false) => {
            warn!("Accelerator requested but none detected; loading on CPU");
            Device::Cpu
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_device_matrix() {
        use DevicePreference::*;
        assert_eq!(resolve_device(Auto, true), Device::Accelerator);
        assert_eq!(resolve_device(Auto, false), Device::Cpu);
        assert_eq!(resolve_device(Accelerator, true), Device::Accelerator);
        assert_eq!(resolve_device(Accelerator, false), Device::Cpu);
        assert_eq!(resolve_device(Cpu, true), Device::Cpu);
        assert_eq!(resolve_device(Cpu, false), Device::Cpu);
    }
}
