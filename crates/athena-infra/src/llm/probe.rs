//! Host accelerator detection.
//!
//! Looks for the device nodes that the NVIDIA and AMD ROCm drivers create.
//! This only says an accelerator exists; whether the model fits is found
//! out at load time, where an out-of-memory error falls back to the CPU.

use std::path::PathBuf;

use athena_core::llm::AcceleratorProbe;

const DEVICE_NODES: &[&str] = &["/dev/nvidia0", "/dev/kfd"];

#[derive(Debug, Clone)]
pub struct SystemAcceleratorProbe {
    nodes: Vec<PathBuf>,
}

impl SystemAcceleratorProbe {
    pub fn new() -> Self {
        Self::with_nodes(DEVICE_NODES.iter().map(PathBuf::from).collect())
    }

    pub fn with_nodes(nodes: Vec<PathBuf>) -> Self {
        Self { nodes }
    }
}

impl Default for SystemAcceleratorProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceleratorProbe for SystemAcceleratorProbe {
    fn accelerator_available(&self) -> bool {
        let found = self.nodes.iter().find(|p| p.exists());
        if let Some(node) = found {
            tracing::debug!(node = %node.display(), "Accelerator device node found");
        }
        found.is_some()
    }
}
