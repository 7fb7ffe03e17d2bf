//! Generation request/result and device placement types.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::corpus::ChunkId;

/// One call into the inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

/// Cleaned model output plus the chunks the prompt was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub answer_text: String,
    pub source_chunk_ids: Vec<ChunkId>,
}

/// Where a loaded model runs. Fixed at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Accelerator,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Accelerator => write!(f, "accelerator"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Configured device choice; `Auto` picks the accelerator when one is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Accelerator,
    Cpu,
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::Auto => write!(f, "auto"),
            DevicePreference::Accelerator => write!(f, "accelerator"),
            DevicePreference::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "accelerator" | "gpu" | "cuda" => Ok(DevicePreference::Accelerator),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(format!("invalid device preference: '{other}'")),
        }
    }
}
