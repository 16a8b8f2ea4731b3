use serde::{Deserialize, Serialize};

fn default_allow_unstructured() -> bool {
    true
}

/// Leniency switches for the Verbose decoder.
///
/// Supplied once per subscription and passed unchanged to every decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Accept a bare string where a structured `staticType` object is
    /// expected. Older servers emit type values in that form.
    #[serde(default = "default_allow_unstructured")]
    pub allow_unstructured_static_types: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            allow_unstructured_static_types: default_allow_unstructured(),
        }
    }
}

impl DecodeOptions {
    /// Options that reject every non-canonical form.
    pub fn strict() -> Self {
        Self {
            allow_unstructured_static_types: false,
        }
    }
}
