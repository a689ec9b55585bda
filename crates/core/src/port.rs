//! Ports and their token rates.

use serde::{Deserialize, Serialize};

/// Number of tokens consumed or produced by one firing.
pub type Rate = u32;

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// A port with its current token rate.
///
/// For an input port the rate is the consumption rate, for an output port
/// the production rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within its owner.
    pub name: String,

    /// Whether the port consumes or produces tokens.
    pub direction: PortDirection,

    /// Current rate.
    pub rate: Rate,
}

impl Port {
    /// Creates an input port with the given consumption rate.
    pub fn input(name: impl Into<String>, rate: Rate) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            rate,
        }
    }

    /// Creates an output port with the given production rate.
    pub fn output(name: impl Into<String>, rate: Rate) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            rate,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}
