//! Leaf dataflow actors.

use serde::{Deserialize, Serialize};

use crate::error::{HdfError, Result};
use crate::port::{Port, Rate};

/// An atomic actor contained in a schedulable unit.
///
/// An HDF actor may change its port rates between iterations; each
/// distinct combination of rates is one of its type signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor name (identifier within its container).
    pub name: String,

    /// Ports in declaration order.
    pub ports: Vec<Port>,
}

impl Actor {
    /// Creates a new actor with no ports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
        }
    }

    /// Adds a port.
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Returns the input ports in declaration order.
    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_input())
    }

    /// Returns the output ports in declaration order.
    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_output())
    }

    /// Looks up a port by name.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Sets the rate of a port, returning whether it changed.
    pub fn set_rate(&mut self, port: &str, rate: Rate) -> Result<bool> {
        let target = self
            .ports
            .iter_mut()
            .find(|p| p.name == port)
            .ok_or_else(|| HdfError::PortNotFound {
                owner: self.name.clone(),
                port: port.to_string(),
            })?;

        if target.rate == rate {
            return Ok(false);
        }
        target.rate = rate;
        Ok(true)
    }
}
