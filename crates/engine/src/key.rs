//! Rate key construction.

use hdf_core::{Actor, Port, Rate, RateKey};

use crate::nested::Entity;

/// Anything exposing ports whose rates determine a schedule.
///
/// Both iterators must yield ports in the same order on every call.
pub trait RateSignature {
    fn input_ports(&self) -> impl Iterator<Item = &Port>;

    fn output_ports(&self) -> impl Iterator<Item = &Port>;
}

impl RateSignature for Actor {
    fn input_ports(&self) -> impl Iterator<Item = &Port> {
        Actor::input_ports(self)
    }

    fn output_ports(&self) -> impl Iterator<Item = &Port> {
        Actor::output_ports(self)
    }
}

/// The signature of a unit is every input port of its entities, in entity
/// declaration order, followed by every output port.
impl RateSignature for [Entity] {
    fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.iter()
            .flat_map(|e| e.ports().iter().filter(|p| p.is_input()))
    }

    fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.iter()
            .flat_map(|e| e.ports().iter().filter(|p| p.is_output()))
    }
}

/// Derives rate keys from port rates.
pub struct RateKeyBuilder;

impl RateKeyBuilder {
    /// Builds the key for the current rates of `source`.
    pub fn build<S: RateSignature + ?Sized>(source: &S) -> RateKey {
        RateKey::new(
            source.input_ports().map(|p| p.rate),
            source.output_ports().map(|p| p.rate),
        )
    }

    /// Builds a key from raw rate vectors.
    pub fn from_rates(
        inputs: impl IntoIterator<Item = Rate>,
        outputs: impl IntoIterator<Item = Rate>,
    ) -> RateKey {
        RateKey::new(inputs, outputs)
    }
}
