//! Rate keys identifying a rate configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::port::Rate;

/// Identity of a rate configuration.
///
/// Holds the consumption rates of all input ports followed by the
/// production rates of all output ports. Equality is element-wise over the
/// rate vector and the input/output split, so distinct configurations never
/// share a key. The textual form separates every rate with `|`, e.g. `2|3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawRateKey")]
pub struct RateKey {
    rates: Vec<Rate>,
    inputs: usize,
}

/// Unchecked serialized form of a [`RateKey`].
#[derive(Deserialize)]
struct RawRateKey {
    rates: Vec<Rate>,
    inputs: usize,
}

impl TryFrom<RawRateKey> for RateKey {
    type Error = String;

    fn try_from(raw: RawRateKey) -> Result<Self, Self::Error> {
        if raw.inputs > raw.rates.len() {
            return Err(format!(
                "rate key has {} input rates but only {} rates",
                raw.inputs,
                raw.rates.len()
            ));
        }
        Ok(Self {
            rates: raw.rates,
            inputs: raw.inputs,
        })
    }
}

impl RateKey {
    /// Creates a key from input consumption rates and output production rates.
    pub fn new(
        inputs: impl IntoIterator<Item = Rate>,
        outputs: impl IntoIterator<Item = Rate>,
    ) -> Self {
        let mut rates: Vec<Rate> = inputs.into_iter().collect();
        let inputs = rates.len();
        rates.extend(outputs);
        Self { rates, inputs }
    }

    /// Returns every rate, inputs first.
    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    /// Returns the consumption rates of the input ports.
    pub fn input_rates(&self) -> &[Rate] {
        &self.rates[..self.inputs]
    }

    /// Returns the production rates of the output ports.
    pub fn output_rates(&self) -> &[Rate] {
        &self.rates[self.inputs..]
    }

    /// Returns true if no port contributed to the key.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rate) in self.rates.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{rate}")?;
        }
        Ok(())
    }
}
