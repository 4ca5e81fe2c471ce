//! Concentration unit conversions (pM, nM, uM, mM, M <-> Molar).

use crate::error::{Result, TbnError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    PicoMolar,
    NanoMolar,
    MicroMolar,
    MilliMolar,
    Molar,
}

pub const VALID_UNITS: [&str; 5] = ["pM", "nM", "uM", "mM", "M"];

impl Unit {
    /// Multiplicative factor to convert a value in this unit to Molar.
    pub fn to_molar_factor(self) -> f64 {
        match self {
            Unit::PicoMolar => 1e-12,
            Unit::NanoMolar => 1e-9,
            Unit::MicroMolar => 1e-6,
            Unit::MilliMolar => 1e-3,
            Unit::Molar => 1.0,
        }
    }

    pub fn parse(s: &str) -> Result<Unit> {
        match s {
            "pM" => Ok(Unit::PicoMolar),
            "nM" => Ok(Unit::NanoMolar),
            "uM" => Ok(Unit::MicroMolar),
            "mM" => Ok(Unit::MilliMolar),
            "M" => Ok(Unit::Molar),
            other => Err(TbnError::Semantics(format!(
                "invalid concentration unit '{other}', must be one of {}",
                VALID_UNITS.join(", ")
            ))),
        }
    }

    /// Human-readable display name, e.g. "uM" renders as "\u{b5}M".
    pub fn display_name(self) -> &'static str {
        match self {
            Unit::PicoMolar => "pM",
            Unit::NanoMolar => "nM",
            Unit::MicroMolar => "\u{b5}M",
            Unit::MilliMolar => "mM",
            Unit::Molar => "M",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Unit::PicoMolar => "pM",
            Unit::NanoMolar => "nM",
            Unit::MicroMolar => "uM",
            Unit::MilliMolar => "mM",
            Unit::Molar => "M",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

pub fn to_molar(value: f64, unit: Unit) -> f64 {
    value * unit.to_molar_factor()
}

pub fn from_molar(value: f64, unit: Unit) -> f64 {
    value / unit.to_molar_factor()
}

pub fn convert_concentration(value: f64, from: Unit, to: Unit) -> f64 {
    from_molar(to_molar(value, from), to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanomolar_round_trips_through_molar() {
        let m = to_molar(100.0, Unit::NanoMolar);
        assert!((m - 1e-7).abs() < 1e-18);
        let back = from_molar(m, Unit::NanoMolar);
        assert!((back - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(Unit::parse("foo").is_err());
    }

    #[test]
    fn micromolar_display_uses_mu_sign() {
        assert_eq!(Unit::MicroMolar.display_name(), "\u{b5}M");
        assert_eq!(Unit::MicroMolar.token(), "uM");
    }
}
