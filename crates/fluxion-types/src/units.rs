// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Dimensional newtypes for the scheduling domain.
//!
//! Power, energy and price are kept as distinct types so that a caller cannot
//! silently add a [`Watt`] to a [`WattHour`]. At runtime every value is a
//! plain `f64`; the types exist purely to catch unit mistakes at compile time.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};
use std::time::Duration as StdDuration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::NonFiniteValue;

/// Power, in watts. Positive values are draw/charge, the sign convention for
/// flows (e.g. battery charge vs. discharge) is defined by the caller.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct Watt(pub f64);

/// Energy, in watt-hours.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct WattHour(pub f64);

/// Price per unit of energy, in euros per watt-hour.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct EuroPerWh(pub f64);

/// A monetary amount, in euros.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct Euro(pub f64);

/// Deserializes the wrapped `f64`, rejecting `NaN`/`±inf` at the boundary
/// rather than letting them flow into the cost model as silent poison.
macro_rules! impl_finite_deserialize {
    ($t:ty, $field:literal) => {
        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = f64::deserialize(deserializer)?;
                NonFiniteValue::check($field, raw).map(Self).map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_finite_deserialize!(Watt, "Watt");
impl_finite_deserialize!(WattHour, "WattHour");
impl_finite_deserialize!(EuroPerWh, "EuroPerWh");
impl_finite_deserialize!(Euro, "Euro");

macro_rules! impl_scalar_ops {
    ($t:ty) => {
        impl Add for $t {
            type Output = $t;
            fn add(self, rhs: $t) -> $t {
                Self(self.0 + rhs.0)
            }
        }
        impl AddAssign for $t {
            fn add_assign(&mut self, rhs: $t) {
                self.0 += rhs.0;
            }
        }
        impl Sub for $t {
            type Output = $t;
            fn sub(self, rhs: $t) -> $t {
                Self(self.0 - rhs.0)
            }
        }
        impl Neg for $t {
            type Output = $t;
            fn neg(self) -> $t {
                Self(-self.0)
            }
        }
        impl Mul<f64> for $t {
            type Output = $t;
            fn mul(self, rhs: f64) -> $t {
                Self(self.0 * rhs)
            }
        }
        impl Div<f64> for $t {
            type Output = $t;
            fn div(self, rhs: f64) -> $t {
                Self(self.0 / rhs)
            }
        }
        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.6}", self.0)
            }
        }
    };
}

impl_scalar_ops!(Watt);
impl_scalar_ops!(WattHour);
impl_scalar_ops!(EuroPerWh);
impl_scalar_ops!(Euro);

impl Watt {
    pub const ZERO: Watt = Watt(0.0);

    /// Power sustained for `duration` becomes energy.
    pub fn over(self, duration: StdDuration) -> WattHour {
        WattHour(self.0 * duration.as_secs_f64() / 3600.0)
    }

    pub fn max(self, other: Watt) -> Watt {
        Watt(self.0.max(other.0))
    }

    pub fn min(self, other: Watt) -> Watt {
        Watt(self.0.min(other.0))
    }

    pub fn clamp(self, lo: Watt, hi: Watt) -> Watt {
        Watt(self.0.clamp(lo.0, hi.0))
    }

    pub fn abs(self) -> Watt {
        Watt(self.0.abs())
    }
}

impl WattHour {
    pub const ZERO: WattHour = WattHour(0.0);

    /// Energy delivered over `duration` becomes an average power.
    pub fn per(self, duration: StdDuration) -> Watt {
        Watt(self.0 / (duration.as_secs_f64() / 3600.0))
    }

    pub fn max(self, other: WattHour) -> WattHour {
        WattHour(self.0.max(other.0))
    }

    pub fn abs(self) -> WattHour {
        WattHour(self.0.abs())
    }
}

impl EuroPerWh {
    pub const ZERO: EuroPerWh = EuroPerWh(0.0);
}

impl Euro {
    pub const ZERO: Euro = Euro(0.0);

    pub fn abs(self) -> Euro {
        Euro(self.0.abs())
    }
}

/// Energy priced at a given rate becomes a cost (or revenue, if negative).
impl Mul<EuroPerWh> for WattHour {
    type Output = Euro;
    fn mul(self, rhs: EuroPerWh) -> Euro {
        Euro(self.0 * rhs.0)
    }
}

impl Mul<WattHour> for EuroPerWh {
    type Output = Euro;
    fn mul(self, rhs: WattHour) -> Euro {
        Euro(self.0 * rhs.0)
    }
}

impl std::iter::Sum for Euro {
    fn sum<I: Iterator<Item = Euro>>(iter: I) -> Self {
        iter.fold(Euro::ZERO, |acc, x| acc + x)
    }
}

impl std::iter::Sum for WattHour {
    fn sum<I: Iterator<Item = WattHour>>(iter: I) -> Self {
        iter.fold(WattHour::ZERO, |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_over_duration_is_energy() {
        let p = Watt(1000.0);
        let e = p.over(StdDuration::from_secs(3600));
        assert!((e.0 - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn energy_times_price_is_cost() {
        let e = WattHour(1000.0); // 1 kWh
        let price = EuroPerWh(0.00001); // 10 EUR/MWh
        let cost = e * price;
        assert!((cost.0 - 0.01).abs() < 1e-9);
    }

    #[test]
    fn arithmetic_is_commutative_for_cost() {
        let e = WattHour(500.0);
        let price = EuroPerWh(0.00002);
        assert_eq!((e * price).0, (price * e).0);
    }

    #[test]
    fn clamp_respects_bounds() {
        let p = Watt(5.0).clamp(Watt(-1.0), Watt(2.0));
        assert_eq!(p.0, 2.0);
    }

    #[test]
    fn deserializing_a_finite_value_succeeds() {
        let w: Watt = serde_json::from_str("1500.0").unwrap();
        assert_eq!(w.0, 1500.0);
    }

    #[test]
    fn deserializing_a_value_that_overflows_to_infinity_is_rejected() {
        // 1e400 is valid JSON number syntax; parsing it to f64 overflows to +inf,
        // which is exactly the boundary case `NonFiniteValue` exists to catch.
        let err = serde_json::from_str::<Watt>("1e400").unwrap_err();
        assert!(err.to_string().contains("Watt must be a finite number"));
    }
}
