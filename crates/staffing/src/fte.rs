use std::str::FromStr;

use derive_more::{Add, AddAssign, Sub, SubAssign, Sum};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::error::StaffingError;

pub type FteFractions = u32;

pub const FRACTIONS_PER_FTE: FteFractions = 10_000;
pub const FRACTIONS_MAX_DIGITS: usize = 4; // = log10(FRACTIONS_PER_FTE)

/// Working hours represented by one full-time equivalent.
pub const HOURS_PER_FTE: f64 = 8.0;

/// Full-time equivalent stored as a fixed-point number.
///
/// One unit (`Fte::ONE`) is a single person working full time (8 hours a day).
/// Fixed-point storage keeps sums of many partial allocations exact, so
/// `0.3 + 0.3 + 0.4` is exactly one FTE.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Add, AddAssign, Sub, SubAssign, Sum,
)]
pub struct Fte(FteFractions);

impl Fte {
    pub const ZERO: Fte = Fte(0);
    pub const ONE: Fte = Fte(FRACTIONS_PER_FTE);

    pub const fn from_fractions(fractions: FteFractions) -> Self {
        Fte(fractions)
    }

    pub fn from_f64(value: f64) -> Result<Self, StaffingError> {
        if !value.is_finite() || value < 0.0 {
            return Err(StaffingError::InvalidFte(value.to_string()));
        }
        let fractions = (value * FRACTIONS_PER_FTE as f64).round();
        if fractions > FteFractions::MAX as f64 {
            return Err(StaffingError::InvalidFte(value.to_string()));
        }
        Ok(Fte(fractions as FteFractions))
    }

    /// 100 % is one FTE.
    pub fn from_percentage(percentage: f64) -> Result<Self, StaffingError> {
        Self::from_f64(percentage / 100.0)
            .map_err(|_| StaffingError::InvalidFte(format!("{percentage}%")))
    }

    pub fn from_hours_per_day(hours: f64) -> Result<Self, StaffingError> {
        Self::from_f64(hours / HOURS_PER_FTE).map_err(|_| StaffingError::InvalidFte(format!("{hours}h")))
    }

    pub fn fractions(&self) -> FteFractions {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / FRACTIONS_PER_FTE as f64
    }

    pub fn percentage(&self) -> f64 {
        self.0 as f64 / (FRACTIONS_PER_FTE / 100) as f64
    }

    pub fn hours_per_day(&self) -> f64 {
        self.as_f64() * HOURS_PER_FTE
    }

    pub fn saturating_sub(self, other: Fte) -> Fte {
        Fte(self.0.saturating_sub(other.0))
    }

    /// Share of `self` in `total`, as a percentage. Zero total yields zero.
    pub fn percentage_of(&self, total: Fte) -> f64 {
        if total.is_zero() {
            0.0
        } else {
            self.0 as f64 * 100.0 / total.0 as f64
        }
    }
}

impl std::fmt::Display for Fte {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let units = self.0 / FRACTIONS_PER_FTE;
        let fractions = self.0 % FRACTIONS_PER_FTE;
        write!(f, "{units}")?;
        if fractions != 0 {
            let num = format!("{:01$}", fractions, FRACTIONS_MAX_DIGITS);
            write!(f, ".{}", num.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

impl FromStr for Fte {
    type Err = StaffingError;

    /// Accepts `0.5`, `50%` or `4h` (hours per day).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || StaffingError::InvalidFte(s.to_string());
        if let Some(percentage) = s.strip_suffix('%') {
            let value: f64 = percentage.trim().parse().map_err(|_| invalid())?;
            Fte::from_percentage(value)
        } else if let Some(hours) = s.strip_suffix('h') {
            let value: f64 = hours.trim().parse().map_err(|_| invalid())?;
            Fte::from_hours_per_day(value)
        } else {
            let value: f64 = s.parse().map_err(|_| invalid())?;
            Fte::from_f64(value)
        }
    }
}

impl Serialize for Fte {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Fte {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Fte::from_f64(value).map_err(D::Error::custom)
    }
}

/// An amount of work given either as FTE or as a percentage of full time.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct FteInput {
    #[serde(default)]
    pub fte: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
}

impl FteInput {
    pub fn resolve(&self) -> Result<Fte, StaffingError> {
        match (self.fte, self.percentage) {
            (Some(fte), None) => Fte::from_f64(fte),
            (None, Some(percentage)) => Fte::from_percentage(percentage),
            (Some(fte), Some(percentage)) => {
                let a = Fte::from_f64(fte)?;
                let b = Fte::from_percentage(percentage)?;
                if a.0.abs_diff(b.0) <= 1 {
                    Ok(a)
                } else {
                    Err(StaffingError::InvalidFte(format!(
                        "fte {fte} does not match percentage {percentage}%"
                    )))
                }
            }
            (None, None) => Err(StaffingError::InvalidFte(
                "either `fte` or `percentage` has to be set".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fte(s: &str) -> Fte {
        s.parse().unwrap()
    }

    #[test]
    fn test_fte_sum_is_exact() {
        let total: Fte = [fte("0.3"), fte("0.3"), fte("0.4")].into_iter().sum();
        assert_eq!(total, Fte::ONE);
    }

    #[test]
    fn test_fte_display() {
        assert_eq!(Fte::ZERO.to_string(), "0");
        assert_eq!(Fte::ONE.to_string(), "1");
        assert_eq!(Fte::from_fractions(5000).to_string(), "0.5");
        assert_eq!(Fte::from_fractions(3333).to_string(), "0.3333");
        assert_eq!(Fte::from_fractions(12500).to_string(), "1.25");
        assert_eq!(Fte::from_fractions(1).to_string(), "0.0001");
    }

    #[test]
    fn test_fte_parse_forms() {
        assert_eq!(fte("0.5"), Fte::from_fractions(5000));
        assert_eq!(fte("50%"), Fte::from_fractions(5000));
        assert_eq!(fte("4h"), Fte::from_fractions(5000));
        assert_eq!(fte(" 1 "), Fte::ONE);
        assert!("-0.5".parse::<Fte>().is_err());
        assert!("abc".parse::<Fte>().is_err());
        assert!("NaN".parse::<Fte>().is_err());
    }

    #[test]
    fn test_fte_conversions() {
        let half = fte("0.5");
        assert_eq!(half.percentage(), 50.0);
        assert_eq!(half.hours_per_day(), 4.0);
        assert_eq!(fte("0.25").percentage_of(half), 50.0);
        assert_eq!(half.percentage_of(Fte::ZERO), 0.0);
        assert_eq!(half.saturating_sub(Fte::ONE), Fte::ZERO);
    }

    #[test]
    fn test_fte_serde_as_number() {
        assert_eq!(serde_json::to_string(&fte("0.75")).unwrap(), "0.75");
        let value: Fte = serde_json::from_str("0.2").unwrap();
        assert_eq!(value, Fte::from_fractions(2000));
        assert!(serde_json::from_str::<Fte>("-1").is_err());
    }

    #[test]
    fn test_fte_input_resolve() {
        let input = |fte, percentage| FteInput { fte, percentage };
        assert_eq!(input(Some(0.5), None).resolve().unwrap(), fte("0.5"));
        assert_eq!(input(None, Some(25.0)).resolve().unwrap(), fte("0.25"));
        assert_eq!(input(Some(0.5), Some(50.0)).resolve().unwrap(), fte("0.5"));
        assert!(input(Some(0.5), Some(60.0)).resolve().is_err());
        assert!(input(None, None).resolve().is_err());
    }
}
