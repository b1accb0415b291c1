// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Fixed-point hour amount, stored as hundredths of an hour.
///
/// All balance arithmetic is integer math so that allocation slices sum
/// exactly and `purchased - used == remaining` holds without drift. Negative
/// values are representable: the last bank in an allocation sequence may be
/// driven below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hours(i64);

/// One million hours, in centihours. Bounds every parsed amount.
pub const MAX_ABS_CENTIHOURS: i64 = 100_000_000;

impl Hours {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_centihours(centihours: i64) -> Self {
        Self(centihours)
    }

    #[must_use]
    pub const fn centihours(self) -> i64 {
        self.0
    }

    /// Parses a decimal hour amount with at most two fractional digits.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("hours must not be empty".to_string()));
        }
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole_part, frac_part) = match digits.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (digits, None),
        };
        if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError(format!(
                "hours must be a decimal number, got {s:?}"
            )));
        }
        let frac_centis = match frac_part {
            None => 0,
            Some(f) => {
                if f.is_empty() || f.len() > 2 || !f.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ValidationError(
                        "hours allow at most two fractional digits".to_string(),
                    ));
                }
                let parsed: i64 = f.parse().map_err(|_| {
                    ValidationError("hours fractional part is not numeric".to_string())
                })?;
                if f.len() == 1 {
                    parsed * 10
                } else {
                    parsed
                }
            }
        };
        let whole: i64 = whole_part
            .parse()
            .map_err(|_| ValidationError("hours whole part out of range".to_string()))?;
        let magnitude = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac_centis))
            .ok_or_else(|| ValidationError("hours out of range".to_string()))?;
        if magnitude > MAX_ABS_CENTIHOURS {
            return Err(ValidationError(format!(
                "hours exceed the representable range of {} hours",
                MAX_ABS_CENTIHOURS / 100
            )));
        }
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Hours {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Hours {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Hours {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Hours {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Display for Hours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", magnitude / 100, magnitude % 100)
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct HoursVisitor;

impl Visitor<'_> for HoursVisitor {
    type Value = Hours;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("an hour amount as a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Hours, E> {
        Hours::parse(value).map_err(|e| E::custom(e.0))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Hours, E> {
        let centis = value * 100.0;
        let rounded = centis.round();
        if (centis - rounded).abs() > 1e-6 {
            return Err(E::custom("hours allow at most two fractional digits"));
        }
        if !rounded.is_finite() || rounded.abs() > MAX_ABS_CENTIHOURS as f64 {
            return Err(E::custom("hours out of range"));
        }
        Ok(Hours(rounded as i64))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Hours, E> {
        let centis = value
            .checked_mul(100)
            .filter(|c| c.abs() <= MAX_ABS_CENTIHOURS)
            .ok_or_else(|| E::custom("hours out of range"))?;
        Ok(Hours(centis))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Hours, E> {
        let value = i64::try_from(value).map_err(|_| E::custom("hours out of range"))?;
        self.visit_i64(value)
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HoursVisitor)
    }
}
