//! Arbitrary-magnitude decimal numbers for currencies that outgrow `f64`.
//!
//! A [`Decimal`] is a plain `f64` for every value below `1e300` and a
//! [`break_infinity::Decimal`] above that. Keeping small values plain means
//! integer arithmetic below 2^53 is exact, which the theorem currency relies
//! on for affordability checks, while values such as `1e20000` stay
//! representable. This module only adds the plain fast path, ordering,
//! parsing and serde glue on top of the registry type.

use break_infinity::Decimal as BigDecimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Smallest magnitude held in scientific form.
const PLAIN_LIMIT: f64 = 1e300;

/// Exponents below this are built as plain floats.
const PLAIN_EXPONENT_LIMIT: i64 = 300;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing a [`Decimal`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalParseError {
    #[error("empty decimal literal")]
    Empty,

    #[error("invalid mantissa '{0}'")]
    InvalidMantissa(String),

    #[error("invalid exponent '{0}'")]
    InvalidExponent(String),

    #[error("decimal literal '{0}' is not finite")]
    NotFinite(String),
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// A signed number of (effectively) unbounded magnitude.
#[derive(Clone, Copy)]
pub struct Decimal(Repr);

/// Invariant: `Plain` holds every finite value with `|v| < 1e300`; `Big`
/// holds only magnitudes at or above it.
#[derive(Clone, Copy)]
enum Repr {
    Plain(f64),
    Big(BigDecimal),
}

impl Decimal {
    pub const ZERO: Decimal = Decimal(Repr::Plain(0.0));

    pub const ONE: Decimal = Decimal(Repr::Plain(1.0));

    /// Build from a plain float. Non-finite input maps to zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            Self::ZERO
        } else if value.abs() < PLAIN_LIMIT {
            Decimal(Repr::Plain(value))
        } else {
            Decimal(Repr::Big(BigDecimal::new(value)))
        }
    }

    /// Build `mantissa * 10^exponent`. The mantissa need not be normalized.
    pub fn from_mantissa_exponent(mantissa: f64, exponent: i64) -> Self {
        if mantissa == 0.0 || !mantissa.is_finite() {
            return Self::ZERO;
        }
        if exponent < PLAIN_EXPONENT_LIMIT {
            let plain = mantissa * pow10(exponent);
            if plain.is_finite() {
                return Self::from_f64(plain);
            }
        }
        Self::from_big(break_infinity::from_mantissa_exponent(mantissa, exponent as f64))
    }

    /// Build `10^log`.
    pub fn from_log10(log: f64) -> Self {
        if !log.is_finite() {
            return Self::ZERO;
        }
        let whole = log.floor();
        Self::from_mantissa_exponent(10f64.powf(log - whole), whole as i64)
    }

    /// `base^power` for a non-negative base.
    pub fn pow(base: f64, power: f64) -> Self {
        if power == 0.0 {
            return Self::ONE;
        }
        if base == 0.0 {
            return Self::ZERO;
        }
        let plain = base.powf(power);
        if plain.is_finite() && plain != 0.0 && plain.abs() < PLAIN_LIMIT {
            return Self::from_f64(plain);
        }
        Self::from_log10(power * base.abs().log10())
    }

    /// `self^power` for a non-negative value.
    pub fn powf(self, power: f64) -> Self {
        match self.0 {
            Repr::Plain(v) => Self::pow(v, power),
            Repr::Big(_) if power == 0.0 => Self::ONE,
            Repr::Big(_) => Self::from_log10(self.log10() * power),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.0, Repr::Plain(v) if v == 0.0)
    }

    pub fn is_negative(&self) -> bool {
        self.signum() < 0
    }

    /// Base-10 logarithm of the magnitude. Zero yields negative infinity.
    pub fn log10(&self) -> f64 {
        match self.0 {
            Repr::Plain(v) => v.abs().log10(),
            Repr::Big(b) if b.to_number() < 0.0 => (-b).log10(),
            Repr::Big(b) => b.log10(),
        }
    }

    /// Base-2 logarithm. Zero yields negative infinity.
    pub fn log2(&self) -> f64 {
        self.log10() / std::f64::consts::LOG10_2
    }

    /// The base-10 exponent of the scientific form (`0` for zero).
    pub fn exponent(&self) -> i64 {
        self.to_scientific().1
    }

    /// The mantissa of the scientific form, `1 <= |m| < 10` (`0` for zero).
    pub fn mantissa(&self) -> f64 {
        self.to_scientific().0
    }

    /// Lossy conversion. Magnitudes beyond `f64::MAX` become infinite.
    pub fn to_f64(&self) -> f64 {
        match self.0 {
            Repr::Plain(v) => v,
            Repr::Big(b) => b.to_number(),
        }
    }

    /// `self - rhs`, clamped at zero.
    pub fn saturating_sub(self, rhs: Decimal) -> Self {
        (self - rhs).max(Self::ZERO)
    }

    fn big(self) -> BigDecimal {
        match self.0 {
            Repr::Plain(v) => BigDecimal::new(v),
            Repr::Big(b) => b,
        }
    }

    /// Collapse a registry value back to plain form when it fits.
    fn from_big(big: BigDecimal) -> Self {
        let value = big.to_number();
        if value.is_nan() {
            Self::ZERO
        } else if value.is_finite() && value.abs() < PLAIN_LIMIT {
            Decimal(Repr::Plain(value))
        } else {
            Decimal(Repr::Big(big))
        }
    }

    fn to_scientific(self) -> (f64, i64) {
        match self.0 {
            Repr::Plain(v) if v == 0.0 => (0.0, 0),
            Repr::Plain(v) => split_scientific(v),
            Repr::Big(b) => {
                let mut e = self.log10().floor() as i64;
                let mut m = scaled_mantissa(b, e);
                if m.abs() >= 10.0 {
                    e += 1;
                    m = scaled_mantissa(b, e);
                } else if m.abs() < 1.0 {
                    e -= 1;
                    m = scaled_mantissa(b, e);
                }
                (m, e)
            }
        }
    }

    fn signum(&self) -> i8 {
        let v = self.to_f64();
        if v > 0.0 {
            1
        } else if v < 0.0 {
            -1
        } else {
            0
        }
    }
}

/// `big / 10^exponent` as a float. Dividing by an exact power of ten leaves
/// the registry mantissa untouched.
fn scaled_mantissa(big: BigDecimal, exponent: i64) -> f64 {
    (big / break_infinity::from_mantissa_exponent(1.0, exponent as f64)).to_number()
}

/// Split a finite, non-zero float into `(m, e)` with `1 <= |m| < 10`.
fn split_scientific(value: f64) -> (f64, i64) {
    let mut e = value.abs().log10().floor() as i64;
    let mut m = value / pow10(e);
    if m.abs() >= 10.0 {
        m /= 10.0;
        e += 1;
    } else if m.abs() < 1.0 {
        m *= 10.0;
        e -= 1;
    }
    (m, e)
}

fn pow10(e: i64) -> f64 {
    10f64.powi(e.clamp(-400, 400) as i32)
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        match (self.0, rhs.0) {
            (Repr::Plain(a), Repr::Plain(b)) => Decimal::from_f64(a + b),
            _ if self.is_zero() => rhs,
            _ if rhs.is_zero() => self,
            _ => Decimal::from_big(self.big() + rhs.big()),
        }
    }
}

impl Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        match self.0 {
            Repr::Plain(v) if v == 0.0 => self,
            Repr::Plain(v) => Decimal(Repr::Plain(-v)),
            Repr::Big(b) => Decimal(Repr::Big(-b)),
        }
    }
}

impl Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        match (self.0, rhs.0) {
            (Repr::Plain(a), Repr::Plain(b)) => Decimal::from_f64(a - b),
            _ if rhs.is_zero() => self,
            _ => Decimal::from_big(self.big() - rhs.big()),
        }
    }
}

impl Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        if self.is_zero() || rhs.is_zero() {
            return Decimal::ZERO;
        }
        if let (Repr::Plain(a), Repr::Plain(b)) = (self.0, rhs.0) {
            let product = a * b;
            if product.is_finite() {
                return Decimal::from_f64(product);
            }
        }
        Decimal::from_big(self.big() * rhs.big())
    }
}

/// Division by zero yields zero.
impl Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        if self.is_zero() || rhs.is_zero() {
            return Decimal::ZERO;
        }
        if let (Repr::Plain(a), Repr::Plain(b)) = (self.0, rhs.0) {
            let quotient = a / b;
            if quotient.is_finite() && quotient != 0.0 {
                return Decimal::from_f64(quotient);
            }
        }
        Decimal::from_big(self.big() / rhs.big())
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        *self = *self + rhs;
    }
}

impl SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        *self = *self - rhs;
    }
}

impl MulAssign for Decimal {
    fn mul_assign(&mut self, rhs: Decimal) {
        *self = *self * rhs;
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::ZERO, |acc, d| acc + d)
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::ZERO, |acc, d| acc + *d)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Repr::Plain(a), Repr::Plain(b)) = (self.0, other.0) {
            return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        }

        let (sa, sb) = (self.signum(), other.signum());
        if sa != sb {
            return sa.cmp(&sb);
        }

        let (ma, ea) = self.to_scientific();
        let (mb, eb) = other.to_scientific();
        let magnitude = ea
            .cmp(&eb)
            .then(ma.abs().partial_cmp(&mb.abs()).unwrap_or(Ordering::Equal));
        if sa < 0 { magnitude.reverse() } else { magnitude }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<u32> for Decimal {
    fn from(v: u32) -> Self {
        Decimal::from_f64(v as f64)
    }
}

impl From<i32> for Decimal {
    fn from(v: i32) -> Self {
        Decimal::from_f64(v as f64)
    }
}

impl From<u64> for Decimal {
    fn from(v: u64) -> Self {
        Decimal::from_f64(v as f64)
    }
}

impl From<f64> for Decimal {
    fn from(v: f64) -> Self {
        Decimal::from_f64(v)
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Big(_) => {
                let (m, e) = self.to_scientific();
                write!(f, "{m}e{e}")
            }
            Repr::Plain(v) if v.abs() >= 1e21 => write!(f, "{v:e}"),
            Repr::Plain(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecimalParseError::Empty);
        }
        if let Ok(plain) = s.parse::<f64>() {
            if plain.is_finite() && plain.abs() < PLAIN_LIMIT {
                return Ok(Decimal::from_f64(plain));
            }
        }

        let (mantissa_text, exponent) = match s.split_once(['e', 'E']) {
            Some((m, e)) => {
                let exponent: i64 = e
                    .parse()
                    .map_err(|_| DecimalParseError::InvalidExponent(e.to_string()))?;
                (m, exponent)
            }
            None => (s, 0),
        };

        let mantissa: f64 = mantissa_text
            .parse()
            .map_err(|_| DecimalParseError::InvalidMantissa(mantissa_text.to_string()))?;
        if !mantissa.is_finite() {
            return Err(DecimalParseError::NotFinite(s.to_string()));
        }

        Ok(Decimal::from_mantissa_exponent(mantissa, exponent))
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a decimal string such as \"1e20000\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from_f64(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        if !v.is_finite() {
            return Err(E::custom(DecimalParseError::NotFinite(v.to_string())));
        }
        Ok(Decimal::from_f64(v))
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}
