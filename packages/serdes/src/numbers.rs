//! How numbers read off the wire are represented in the document.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use docwire_core::{Path, PathPattern, Value};
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use serde::Deserialize;

/// The in-memory representation chosen for a wire number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberRepr {
    /// Native `Integer` or `Float`. Values too large or too precise for
    /// either lose precision.
    #[default]
    Number,
    /// Arbitrary-size integer. Fractional numbers are rejected.
    BigInt,
    /// Arbitrary-precision decimal.
    Decimal,
    /// The number's decimal text.
    String,
    /// `Number` when that is exact, `String` otherwise.
    NumberOrString,
}

/// Beyond this many integer digits a number is not expanded into a
/// `BigInt` or into positional text.
const MAX_EXPANDED_DIGITS: i64 = 4096;

impl NumberRepr {
    /// Convert a numeric value to this representation.
    ///
    /// Non-numeric values are returned unchanged.
    pub fn apply(self, value: Value) -> Result<Value, String> {
        if !value.kind().is_number() {
            return Ok(value);
        }
        match self {
            NumberRepr::Number => to_native(value),
            NumberRepr::BigInt => to_bigint(&value).map(Value::BigInt),
            NumberRepr::Decimal => to_decimal(&value).map(Value::Decimal),
            NumberRepr::String => number_text(&value).map(Value::String),
            NumberRepr::NumberOrString => {
                if is_safe(&value) {
                    Ok(value)
                } else {
                    number_text(&value).map(Value::String)
                }
            }
        }
    }
}

/// A number that fits `i64` or survives a round trip through `f64`.
fn is_safe(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite(),
        Value::BigInt(b) => b.to_i64().is_some(),
        Value::Decimal(d) => {
            let f = decimal_f64(d);
            f.is_finite() && float_decimal(f).is_some_and(|back| same_decimal(&back, d))
        }
        _ => false,
    }
}

fn to_native(value: Value) -> Result<Value, String> {
    match value {
        Value::BigInt(b) => match b.to_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => match b.to_f64() {
                Some(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(out_of_range(b.bits())),
            },
        },
        Value::Decimal(d) => {
            if d.is_zero() {
                return Ok(Value::Integer(0));
            }
            if is_integral(&d) && integer_digits(&d) <= 19 {
                if let Some(i) = d.to_i64() {
                    return Ok(Value::Integer(i));
                }
            }
            let f = decimal_f64(&d);
            if f.is_finite() {
                Ok(Value::Float(f))
            } else {
                Err(format!(
                    "{} is out of range for a native number",
                    decimal_text(&d)
                ))
            }
        }
        other => Ok(other),
    }
}

fn out_of_range(bits: u64) -> String {
    format!("a {}-bit integer is out of range for a native number", bits)
}

fn to_bigint(value: &Value) -> Result<BigInt, String> {
    match value {
        Value::Integer(i) => return Ok(BigInt::from(*i)),
        Value::BigInt(b) => return Ok(b.clone()),
        _ => {}
    }
    let decimal = to_decimal(value)?;
    if decimal.is_zero() {
        return Ok(BigInt::zero());
    }
    if !is_integral(&decimal) {
        return Err(format!("{} is not an integer", decimal_text(&decimal)));
    }
    if integer_digits(&decimal) > MAX_EXPANDED_DIGITS {
        return Err(format!(
            "{} has more than {} digits",
            decimal_text(&decimal),
            MAX_EXPANDED_DIGITS
        ));
    }
    let (digits, _) = decimal.with_scale(0).into_bigint_and_exponent();
    Ok(digits)
}

fn to_decimal(value: &Value) -> Result<BigDecimal, String> {
    match value {
        Value::Integer(i) => Ok(BigDecimal::from(*i)),
        Value::Float(f) => float_decimal(*f).ok_or_else(|| format!("{} is not finite", f)),
        Value::BigInt(b) => Ok(BigDecimal::new(b.clone(), 0)),
        Value::Decimal(d) => Ok(d.clone()),
        other => Err(format!("{} is not a number", other.kind())),
    }
}

/// The decimal with the same shortest text as `f`.
pub(crate) fn float_decimal(f: f64) -> Option<BigDecimal> {
    if !f.is_finite() {
        return None;
    }
    BigDecimal::from_str(&f.to_string()).ok()
}

/// Numeric equality that never rescales either side.
pub(crate) fn same_decimal(a: &BigDecimal, b: &BigDecimal) -> bool {
    canonical(a) == canonical(b)
}

/// Sign, unscaled digits without trailing zeros, and the matching scale.
fn canonical(d: &BigDecimal) -> (Sign, String, i64) {
    let (sign, digits, scale) = unscaled(d);
    if sign == Sign::NoSign {
        return (sign, String::new(), 0);
    }
    let trimmed = digits.trim_end_matches('0');
    let zeros = (digits.len() - trimmed.len()) as i64;
    (sign, trimmed.to_string(), scale - zeros)
}

/// The nearest `f64`, infinite when out of range. Parsed from
/// mantissa-exponent text so the exponent is never expanded.
fn decimal_f64(d: &BigDecimal) -> f64 {
    let (digits, scale) = d.as_bigint_and_exponent();
    format!("{}e{}", digits, -i128::from(scale))
        .parse()
        .unwrap_or(f64::NAN)
}

/// Sign, unscaled digits without sign, and the scale.
fn unscaled(d: &BigDecimal) -> (Sign, String, i64) {
    let (digits, scale) = d.as_bigint_and_exponent();
    (digits.sign(), digits.magnitude().to_string(), scale)
}

fn is_integral(d: &BigDecimal) -> bool {
    let (sign, digits, scale) = unscaled(d);
    if scale <= 0 || sign == Sign::NoSign {
        return true;
    }
    let trailing_zeros = digits.len() - digits.trim_end_matches('0').len();
    trailing_zeros as i64 >= scale
}

/// Digits before the decimal point, counting zeros an exponent implies.
fn integer_digits(d: &BigDecimal) -> i64 {
    let (_, digits, scale) = unscaled(d);
    (digits.len() as i64).saturating_sub(scale)
}

/// Positional text, or mantissa-exponent text for extreme exponents.
pub(crate) fn decimal_text(d: &BigDecimal) -> String {
    let (digits, scale) = d.as_bigint_and_exponent();
    if scale.unsigned_abs() <= MAX_EXPANDED_DIGITS.unsigned_abs() {
        d.to_string()
    } else {
        format!("{}e{}", digits, -i128::from(scale))
    }
}

fn number_text(value: &Value) -> Result<String, String> {
    match value {
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::BigInt(b) => Ok(b.to_string()),
        Value::Decimal(d) => Ok(decimal_text(d)),
        other => Err(format!("{} is not a number", other.kind())),
    }
}

/// Callback form of a [`NumberPolicy`].
pub type NumberCallback = Arc<dyn Fn(&Path) -> NumberRepr + Send + Sync>;

/// Chooses a [`NumberRepr`] for each path.
#[derive(Clone)]
pub enum NumberPolicy {
    /// The same representation everywhere.
    Constant(NumberRepr),
    /// Per-path patterns, with a fallback for paths no pattern matches.
    PerPath {
        rules: Vec<(PathPattern, NumberRepr)>,
        default: NumberRepr,
    },
    Callback(NumberCallback),
}

impl NumberPolicy {
    /// Start a per-path policy.
    pub fn per_path(default: NumberRepr) -> Self {
        NumberPolicy::PerPath {
            rules: Vec::new(),
            default,
        }
    }

    pub fn callback(f: impl Fn(&Path) -> NumberRepr + Send + Sync + 'static) -> Self {
        NumberPolicy::Callback(Arc::new(f))
    }

    /// Add a per-path rule. Turns any other policy into a per-path one
    /// whose default is what the old policy gives at the root.
    #[must_use]
    pub fn with(self, pattern: PathPattern, repr: NumberRepr) -> Self {
        let (mut rules, default) = match self {
            NumberPolicy::PerPath { rules, default } => (rules, default),
            other => (Vec::new(), other.resolve(&Path::root())),
        };
        rules.push((pattern, repr));
        NumberPolicy::PerPath { rules, default }
    }

    /// The representation for numbers at `path`.
    ///
    /// Among per-path rules the one with the fewest wildcards wins; ties go
    /// to the rule added first.
    pub fn resolve(&self, path: &Path) -> NumberRepr {
        match self {
            NumberPolicy::Constant(repr) => *repr,
            NumberPolicy::PerPath { rules, default } => rules
                .iter()
                .filter(|(pattern, _)| pattern.matches(path))
                .min_by_key(|(pattern, _)| pattern.wildcards())
                .map_or(*default, |(_, repr)| *repr),
            NumberPolicy::Callback(f) => f(path),
        }
    }
}

impl Default for NumberPolicy {
    fn default() -> Self {
        NumberPolicy::Constant(NumberRepr::Number)
    }
}

impl From<NumberRepr> for NumberPolicy {
    fn from(repr: NumberRepr) -> Self {
        NumberPolicy::Constant(repr)
    }
}

impl fmt::Debug for NumberPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberPolicy::Constant(repr) => f.debug_tuple("Constant").field(repr).finish(),
            NumberPolicy::PerPath { rules, default } => f
                .debug_struct("PerPath")
                .field(
                    "rules",
                    &rules
                        .iter()
                        .map(|(p, r)| (p.to_string(), *r))
                        .collect::<Vec<_>>(),
                )
                .field("default", default)
                .finish(),
            NumberPolicy::Callback(_) => f.write_str("Callback"),
        }
    }
}
