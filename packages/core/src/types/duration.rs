use std::fmt;
use std::str::FromStr;

use super::TypeError;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// A calendar-aware duration: months, days and nanoseconds kept separately,
/// because a month is not a fixed number of days and a day is not always
/// 24 hours.
///
/// All three components share one sign.
///
/// Text forms:
/// - compact units, descending, each at most once: `1y2mo3w4d5h6m7s8ms9us10ns`
///   (`µs` is accepted for microseconds, units are case-insensitive)
/// - ISO-8601: `P1Y2M3DT4H5M6.5S`, `P2W`
///
/// Both may carry a leading `-`. [`Display`](fmt::Display) always produces
/// the compact form, `0s` for zero.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct CalendarDuration {
    months: i32,
    days: i32,
    nanoseconds: i64,
}

impl CalendarDuration {
    pub fn new(months: i32, days: i32, nanoseconds: i64) -> Result<Self, TypeError> {
        let signs = [months.signum() as i64, days.signum() as i64, nanoseconds.signum()];
        if signs.contains(&1) && signs.contains(&-1) {
            return Err(TypeError::MixedSigns);
        }
        Ok(CalendarDuration {
            months,
            days,
            nanoseconds,
        })
    }

    pub fn months(&self) -> i32 {
        self.months
    }

    pub fn days(&self) -> i32 {
        self.days
    }

    pub fn nanoseconds(&self) -> i64 {
        self.nanoseconds
    }

    pub fn is_negative(&self) -> bool {
        self.months < 0 || self.days < 0 || self.nanoseconds < 0
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.nanoseconds == 0
    }

    /// Build a pure time duration; `None` if it overflows the nanosecond field.
    pub fn from_std(duration: std::time::Duration) -> Option<Self> {
        let nanos = i64::try_from(duration.as_nanos()).ok()?;
        Some(CalendarDuration {
            months: 0,
            days: 0,
            nanoseconds: nanos,
        })
    }

    /// Parse either the compact unit form or the ISO-8601 form.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let (negative, body) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        if body.is_empty() {
            return Err(invalid(input, "empty duration"));
        }

        let acc = if body.starts_with(['P', 'p']) {
            parse_iso(input, &body[1..])?
        } else {
            parse_units(input, body)?
        };
        acc.finish(input, negative)
    }
}

impl FromStr for CalendarDuration {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalendarDuration::parse(s)
    }
}

impl fmt::Display for CalendarDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0s");
        }
        if self.is_negative() {
            f.write_str("-")?;
        }

        let months = self.months.unsigned_abs();
        let days = self.days.unsigned_abs();
        let mut nanos = self.nanoseconds.unsigned_abs();

        let mut parts: Vec<(u64, &str)> = vec![
            ((months / 12) as u64, "y"),
            ((months % 12) as u64, "mo"),
            (days as u64, "d"),
        ];
        for (size, unit) in [
            (NANOS_PER_HOUR, "h"),
            (NANOS_PER_MINUTE, "m"),
            (NANOS_PER_SECOND, "s"),
            (NANOS_PER_MILLI, "ms"),
            (NANOS_PER_MICRO, "us"),
            (1, "ns"),
        ] {
            let size = size as u64;
            parts.push((nanos / size, unit));
            nanos %= size;
        }

        for (amount, unit) in parts {
            if amount != 0 {
                write!(f, "{}{}", amount, unit)?;
            }
        }
        Ok(())
    }
}

/// Unsigned totals collected while parsing; the sign is applied at the end.
#[derive(Default)]
struct Accumulator {
    months: i128,
    days: i128,
    nanos: i128,
}

impl Accumulator {
    fn add(&mut self, input: &str, amount: u64, unit: Unit) -> Result<(), TypeError> {
        let amount = amount as i128;
        match unit {
            Unit::Years => self.months += amount * 12,
            Unit::Months => self.months += amount,
            Unit::Weeks => self.days += amount * 7,
            Unit::Days => self.days += amount,
            Unit::Nanos(scale) => self.nanos += amount * scale as i128,
        }
        if self.nanos > i64::MAX as i128 || self.months > i32::MAX as i128 {
            return Err(invalid(input, "value out of range"));
        }
        Ok(())
    }

    fn finish(self, input: &str, negative: bool) -> Result<CalendarDuration, TypeError> {
        let overflow = || invalid(input, "value out of range");
        let sign: i128 = if negative { -1 } else { 1 };
        Ok(CalendarDuration {
            months: i32::try_from(self.months * sign).map_err(|_| overflow())?,
            days: i32::try_from(self.days * sign).map_err(|_| overflow())?,
            nanoseconds: i64::try_from(self.nanos * sign).map_err(|_| overflow())?,
        })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Unit {
    Years,
    Months,
    Weeks,
    Days,
    Nanos(i64),
}

const UNITS: &[(&str, Unit)] = &[
    ("y", Unit::Years),
    ("mo", Unit::Months),
    ("w", Unit::Weeks),
    ("d", Unit::Days),
    ("h", Unit::Nanos(NANOS_PER_HOUR)),
    ("m", Unit::Nanos(NANOS_PER_MINUTE)),
    ("s", Unit::Nanos(NANOS_PER_SECOND)),
    ("ms", Unit::Nanos(NANOS_PER_MILLI)),
    ("us", Unit::Nanos(NANOS_PER_MICRO)),
    ("µs", Unit::Nanos(NANOS_PER_MICRO)),
    ("ns", Unit::Nanos(1)),
];

fn parse_units(input: &str, body: &str) -> Result<Accumulator, TypeError> {
    let mut acc = Accumulator::default();
    let mut rest = body;
    // Index into UNITS of the last unit seen; units must strictly descend.
    let mut last: Option<usize> = None;

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid(input, "expected a number"));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|_| invalid(input, "value out of range"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map_or(rest.len(), |(i, _)| i);
        let unit_text = rest[..unit_len].to_lowercase();
        rest = &rest[unit_len..];

        let position = UNITS
            .iter()
            .position(|(name, _)| *name == unit_text)
            .ok_or_else(|| invalid(input, &format!("unknown unit '{}'", unit_text)))?;
        // `us` and `µs` share a rank.
        let rank = if UNITS[position].0 == "µs" { position - 1 } else { position };
        if last.is_some_and(|l| rank <= l) {
            return Err(invalid(input, "units must appear once, largest first"));
        }
        last = Some(rank);

        acc.add(input, amount, UNITS[position].1)?;
    }
    Ok(acc)
}

fn parse_iso(input: &str, body: &str) -> Result<Accumulator, TypeError> {
    let mut acc = Accumulator::default();
    let (date_part, time_part) = match body.find(['T', 't']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    if date_part.is_empty() && time_part.map_or(true, str::is_empty) {
        return Err(invalid(input, "no components after 'P'"));
    }

    for (amount, designator) in iso_components(input, date_part, false)? {
        let unit = match designator {
            'Y' => Unit::Years,
            'M' => Unit::Months,
            'W' => Unit::Weeks,
            'D' => Unit::Days,
            other => return Err(invalid(input, &format!("unexpected '{}' in date part", other))),
        };
        acc.add(input, amount.whole, unit)?;
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return Err(invalid(input, "'T' without time components"));
        }
        for (amount, designator) in iso_components(input, time_part, true)? {
            let scale = match designator {
                'H' => NANOS_PER_HOUR,
                'M' => NANOS_PER_MINUTE,
                'S' => NANOS_PER_SECOND,
                other => {
                    return Err(invalid(input, &format!("unexpected '{}' in time part", other)))
                }
            };
            if amount.fraction_nanos != 0 && designator != 'S' {
                return Err(invalid(input, "fractions are only allowed on seconds"));
            }
            acc.add(input, amount.whole, Unit::Nanos(scale))?;
            acc.nanos += amount.fraction_nanos as i128;
        }
    }
    Ok(acc)
}

struct IsoAmount {
    whole: u64,
    fraction_nanos: i64,
}

fn iso_components(
    input: &str,
    part: &str,
    allow_fraction: bool,
) -> Result<Vec<(IsoAmount, char)>, TypeError> {
    let mut out = Vec::new();
    let mut rest = part;
    while !rest.is_empty() {
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid(input, "number without designator"))?;
        let number = &rest[..end];
        let designator = rest[end..]
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_default();
        rest = &rest[end + designator.len_utf8()..];

        let (whole, fraction) = match number.split_once('.') {
            Some((w, f)) if allow_fraction => (w, f),
            Some(_) => return Err(invalid(input, "fractions are only allowed on seconds")),
            None => (number, ""),
        };
        if whole.is_empty() || fraction.len() > 9 {
            return Err(invalid(input, "malformed number"));
        }
        let whole: u64 = whole
            .parse()
            .map_err(|_| invalid(input, "value out of range"))?;
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let digits: i64 = fraction
                .parse()
                .map_err(|_| invalid(input, "malformed fraction"))?;
            digits * 10i64.pow(9 - fraction.len() as u32)
        };
        out.push((
            IsoAmount {
                whole,
                fraction_nanos,
            },
            designator,
        ));
    }
    Ok(out)
}

fn invalid(input: &str, reason: &str) -> TypeError {
    TypeError::Duration {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(months: i32, days: i32, nanos: i64) -> CalendarDuration {
        CalendarDuration::new(months, days, nanos).unwrap()
    }

    #[test]
    fn parse_compact_units() {
        assert_eq!(
            CalendarDuration::parse("1y2mo3w4d5h6m7s8ms9us10ns").unwrap(),
            d(
                14,
                25,
                5 * NANOS_PER_HOUR
                    + 6 * NANOS_PER_MINUTE
                    + 7 * NANOS_PER_SECOND
                    + 8 * NANOS_PER_MILLI
                    + 9 * NANOS_PER_MICRO
                    + 10
            )
        );
        assert_eq!(CalendarDuration::parse("90M").unwrap(), d(0, 0, 90 * NANOS_PER_MINUTE));
        assert_eq!(CalendarDuration::parse("3µs").unwrap(), d(0, 0, 3_000));
    }

    #[test]
    fn parse_negative() {
        let neg = CalendarDuration::parse("-1d12h").unwrap();
        assert_eq!(neg, d(0, -1, -12 * NANOS_PER_HOUR));
        assert!(neg.is_negative());
    }

    #[test]
    fn parse_iso_forms() {
        assert_eq!(
            CalendarDuration::parse("P1Y2M3DT4H5M6.5S").unwrap(),
            d(
                14,
                3,
                4 * NANOS_PER_HOUR + 5 * NANOS_PER_MINUTE + 6 * NANOS_PER_SECOND + 500_000_000
            )
        );
        assert_eq!(CalendarDuration::parse("P2W").unwrap(), d(0, 14, 0));
        assert_eq!(CalendarDuration::parse("-PT1M").unwrap(), d(0, 0, -NANOS_PER_MINUTE));
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "-", "5", "h", "1h1d", "1h1h", "1x", "P", "PT", "P1.5D", "PT1.5H"] {
            assert!(CalendarDuration::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn rejects_mixed_signs() {
        assert_eq!(CalendarDuration::new(1, -1, 0), Err(TypeError::MixedSigns));
    }

    #[test]
    fn display_compact() {
        assert_eq!(CalendarDuration::default().to_string(), "0s");
        assert_eq!(d(14, 3, NANOS_PER_HOUR + 1).to_string(), "1y2mo3d1h1ns");
        assert_eq!(d(0, -2, -NANOS_PER_MILLI).to_string(), "-2d1ms");
    }

    #[test]
    fn from_std_duration() {
        let dur = CalendarDuration::from_std(std::time::Duration::from_millis(1500)).unwrap();
        assert_eq!(dur.to_string(), "1s500ms");
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(
            months in 0i32..=i32::MAX,
            days in 0i32..=i32::MAX,
            nanos in 0i64..=i64::MAX,
            negative: bool,
        ) {
            let dur = if negative {
                d(-months, -days, -nanos)
            } else {
                d(months, days, nanos)
            };
            prop_assert_eq!(CalendarDuration::parse(&dur.to_string()).unwrap(), dur);
        }
    }
}
