//! Kubernetes resource quantities such as `500m`, `1.5Gi` or `2e3`
//!
//! Quantities are held as a signed count of nano-units, so every value the
//! API server accepts round-trips exactly. Fractions of a nano-unit are
//! rounded up.

use super::{CallResult, add, arity, handle, handle_source, string};
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use core::cmp::Ordering;
use core::fmt::{self, Display, Formatter};
use regex::Regex;
use std::sync::LazyLock;

pub(super) const HANDLE_KEY: &str = "@quantity";

const NANOS_PER_UNIT: i128 = 1_000_000_000;

static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)([0-9]+(?:\.[0-9]*)?|\.[0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei|[numkMGTPE]|[eE][+-]?[0-9]+)?$").expect("invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Quantity {
    nanos: i128,
}

impl Quantity {
    fn parse(text: &str) -> Option<Self> {
        let caps = QUANTITY_REGEX.captures(text)?;
        let negative = caps.get(1).is_some_and(|m| m.as_str() == "-");
        let number = caps.get(2)?.as_str();
        let suffix = caps.get(3).map_or("", |m| m.as_str());

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let digits: u128 = format!("{whole}{fraction}").parse().ok()?;
        let fraction_digits = i32::try_from(fraction.len()).ok()?;

        let (binary_power, decimal_exponent) = match suffix {
            "Ki" => (10, 0),
            "Mi" => (20, 0),
            "Gi" => (30, 0),
            "Ti" => (40, 0),
            "Pi" => (50, 0),
            "Ei" => (60, 0),
            "n" => (0, -9),
            "u" => (0, -6),
            "m" => (0, -3),
            "" => (0, 0),
            "k" => (0, 3),
            "M" => (0, 6),
            "G" => (0, 9),
            "T" => (0, 12),
            "P" => (0, 15),
            "E" => (0, 18),
            exponent => (0, exponent.get(1..)?.parse::<i32>().ok()?),
        };

        let scaled = digits.checked_mul(1_u128.checked_shl(binary_power)?)?;
        let exponent = decimal_exponent.checked_add(9)?.checked_sub(fraction_digits)?;
        let magnitude = if exponent >= 0 {
            scaled.checked_mul(10_u128.checked_pow(exponent.unsigned_abs())?)?
        } else {
            let divisor = 10_u128.checked_pow(exponent.unsigned_abs()).unwrap_or(u128::MAX);
            scaled.div_ceil(divisor)
        };

        let nanos = i128::try_from(magnitude).ok()?;
        Some(Self {
            nanos: if negative { -nanos } else { nanos },
        })
    }

    fn from_int(value: i64) -> Self {
        Self {
            nanos: i128::from(value) * NANOS_PER_UNIT,
        }
    }

    const fn is_integer(self) -> bool {
        self.nanos % NANOS_PER_UNIT == 0
    }

    fn as_integer(self) -> Option<i64> {
        if self.is_integer() {
            i64::try_from(self.nanos / NANOS_PER_UNIT).ok()
        } else {
            None
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "the conversion is documented as approximate")]
    fn as_float(self) -> f64 {
        self.nanos as f64 / NANOS_PER_UNIT as f64
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.nanos < 0 { "-" } else { "" };
        let magnitude = self.nanos.unsigned_abs();
        let whole = magnitude / NANOS_PER_UNIT.unsigned_abs();
        let fraction = magnitude % NANOS_PER_UNIT.unsigned_abs();

        if fraction == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let digits = format!("{fraction:09}");
            write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

pub(super) fn register(context: &mut Context<'_>) {
    add(context, "quantity", quantity);
    add(context, "isQuantity", is_quantity);
    add(context, "sign", sign);
    add(context, "isInteger", is_integer);
    add(context, "asInteger", as_integer);
    add(context, "asApproximateFloat", as_approximate_float);
    add(context, "add", |ftx, this, args| arithmetic(ftx, this, args, i128::checked_add));
    add(context, "sub", |ftx, this, args| arithmetic(ftx, this, args, i128::checked_sub));
    add(context, "compareTo", compare_to);
    add(context, "isGreaterThan", |ftx, this, args| {
        Ok(Value::Bool(ordering(ftx, this, args)? == Ordering::Greater))
    });
    add(context, "isLessThan", |ftx, this, args| {
        Ok(Value::Bool(ordering(ftx, this, args)? == Ordering::Less))
    });
}

fn receiver(ftx: &FunctionContext, value: &Value) -> Result<Quantity, ExecutionError> {
    handle_source(value, HANDLE_KEY)
        .and_then(Quantity::parse)
        .ok_or_else(|| ftx.error(format!("expected a quantity, got {value:?}")))
}

fn operand(ftx: &FunctionContext, value: &Value) -> Result<Quantity, ExecutionError> {
    match value {
        Value::Int(i) => Ok(Quantity::from_int(*i)),
        other => receiver(ftx, other),
    }
}

fn quantity(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    let source = string(ftx, this)?;
    match Quantity::parse(source) {
        Some(_) => Ok(handle(HANDLE_KEY, source)),
        None => Err(ftx.error(format!("quantities must match the regular expression '{}'", QUANTITY_REGEX.as_str()))),
    }
}

fn is_quantity(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(Value::Bool(Quantity::parse(string(ftx, this)?).is_some()))
}

fn sign(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(Value::Int(receiver(ftx, this)?.nanos.signum().try_into().unwrap_or_default()))
}

fn is_integer(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(Value::Bool(receiver(ftx, this)?.as_integer().is_some()))
}

fn as_integer(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    receiver(ftx, this)?
        .as_integer()
        .map(Value::Int)
        .ok_or_else(|| ftx.error("cannot convert value to integer"))
}

fn as_approximate_float(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(Value::Float(receiver(ftx, this)?.as_float()))
}

fn arithmetic(ftx: &FunctionContext, this: &Value, args: &[Value], op: fn(i128, i128) -> Option<i128>) -> CallResult {
    arity(args, 1, 1)?;
    let left = receiver(ftx, this)?;
    let right = operand(ftx, &args[0])?;
    let nanos = op(left.nanos, right.nanos).ok_or_else(|| ftx.error("quantity overflow"))?;
    Ok(handle(HANDLE_KEY, &Quantity { nanos }.to_string()))
}

fn ordering(ftx: &FunctionContext, this: &Value, args: &[Value]) -> Result<Ordering, ExecutionError> {
    arity(args, 1, 1)?;
    Ok(receiver(ftx, this)?.cmp(&receiver(ftx, &args[0])?))
}

fn compare_to(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    Ok(Value::Int(match ordering(ftx, this, args)? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::eval;
    use super::*;
    use serde_json::json;

    fn nanos(text: &str) -> Option<i128> {
        Quantity::parse(text).map(|q| q.nanos)
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(nanos("1"), Some(1_000_000_000));
        assert_eq!(nanos("500m"), Some(500_000_000));
        assert_eq!(nanos("1Ki"), Some(1024 * 1_000_000_000));
        assert_eq!(nanos("1.5Gi"), Some(1_610_612_736 * 1_000_000_000));
        assert_eq!(nanos("2k"), Some(2_000 * 1_000_000_000));
        assert_eq!(nanos("1e3"), Some(1_000 * 1_000_000_000));
        assert_eq!(nanos("-0.5"), Some(-500_000_000));
        assert_eq!(nanos("1n"), Some(1));
        assert_eq!(nanos(".5"), Some(500_000_000));
    }

    #[test]
    fn test_fractions_of_a_nano_round_up() {
        assert_eq!(nanos("0.1n"), Some(1));
        assert_eq!(nanos("1e-12"), Some(1));
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        for text in ["", "abc", "1Qi", "1.2.3", "1 Gi", "--1", "1e"] {
            assert_eq!(nanos(text), None, "{text}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity { nanos: 1_500_000_000 }.to_string(), "1.5");
        assert_eq!(Quantity { nanos: -2_000_000_000 }.to_string(), "-2");
        assert_eq!(Quantity { nanos: 1_000_000 }.to_string(), "0.001");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_comparisons() {
        assert_eq!(eval("quantity('1Gi').isGreaterThan(quantity('1G'))"), Ok(json!(true)));
        assert_eq!(eval("quantity('500m').isLessThan(quantity('1'))"), Ok(json!(true)));
        assert_eq!(eval("quantity('1k').compareTo(quantity('1000'))"), Ok(json!(0)));
        assert_eq!(eval("quantity('1Mi').compareTo(quantity('1M'))"), Ok(json!(1)));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_conversions() {
        assert_eq!(eval("quantity('2k').asInteger()"), Ok(json!(2000)));
        assert_eq!(eval("quantity('1.5').isInteger()"), Ok(json!(false)));
        assert_eq!(eval("quantity('250m').asApproximateFloat()"), Ok(json!(0.25)));
        assert_eq!(eval("quantity('-3').sign()"), Ok(json!(-1)));
        let err = eval("quantity('1.5').asInteger()").unwrap_err();
        assert!(err.contains("cannot convert value to integer"), "{err}");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_arithmetic() {
        assert_eq!(eval("quantity('1.5').add(quantity('500m'))"), Ok(json!("2")));
        assert_eq!(eval("quantity('1k').add(24).asInteger()"), Ok(json!(1024)));
        assert_eq!(eval("quantity('1').sub(quantity('250m'))"), Ok(json!("0.75")));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_is_quantity() {
        assert_eq!(eval("isQuantity('100Mi')"), Ok(json!(true)));
        assert_eq!(eval("isQuantity('lots')"), Ok(json!(false)));
        let err = eval("quantity('lots')").unwrap_err();
        assert!(err.contains("quantities must match"), "{err}");
    }
}
