//! Raw ↔ physical conversion of signal values.
//!
//! `physical = raw * scale + offset`. Whenever scale and offset have a short decimal
//! representation they are also kept as integers over a common power of ten, so the
//! conversion runs in integer arithmetic and integral cases never drift.

use serde::{Deserialize, Serialize};

use crate::codec::layout::{sign_extend, value_mask};
use crate::types::{
    errors::EncodeError,
    signal::Signal,
    value::{NamedSignalValue, SignalValue},
};

/// Largest power of ten used for the exact representation.
const MAX_EXPONENT: u32 = 18;

/// Linear conversion of a signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "LinearRepr", into = "LinearRepr")]
pub struct Conversion {
    scale: f64,
    offset: f64,
    exact: Option<ExactLinear>,
}

/// `physical = (raw * scale + offset) / 10^exponent`, all integers.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ExactLinear {
    scale: i128,
    offset: i128,
    exponent: u32,
}

#[derive(Clone, Serialize, Deserialize)]
struct LinearRepr {
    scale: f64,
    offset: f64,
}

impl From<LinearRepr> for Conversion {
    fn from(repr: LinearRepr) -> Self {
        Conversion::linear(repr.scale, repr.offset)
    }
}

impl From<Conversion> for LinearRepr {
    fn from(conversion: Conversion) -> Self {
        LinearRepr {
            scale: conversion.scale,
            offset: conversion.offset,
        }
    }
}

impl Default for Conversion {
    fn default() -> Self {
        Conversion::identity()
    }
}

/// Raw field content, before it is packed into (or after it is read from) the payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawValue {
    Int(i128),
    Float(f64),
}

impl RawValue {
    /// Bit pattern of the value as stored in a field of `length` bits.
    pub(crate) fn to_bits(self, length: u32) -> u64 {
        match self {
            RawValue::Int(v) => (v as u64) & value_mask(length),
            RawValue::Float(f) if length == 32 => (f as f32).to_bits() as u64,
            RawValue::Float(f) => f.to_bits(),
        }
    }
}

impl Conversion {
    pub fn identity() -> Self {
        Conversion::linear(1.0, 0.0)
    }

    pub fn linear(scale: f64, offset: f64) -> Self {
        Conversion {
            scale,
            offset,
            exact: ExactLinear::from_floats(scale, offset),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// `true` when scale and offset are both integers.
    pub fn is_integral(&self) -> bool {
        matches!(self.exact, Some(ExactLinear { exponent: 0, .. }))
    }

    /// Scales an integer raw value.
    pub fn raw_to_scaled(&self, raw: i128) -> SignalValue {
        if let Some(exact) = self.exact
            && let Some(numerator) = raw
                .checked_mul(exact.scale)
                .and_then(|v| v.checked_add(exact.offset))
        {
            if exact.exponent == 0 {
                return SignalValue::Integer(numerator);
            }
            return SignalValue::Float(numerator as f64 / 10f64.powi(exact.exponent as i32));
        }
        SignalValue::Float(raw as f64 * self.scale + self.offset)
    }

    /// Scales a float raw value (IEEE float signals).
    pub fn float_to_scaled(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    /// Inverse conversion of a numeric physical value to an integer raw value,
    /// rounded half away from zero.
    pub fn scaled_to_raw(&self, value: &SignalValue) -> Option<i128> {
        let physical: ExactNumber = ExactNumber::of(value)?;
        if let (Some(exact), ExactNumber::Decimal(mantissa, exponent)) = (self.exact, physical)
            && let Some(raw) = exact.invert(mantissa, exponent)
        {
            return Some(raw);
        }
        let scaled: f64 = (value.as_f64()? - self.offset) / self.scale;
        scaled
            .is_finite()
            .then(|| scaled.round())
            .filter(|r| r.abs() < 1.7e38)
            .map(|r| r as i128)
    }

    /// Inverse conversion for float signals; no rounding.
    pub fn scaled_to_float(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

impl ExactLinear {
    fn from_floats(scale: f64, offset: f64) -> Option<Self> {
        if scale == 0.0 {
            return None;
        }
        let (scale_mantissa, scale_exponent) = decimal_parts(scale)?;
        let (offset_mantissa, offset_exponent) = decimal_parts(offset)?;
        let exponent: u32 = scale_exponent.max(offset_exponent);
        Some(ExactLinear {
            scale: scale_mantissa.checked_mul(pow10(exponent - scale_exponent)?)?,
            offset: offset_mantissa.checked_mul(pow10(exponent - offset_exponent)?)?,
            exponent,
        })
    }

    /// `raw = (value*10^e - offset) / scale` for `value = mantissa / 10^value_exponent`.
    fn invert(&self, mantissa: i128, value_exponent: u32) -> Option<i128> {
        let exponent: u32 = self.exponent.max(value_exponent);
        let value: i128 = mantissa.checked_mul(pow10(exponent - value_exponent)?)?;
        let widen: i128 = pow10(exponent - self.exponent)?;
        let numerator: i128 = value.checked_sub(self.offset.checked_mul(widen)?)?;
        let denominator: i128 = self.scale.checked_mul(widen)?;
        Some(div_round_half_away(numerator, denominator))
    }
}

/// Numeric input reduced to an integer mantissa over a power of ten when possible.
#[derive(Clone, Copy, Debug)]
enum ExactNumber {
    Decimal(i128, u32),
    Inexact,
}

impl ExactNumber {
    fn of(value: &SignalValue) -> Option<Self> {
        match value {
            SignalValue::Integer(v) => Some(ExactNumber::Decimal(*v, 0)),
            SignalValue::Named(named) => Some(ExactNumber::Decimal(named.value as i128, 0)),
            SignalValue::Float(f) if f.is_finite() => Some(
                decimal_parts(*f)
                    .map(|(m, e)| ExactNumber::Decimal(m, e))
                    .unwrap_or(ExactNumber::Inexact),
            ),
            SignalValue::Float(_) | SignalValue::Choice(_) => None,
        }
    }
}

/// Splits the shortest decimal representation of `value` into `(mantissa, exponent)`
/// so that `value == mantissa / 10^exponent`.
fn decimal_parts(value: f64) -> Option<(i128, u32)> {
    if !value.is_finite() {
        return None;
    }
    let text: String = format!("{value}");
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let exponent: u32 = frac_part.len() as u32;
    if exponent > MAX_EXPONENT || int_part.len() + frac_part.len() > 36 {
        return None;
    }
    let mut mantissa: i128 = 0;
    for ch in int_part.chars().chain(frac_part.chars()) {
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(ch.to_digit(10)? as i128)?;
    }
    Some((if negative { -mantissa } else { mantissa }, exponent))
}

fn pow10(exponent: u32) -> Option<i128> {
    10i128.checked_pow(exponent)
}

fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient: i128 = numerator / denominator;
    let remainder: i128 = numerator % denominator;
    if remainder != 0 && 2 * remainder.unsigned_abs() >= denominator.unsigned_abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

/// Context used to name the offending message in encode errors.
pub(crate) struct EncodeContext<'a> {
    pub message: &'a str,
    pub scaling: bool,
    pub strict: bool,
}

/// Converts an input value to the raw content of `signal`'s field.
///
/// Choices bypass scaling and range checks; numeric values are range-checked against
/// `minimum`/`maximum` under strict mode and always against the field capacity.
pub(crate) fn encode_value(
    signal: &Signal,
    value: &SignalValue,
    ctx: &EncodeContext<'_>,
) -> Result<RawValue, EncodeError> {
    if let Some(name) = value.choice_name() {
        let raw: i64 = signal
            .choices
            .as_ref()
            .and_then(|choices| choices.value_of(name))
            .or(match value {
                SignalValue::Named(named) => Some(named.value),
                _ => None,
            })
            .ok_or_else(|| EncodeError::UnknownChoice {
                message: ctx.message.to_string(),
                signal: signal.name.clone(),
                choice: name.to_string(),
            })?;
        return check_capacity(signal, RawValue::Int(raw as i128), ctx);
    }

    if ctx.strict {
        check_physical_range(signal, value, ctx)?;
    }

    let invalid = || EncodeError::InvalidValue {
        message: ctx.message.to_string(),
        signal: signal.name.clone(),
        value: value.to_string(),
    };

    let raw: RawValue = if signal.is_float {
        let number: f64 = value.as_f64().ok_or_else(invalid)?;
        if ctx.scaling {
            RawValue::Float(signal.conversion.scaled_to_float(number))
        } else {
            RawValue::Float(number)
        }
    } else if ctx.scaling {
        RawValue::Int(signal.conversion.scaled_to_raw(value).ok_or_else(invalid)?)
    } else {
        RawValue::Int(value.as_i128().ok_or_else(invalid)?)
    };

    check_capacity(signal, raw, ctx)
}

fn check_physical_range(
    signal: &Signal,
    value: &SignalValue,
    ctx: &EncodeContext<'_>,
) -> Result<(), EncodeError> {
    let Some(number) = value.as_f64() else {
        return Ok(());
    };
    // bounds are physical; compare against the physical value
    let physical: f64 = if ctx.scaling {
        number
    } else if signal.is_float {
        signal.conversion.float_to_scaled(number)
    } else {
        match value.as_i128() {
            Some(raw) => signal.conversion.raw_to_scaled(raw).as_f64().unwrap_or(number),
            None => number,
        }
    };
    if let Some(minimum) = signal.minimum
        && physical < minimum
    {
        return Err(EncodeError::BelowMinimum {
            message: ctx.message.to_string(),
            signal: signal.name.clone(),
            minimum,
            value: value.to_string(),
        });
    }
    if let Some(maximum) = signal.maximum
        && physical > maximum
    {
        return Err(EncodeError::AboveMaximum {
            message: ctx.message.to_string(),
            signal: signal.name.clone(),
            maximum,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Rejects raw integers that do not fit the field, signed or unsigned.
fn check_capacity(
    signal: &Signal,
    raw: RawValue,
    ctx: &EncodeContext<'_>,
) -> Result<RawValue, EncodeError> {
    if let RawValue::Int(value) = raw {
        let (lowest, highest) = signal.raw_capacity();
        if value < lowest || value > highest {
            return Err(EncodeError::RawValueOverflow {
                message: ctx.message.to_string(),
                signal: signal.name.clone(),
                raw: value.to_string(),
                bits: signal.length,
            });
        }
    }
    Ok(raw)
}

/// Options of a single decode call, as seen by the value conversion.
#[derive(Clone, Copy)]
pub(crate) struct DecodeContext {
    pub scaling: bool,
    pub decode_choices: bool,
}

/// Interprets the bit pattern of `signal`'s field.
pub(crate) fn raw_from_bits(signal: &Signal, bits: u64) -> RawValue {
    if signal.is_float {
        if signal.length == 32 {
            RawValue::Float(f32::from_bits(bits as u32) as f64)
        } else {
            RawValue::Float(f64::from_bits(bits))
        }
    } else if signal.is_signed {
        RawValue::Int(sign_extend(bits, signal.length) as i128)
    } else {
        RawValue::Int(bits as i128)
    }
}

/// Converts a raw field value into the value reported to the caller.
pub(crate) fn decode_value(signal: &Signal, raw: RawValue, ctx: DecodeContext) -> SignalValue {
    match raw {
        RawValue::Float(f) => {
            if ctx.scaling {
                SignalValue::Float(signal.conversion.float_to_scaled(f))
            } else {
                SignalValue::Float(f)
            }
        }
        RawValue::Int(value) => {
            if ctx.decode_choices
                && let Some(named) = lookup_choice(signal, value)
            {
                return SignalValue::Named(named.clone());
            }
            if ctx.scaling {
                signal.conversion.raw_to_scaled(value)
            } else {
                SignalValue::Integer(value)
            }
        }
    }
}

/// Finds the choice of a raw value; signed fields also try their unsigned bit pattern.
fn lookup_choice(signal: &Signal, value: i128) -> Option<&NamedSignalValue> {
    let choices = signal.choices.as_ref()?;
    if let Ok(key) = i64::try_from(value)
        && let Some(named) = choices.get(key)
    {
        return Some(named);
    }
    if signal.is_signed && value < 0 {
        let unsigned: u64 = (value as u64) & value_mask(signal.length);
        return i64::try_from(unsigned).ok().and_then(|key| choices.get(key));
    }
    None
}
