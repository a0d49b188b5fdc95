//! Order-preserving binary encoding of values and tuples.
//!
//! Every encoding begins with a one-byte type tag; tags ascend in the same
//! order as [`Value`]'s kind rank, so unsigned byte-lexicographic order of
//! encoded runs equals semantic order across kinds as well as within one.
//! Each run is self-delimiting (fixed width, or terminated), so tuple
//! encodings concatenate without creating spurious prefix relations.
//!
//! # Encoding Format
//!
//! - `Null`: tag only
//! - `Boolean`: 1 byte, 0 or 1
//! - `BigInt`: 8 bytes, sign bit flipped, big-endian
//! - `Double`: 8 bytes, monotone IEEE-754 transform (negative payloads
//!   complemented, sign bit flipped); NaN is rejected at encode time
//! - `Decimal`: sign byte, order-preserving exponent, one byte per
//!   significant digit, terminator (all complemented for negatives)
//! - `String` / `Bytes`: payload with 0x00 escaped as 0x00 0xFF,
//!   terminated by 0x00 0x00
//! - `Uuid`: 16 raw bytes
//!
//! 0x00 and 0xFF never begin an encoding; they are the low and high edge
//! sentinels appended by range construction.

use grove_common::constants::MAX_DECIMAL_DIGITS;
use grove_common::error::{GroveError, GroveResult};
use uuid::Uuid;

use crate::decimal::Decimal;
use crate::tuple::Tuple;
use crate::value::Value;

/// Sentinel byte sorting before every value encoding.
pub const EDGE_LOW: u8 = 0x00;
/// Sentinel byte sorting after every value encoding.
pub const EDGE_HIGH: u8 = 0xFF;

const TAG_NULL: u8 = 0x01;
const TAG_BOOLEAN: u8 = 0x02;
const TAG_BIGINT: u8 = 0x03;
const TAG_DOUBLE: u8 = 0x04;
const TAG_DECIMAL: u8 = 0x05;
const TAG_STRING: u8 = 0x06;
const TAG_BYTES: u8 = 0x07;
const TAG_UUID: u8 = 0x08;

const SIGN_FLIP: u64 = 1 << 63;

const DECIMAL_NEGATIVE: u8 = 0x00;
const DECIMAL_ZERO: u8 = 0x01;
const DECIMAL_POSITIVE: u8 = 0x02;

/// Encodes a value into a fresh buffer.
pub fn encode_value(value: &Value) -> GroveResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(16);
    encode_value_into(value, &mut buf)?;
    Ok(buf)
}

/// Appends the encoding of a value to `buf`.
pub fn encode_value_into(value: &Value, buf: &mut Vec<u8>) -> GroveResult<()> {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(u8::from(*b));
        }
        Value::BigInt(i) => {
            buf.push(TAG_BIGINT);
            buf.extend_from_slice(&((*i as u64) ^ SIGN_FLIP).to_be_bytes());
        }
        Value::Double(f) => {
            if f.is_nan() {
                return Err(GroveError::encoding(
                    "NaN is unordered and cannot appear in a key",
                ));
            }
            buf.push(TAG_DOUBLE);
            buf.extend_from_slice(&double_to_ordered_bits(*f).to_be_bytes());
        }
        Value::Decimal(d) => {
            buf.push(TAG_DECIMAL);
            encode_decimal_into(d, buf)?;
        }
        Value::String(s) => {
            buf.push(TAG_STRING);
            encode_terminated_into(s.as_bytes(), buf);
        }
        Value::Bytes(b) => {
            buf.push(TAG_BYTES);
            encode_terminated_into(b, buf);
        }
        Value::Uuid(u) => {
            buf.push(TAG_UUID);
            buf.extend_from_slice(u.as_bytes());
        }
    }
    Ok(())
}

/// Decodes one value starting at `offset`. Returns the value and the
/// number of bytes consumed. Never panics on malformed input.
pub fn decode_value(bytes: &[u8], offset: usize) -> GroveResult<(Value, usize)> {
    let tag = *bytes
        .get(offset)
        .ok_or_else(|| GroveError::decoding(offset, "missing type tag"))?;
    match tag {
        TAG_NULL => Ok((Value::Null, 1)),
        TAG_BOOLEAN => {
            let byte = *bytes
                .get(offset + 1)
                .ok_or_else(|| GroveError::decoding(offset, "truncated boolean"))?;
            match byte {
                0 => Ok((Value::Boolean(false), 2)),
                1 => Ok((Value::Boolean(true), 2)),
                other => Err(GroveError::decoding(
                    offset + 1,
                    format!("invalid boolean payload {other}"),
                )),
            }
        }
        TAG_BIGINT => {
            let raw = read_u64(bytes, offset + 1, "bigint")?;
            Ok((Value::BigInt((raw ^ SIGN_FLIP) as i64), 9))
        }
        TAG_DOUBLE => {
            let raw = read_u64(bytes, offset + 1, "double")?;
            let value = ordered_bits_to_double(raw);
            if value.is_nan() {
                return Err(GroveError::decoding(offset + 1, "NaN is never encoded"));
            }
            Ok((Value::Double(value), 9))
        }
        TAG_DECIMAL => {
            let (decimal, consumed) = decode_decimal(bytes, offset + 1)?;
            Ok((Value::Decimal(decimal), consumed + 1))
        }
        TAG_STRING => {
            let (payload, consumed) = decode_terminated(bytes, offset + 1)?;
            let text = String::from_utf8(payload).map_err(|e| {
                GroveError::decoding(offset + 1, format!("invalid UTF-8 in string payload: {e}"))
            })?;
            Ok((Value::String(text), consumed + 1))
        }
        TAG_BYTES => {
            let (payload, consumed) = decode_terminated(bytes, offset + 1)?;
            Ok((Value::Bytes(payload), consumed + 1))
        }
        TAG_UUID => {
            let end = offset + 17;
            if bytes.len() < end {
                return Err(GroveError::decoding(offset + 1, "truncated uuid"));
            }
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&bytes[offset + 1..end]);
            Ok((Value::Uuid(Uuid::from_bytes(raw)), 17))
        }
        other => Err(GroveError::decoding(
            offset,
            format!("unknown type tag {other:#04x}"),
        )),
    }
}

/// Encodes a tuple into a fresh buffer.
pub fn encode_tuple(tuple: &Tuple) -> GroveResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(tuple.len() * 12);
    encode_tuple_into(tuple, &mut buf)?;
    Ok(buf)
}

/// Appends the encoding of every tuple element to `buf`, in order.
pub fn encode_tuple_into(tuple: &Tuple, buf: &mut Vec<u8>) -> GroveResult<()> {
    for value in tuple.iter() {
        encode_value_into(value, buf)?;
    }
    Ok(())
}

/// Decodes a tuple by consuming the input to exhaustion.
pub fn decode_tuple(bytes: &[u8]) -> GroveResult<Tuple> {
    let mut values = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (value, consumed) = decode_value(bytes, offset)?;
        values.push(value);
        offset += consumed;
    }
    Ok(Tuple::new(values))
}

/// Decodes exactly `count` elements starting at `offset`. Returns the
/// tuple and the number of bytes consumed.
pub fn decode_tuple_prefix(
    bytes: &[u8],
    offset: usize,
    count: usize,
) -> GroveResult<(Tuple, usize)> {
    let mut values = Vec::with_capacity(count);
    let mut cursor = offset;
    for _ in 0..count {
        let (value, consumed) = decode_value(bytes, cursor)?;
        values.push(value);
        cursor += consumed;
    }
    Ok((Tuple::new(values), cursor - offset))
}

// =============================================================================
// Double transform
// =============================================================================

fn double_to_ordered_bits(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & SIGN_FLIP != 0 {
        !bits
    } else {
        bits ^ SIGN_FLIP
    }
}

fn ordered_bits_to_double(ordered: u64) -> f64 {
    if ordered & SIGN_FLIP != 0 {
        f64::from_bits(ordered ^ SIGN_FLIP)
    } else {
        f64::from_bits(!ordered)
    }
}

// =============================================================================
// Terminated byte runs (String / Bytes payloads)
// =============================================================================

fn encode_terminated_into(payload: &[u8], buf: &mut Vec<u8>) {
    for &byte in payload {
        buf.push(byte);
        if byte == 0x00 {
            // escape so the payload can never contain the terminator
            buf.push(0xFF);
        }
    }
    buf.push(0x00);
    buf.push(0x00);
}

fn decode_terminated(bytes: &[u8], start: usize) -> GroveResult<(Vec<u8>, usize)> {
    let mut payload = Vec::new();
    let mut cursor = start;
    loop {
        let byte = *bytes
            .get(cursor)
            .ok_or_else(|| GroveError::decoding(cursor, "unterminated byte run"))?;
        if byte != 0x00 {
            payload.push(byte);
            cursor += 1;
            continue;
        }
        let next = *bytes
            .get(cursor + 1)
            .ok_or_else(|| GroveError::decoding(cursor + 1, "truncated terminator"))?;
        match next {
            0x00 => return Ok((payload, cursor + 2 - start)),
            0xFF => {
                payload.push(0x00);
                cursor += 2;
            }
            other => {
                return Err(GroveError::decoding(
                    cursor + 1,
                    format!("invalid escape byte {other:#04x}"),
                ));
            }
        }
    }
}

// =============================================================================
// Decimal runs
// =============================================================================

fn encode_decimal_into(decimal: &Decimal, buf: &mut Vec<u8>) -> GroveResult<()> {
    let (exponent, digits) = decimal.magnitude_parts();
    if digits.len() > MAX_DECIMAL_DIGITS as usize {
        return Err(GroveError::encoding(format!(
            "decimal exceeds {MAX_DECIMAL_DIGITS} significant digits"
        )));
    }
    match decimal.signum() {
        0 => buf.push(DECIMAL_ZERO),
        1 => {
            buf.push(DECIMAL_POSITIVE);
            buf.extend_from_slice(&((exponent as u16) ^ 0x8000).to_be_bytes());
            for digit in digits {
                buf.push(digit + 1);
            }
            buf.push(0x00);
        }
        _ => {
            buf.push(DECIMAL_NEGATIVE);
            buf.extend_from_slice(&(!((exponent as u16) ^ 0x8000)).to_be_bytes());
            for digit in digits {
                buf.push(0x0A - digit);
            }
            buf.push(0xFF);
        }
    }
    Ok(())
}

fn decode_decimal(bytes: &[u8], start: usize) -> GroveResult<(Decimal, usize)> {
    let sign = *bytes
        .get(start)
        .ok_or_else(|| GroveError::decoding(start, "missing decimal sign byte"))?;
    if sign == DECIMAL_ZERO {
        return Ok((Decimal::ZERO, 1));
    }
    let negative = match sign {
        DECIMAL_NEGATIVE => true,
        DECIMAL_POSITIVE => false,
        other => {
            return Err(GroveError::decoding(
                start,
                format!("invalid decimal sign byte {other:#04x}"),
            ));
        }
    };
    if bytes.len() < start + 3 {
        return Err(GroveError::decoding(start + 1, "truncated decimal exponent"));
    }
    let raw = u16::from_be_bytes([bytes[start + 1], bytes[start + 2]]);
    let exponent = if negative {
        ((!raw) ^ 0x8000) as i16
    } else {
        (raw ^ 0x8000) as i16
    };
    let terminator = if negative { 0xFF } else { 0x00 };
    let mut digits = Vec::new();
    let mut cursor = start + 3;
    loop {
        let byte = *bytes
            .get(cursor)
            .ok_or_else(|| GroveError::decoding(cursor, "unterminated decimal digits"))?;
        cursor += 1;
        if byte == terminator {
            break;
        }
        if !(0x01..=0x0A).contains(&byte) {
            return Err(GroveError::decoding(
                cursor - 1,
                format!("invalid decimal digit byte {byte:#04x}"),
            ));
        }
        digits.push(if negative { 0x0A - byte } else { byte - 1 });
    }
    if digits.is_empty() {
        return Err(GroveError::decoding(cursor, "decimal with no digits"));
    }
    Decimal::from_magnitude_parts(negative, exponent, &digits)
        .map(|decimal| (decimal, cursor - start))
        .ok_or_else(|| GroveError::decoding(start, "decimal magnitude out of range"))
}

// =============================================================================
// Fixed-width reads
// =============================================================================

fn read_u64(bytes: &[u8], start: usize, what: &str) -> GroveResult<u64> {
    let end = start + 8;
    if bytes.len() < end {
        return Err(GroveError::decoding(start, format!("truncated {what}")));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[start..end]);
    Ok(u64::from_be_bytes(raw))
}
