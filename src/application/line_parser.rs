// Line parser - Turns `<group>/<signal>[<unit>]: <value>` into a sample
use crate::domain::error::ParseError;
use crate::domain::telemetry::TelemetrySample;

/// Parse one decoded line. Either a complete sample comes back or nothing does.
///
/// `group` and `signal` may not contain `/`, `[` or `]`; `unit` may not contain `]`.
/// Whitespace around the whole line, the signal name and the value is ignored.
pub fn parse_line(line: &str, timestamp: f64) -> Result<TelemetrySample, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (group, rest) = line
        .split_once('/')
        .ok_or(ParseError::MissingGroupSeparator)?;
    if group.is_empty() {
        return Err(ParseError::EmptyGroup);
    }
    if group.contains(['[', ']']) {
        return Err(ParseError::InvalidGroupCharacter);
    }

    let (signal, rest) = rest.split_once('[').ok_or(ParseError::MissingUnit)?;
    if signal.contains(['/', ']']) {
        return Err(ParseError::InvalidSignalCharacter);
    }
    let signal = signal.trim();
    if signal.is_empty() {
        return Err(ParseError::EmptySignal);
    }

    let (unit, rest) = rest.split_once(']').ok_or(ParseError::MissingUnit)?;
    if unit.is_empty() {
        return Err(ParseError::EmptyUnit);
    }

    let raw_value = rest
        .strip_prefix(':')
        .ok_or(ParseError::MissingValueSeparator)?
        .trim();
    let value = parse_value(raw_value)?;

    Ok(TelemetrySample::new(
        group.to_string(),
        signal.to_string(),
        unit.to_string(),
        value,
        timestamp,
    ))
}

/// Accepts `-?\d+(\.\d+)?([eE][-+]?\d+)?` and nothing else.
fn parse_value(raw: &str) -> Result<f64, ParseError> {
    if !is_decimal_literal(raw) {
        return Err(ParseError::InvalidValue(raw.to_string()));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| ParseError::InvalidValue(raw.to_string()))?;
    if !value.is_finite() {
        return Err(ParseError::NonFiniteValue(raw.to_string()));
    }
    Ok(value)
}

fn is_decimal_literal(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut pos = 0;

    let digits = |pos: &mut usize| {
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
        *pos > start
    };

    if bytes.first() == Some(&b'-') {
        pos += 1;
    }
    if !digits(&mut pos) {
        return false;
    }
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        if !digits(&mut pos) {
            return false;
        }
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        if !digits(&mut pos) {
            return false;
        }
    }
    pos == bytes.len()
}
