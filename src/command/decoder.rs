// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text command decoder.
//!
//! Decoding is stateless and total: every input yields either a [`Command`]
//! or a [`DecodeError`], never a panic. Numeric fields are read the way
//! legacy senders expect, leniently: leading whitespace and a sign are
//! accepted, digits are consumed up to the first non-digit, and a field with
//! no digits reads as zero.

use crate::command::{Command, CommandType};
use crate::error::DecodeError;
use crate::types::SpeedCode;

/// Marker every text command starts with.
pub const COMMAND_MARKER: &str = "DMX";

/// Field separator.
const SEPARATOR: char = '#';

/// Minimum length: marker plus type letter.
const MIN_LEN: usize = COMMAND_MARKER.len() + 1;

/// Decodes one text command.
///
/// # Errors
///
/// - [`DecodeError::TooShort`] if the text is under four bytes
/// - [`DecodeError::BadMarker`] if it does not start with `DMX`
/// - [`DecodeError::UnknownType`] if the type letter is not `C`, `P`, `R`, `W` or `L`
/// - [`DecodeError::MissingValue`] if no value field follows the channel
///
/// # Examples
///
/// ```
/// use udp2dmx::command::{decode, CommandType};
/// use udp2dmx::error::DecodeError;
///
/// let cmd = decode("DMXC12#200").unwrap();
/// assert_eq!(cmd.command_type(), CommandType::Channel);
/// assert_eq!(cmd.channel(), 12);
/// assert_eq!(cmd.raw_value(), 200);
/// assert!(cmd.speed().is_instant());
///
/// assert_eq!(decode("DMXC12"), Err(DecodeError::MissingValue));
/// ```
pub fn decode(text: &str) -> Result<Command, DecodeError> {
    if text.len() < MIN_LEN {
        return Err(DecodeError::TooShort(text.len()));
    }
    let Some(body) = text.strip_prefix(COMMAND_MARKER) else {
        return Err(DecodeError::BadMarker);
    };

    // body is non-empty because of the length check
    let code = body.chars().next().ok_or(DecodeError::TooShort(text.len()))?;
    let command_type = CommandType::from_code(code).ok_or(DecodeError::UnknownType(code))?;

    // Empty fields are skipped, so "C1##20" reads like "C1#20".
    let mut fields = body.split(SEPARATOR).filter(|field| !field.is_empty());
    let head = fields.next().ok_or(DecodeError::MissingValue)?;
    let value = fields.next().ok_or(DecodeError::MissingValue)?;
    let speed = fields.next().map_or(SpeedCode::INSTANT, |s| SpeedCode::new(parse_int(s)));

    let channel = parse_int(&head[code.len_utf8()..]);
    let command = Command::new(command_type, channel, parse_int(value)).with_speed(speed);

    tracing::trace!(%command, "Decoded command");
    Ok(command)
}

/// Reads a leading decimal integer, saturating at the `i32` bounds.
fn parse_int(field: &str) -> i32 {
    let field = field.trim_start();
    let (negative, digits) = match field.as_bytes().first() {
        Some(b'-') => (true, &field[1..]),
        Some(b'+') => (false, &field[1..]),
        _ => (false, field),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_i64, |acc, digit| {
            (acc * 10 + i64::from(digit - b'0')).min(i64::from(i32::MAX) + 1)
        });

    let signed = if negative { -magnitude } else { magnitude };
    #[allow(clippy::cast_possible_truncation)]
    let value = signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    value
}
