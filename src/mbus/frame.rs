//! # Inbound Frame Classification
//!
//! This module decides what an inbound byte sequence is asking for: a
//! 5-byte short-frame read, a long-frame read, a long frame that only
//! warrants an acknowledgement, or noise. It leverages the `nom` crate for
//! parsing the binary data.
//!
//! Classification is deliberately permissive, matching how the emulated
//! meter behaves on a real bus: request checksums are not validated, and
//! past the dispatch byte no further long-frame structure is inspected.
//! The short-frame request builder lives here as well, so the client and
//! the tests share one definition of the wire format.

use crate::constants::{
    MBUS_CONTROL_REQ_CLASS1, MBUS_CONTROL_REQ_CLASS2, MBUS_CONTROL_REQ_UD2,
    MBUS_CONTROL_REQ_UD2_ALT, MBUS_FRAME_LONG_START, MBUS_FRAME_SHORT_START, MBUS_FRAME_STOP,
    MBUS_MAX_PRIMARY_ADDRESS, MBUS_SHORT_FRAME_SIZE,
};
use crate::error::SimError;
use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::Err as NomErr;
use nom::IResult;

/// Classification of one inbound byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundFrame {
    /// 5-byte short-frame read request (REQ_UD family)
    ShortFrameRequest { control: u8, address: u8 },
    /// Long frame whose dispatch byte selects a data read
    LongFrameRead { control: u8, address: u8 },
    /// Any other long frame; answered with a bare acknowledgement
    LongFrameControl { control: u8, address: u8 },
    /// Anything else; logged by the caller and dropped without a reply
    Unrecognized,
}

/// Classifies an inbound byte sequence.
///
/// Total and deterministic: every input maps to exactly one variant, from
/// nothing but the bytes. Parse failures of either frame grammar collapse
/// into [`InboundFrame::Unrecognized`]; the caller decides whether that is
/// worth a log line.
pub fn classify_frame(input: &[u8]) -> InboundFrame {
    // A short frame is exactly 5 bytes on the wire; anything longer that
    // starts with 0x10 is not a request this device answers.
    if input.len() == MBUS_SHORT_FRAME_SIZE {
        return match parse_short_request(input) {
            Ok((_, frame)) => frame,
            Err(_) => InboundFrame::Unrecognized,
        };
    }
    match parse_long_request(input) {
        Ok((_, frame)) => frame,
        Err(_) => InboundFrame::Unrecognized,
    }
}

/// Parses the 5-byte short-frame request grammar.
///
/// The checksum byte is consumed but not validated (permissive receiver).
fn parse_short_request(input: &[u8]) -> IResult<&[u8], InboundFrame> {
    let (input, start) = be_u8(input)?;
    if start != MBUS_FRAME_SHORT_START {
        return Err(tag_error(input));
    }
    let (input, control) = be_u8(input)?;
    if control != MBUS_CONTROL_REQ_UD2 && control != MBUS_CONTROL_REQ_UD2_ALT {
        return Err(tag_error(input));
    }
    let (input, address) = be_u8(input)?;
    let (input, _checksum) = be_u8(input)?;
    let (input, stop) = be_u8(input)?;
    if stop != MBUS_FRAME_STOP {
        return Err(tag_error(input));
    }
    Ok((input, InboundFrame::ShortFrameRequest { control, address }))
}

/// Parses a long frame far enough to dispatch it.
///
/// Only the start marker, the address byte at offset 5 and the dispatch
/// byte at offset 6 matter; length fields, checksum and stop byte are
/// accepted as received.
fn parse_long_request(input: &[u8]) -> IResult<&[u8], InboundFrame> {
    let (input, start) = be_u8(input)?;
    if start != MBUS_FRAME_LONG_START {
        return Err(tag_error(input));
    }
    // Length fields, repeated start marker, link control byte
    let (input, _header) = take(4usize)(input)?;
    let (input, address) = be_u8(input)?;
    let (input, control) = be_u8(input)?;

    let frame = if control == MBUS_CONTROL_REQ_CLASS1 || control == MBUS_CONTROL_REQ_CLASS2 {
        InboundFrame::LongFrameRead { control, address }
    } else {
        InboundFrame::LongFrameControl { control, address }
    };
    Ok((input, frame))
}

fn tag_error(input: &[u8]) -> NomErr<nom::error::Error<&[u8]>> {
    NomErr::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
}

/// Builds the 5-byte short-frame read request for one primary address.
///
/// The checksum is the mod-256 sum of the control and address bytes.
/// Addresses above 250 are not addressable on the bus and are rejected
/// before any I/O happens.
pub fn build_short_request(
    control: u8,
    address: u8,
) -> Result<[u8; MBUS_SHORT_FRAME_SIZE], SimError> {
    if address > MBUS_MAX_PRIMARY_ADDRESS {
        return Err(SimError::InvalidAddress(address));
    }
    Ok([
        MBUS_FRAME_SHORT_START,
        control,
        address,
        control.wrapping_add(address),
        MBUS_FRAME_STOP,
    ])
}
