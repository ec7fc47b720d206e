//! M-Bus Protocol Constants
//!
//! Frame markers, control codes, and simulator defaults shared by the
//! server and client halves of the crate.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Frame markers
// ----------------------------------------------------------------------------

/// Start byte of a 5-byte short frame
pub const MBUS_FRAME_SHORT_START: u8 = 0x10;

/// Start byte of a variable-length long frame
pub const MBUS_FRAME_LONG_START: u8 = 0x68;

/// Stop byte terminating short and long frames
pub const MBUS_FRAME_STOP: u8 = 0x16;

/// Single-byte positive acknowledgement
pub const MBUS_FRAME_ACK: u8 = 0xE5;

/// Fixed size of a short frame on the wire
pub const MBUS_SHORT_FRAME_SIZE: usize = 5;

/// A long frame occupies `6 + L` bytes, where `L` is the declared length
/// field at offset 1.
pub const MBUS_LONG_FRAME_OVERHEAD: usize = 6;

/// Smallest byte count at which a long frame can be classified
pub const MBUS_LONG_FRAME_MIN_SIZE: usize = 7;

// ----------------------------------------------------------------------------
// Control codes
// ----------------------------------------------------------------------------

// Short-frame request control bytes accepted by the device (REQ_UD family)
pub const MBUS_CONTROL_REQ_UD2: u8 = 0x5B;
pub const MBUS_CONTROL_REQ_UD2_ALT: u8 = 0x5D;

// Long-frame dispatch codes that select a data read. Anything else in the
// dispatch position gets an acknowledgement only.
pub const MBUS_CONTROL_REQ_CLASS1: u8 = 0x05;
pub const MBUS_CONTROL_REQ_CLASS2: u8 = 0x09;

/// Offset of the dispatch control byte inside a long frame
pub const MBUS_LONG_FRAME_CONTROL_OFFSET: usize = 6;

/// Offset of the address byte inside a long frame
pub const MBUS_LONG_FRAME_ADDRESS_OFFSET: usize = 5;

/// Highest primary address a read request may target
pub const MBUS_MAX_PRIMARY_ADDRESS: u8 = 250;

// ----------------------------------------------------------------------------
// Template telegram layout
// ----------------------------------------------------------------------------

/// Bytes of fixed header preceding the first data record in the captured
/// template telegram
pub const TEMPLATE_HEADER_LEN: usize = 20;

/// DIF byte marking the mutable field as 4-byte BCD
pub const TEMPLATE_VALUE_DIF: u8 = 0x10;

/// VIF byte marking the mutable field as an energy (Wh) value
pub const TEMPLATE_VALUE_VIF: u8 = 0x04;

/// Width of the mutable BCD value field
pub const TEMPLATE_VALUE_LEN: usize = 4;

// ----------------------------------------------------------------------------
// Simulator defaults
// ----------------------------------------------------------------------------

/// Default TCP port the simulated device listens on
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Default size of one transmitted chunk in live mode
pub const DEFAULT_CHUNK_SIZE: usize = 24;

/// Delay between chunks when answering a short-frame request
pub const DEFAULT_SHORT_REPLY_DELAY: Duration = Duration::from_millis(1000);

/// Delay between chunks when answering a long-frame data read
pub const DEFAULT_LONG_REPLY_DELAY: Duration = Duration::from_millis(500);

/// Chunk count after which an induced-fault transmission stops
pub const DEFAULT_ABORT_AFTER_CHUNKS: usize = 3;

/// Client-side idle timeout while waiting for reply chunks
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Primary address the read client targets by default
pub const DEFAULT_PRIMARY_ADDRESS: u8 = 1;
