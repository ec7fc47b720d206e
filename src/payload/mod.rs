//! The payload module contains the meter description model and the
//! byte-level value codec applied to captured telegrams.

pub mod data_encoding;
pub mod record;

pub use data_encoding::{
    decode_bcd4, encode_bcd4, locate_value_field, long_frame_checksum, patch_value_field,
    truncate_decimal, ValueFieldLocator,
};
pub use record::{DataRecord, MeterDescription, SlaveInformation};
