//! # Simulated Meter Device
//!
//! This module provides the MeterDevice struct, the context object shared by
//! every accepted connection: the immutable captured template telegram, the
//! mutable record set, and the method producing the response telegram for
//! one read request.
//!
//! The template is read-only for the lifetime of the device; responses are
//! always built from a fresh copy. Record mutation and telegram assembly
//! happen behind one mutex, so every request sees a consistent record set
//! even with connection tasks running in parallel.

use crate::error::SimError;
use crate::payload::data_encoding::{
    locate_value_field, patch_value_field, truncate_decimal, ValueFieldLocator,
};
use crate::payload::record::{DataRecord, MeterDescription, SlaveInformation};
use crate::util::hex::decode_hex;
use log::debug;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Selects how the device answers read requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Serve the captured template verbatim, one write per reply.
    Static,
    /// Resample the record set per request and serve a freshly mutated
    /// telegram in chunks.
    Live,
}

/// Represents the simulated meter shared across connections.
#[derive(Debug)]
pub struct MeterDevice {
    slave: SlaveInformation,
    records: Mutex<Vec<DataRecord>>,
    template: Vec<u8>,
    locator: Option<ValueFieldLocator>,
    mode: ResponseMode,
}

impl MeterDevice {
    /// Builds a device from a parsed description and a template telegram.
    ///
    /// In live mode the template must carry the BCD value signature;
    /// refusing to construct the device here is what keeps mutation from
    /// ever writing at an unvalidated offset.
    pub fn new(
        description: MeterDescription,
        template: Vec<u8>,
        mode: ResponseMode,
    ) -> Result<Self, SimError> {
        let locator = match mode {
            ResponseMode::Live => Some(locate_value_field(&template)?),
            ResponseMode::Static => None,
        };

        Ok(MeterDevice {
            slave: description.slave_information,
            records: Mutex::new(description.data_records),
            template,
            locator,
            mode,
        })
    }

    /// Builds a device from raw description JSON and hex telegram text.
    pub fn from_sources(
        description_json: &str,
        telegram_hex: &str,
        mode: ResponseMode,
    ) -> Result<Self, SimError> {
        let description = MeterDescription::from_json(description_json)?;
        let template =
            decode_hex(telegram_hex).map_err(|e| SimError::InvalidTemplate(e.to_string()))?;
        Self::new(description, template, mode)
    }

    /// Builds a device from a description JSON file and a hex telegram file.
    pub fn from_files(
        description_path: &Path,
        telegram_path: &Path,
        mode: ResponseMode,
    ) -> Result<Self, SimError> {
        let description_json = fs::read_to_string(description_path).map_err(|e| {
            SimError::InvalidDescription(format!("{}: {e}", description_path.display()))
        })?;
        let telegram_hex = fs::read_to_string(telegram_path)
            .map_err(|e| SimError::InvalidTemplate(format!("{}: {e}", telegram_path.display())))?;
        Self::from_sources(&description_json, &telegram_hex, mode)
    }

    /// Returns the captured template telegram.
    pub fn template(&self) -> &[u8] {
        &self.template
    }

    /// Returns the response mode.
    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Returns the display-only slave information block.
    pub fn slave_information(&self) -> &SlaveInformation {
        &self.slave
    }

    /// Returns a snapshot of the current record set.
    pub fn records(&self) -> Result<Vec<DataRecord>, SimError> {
        Ok(self.lock_records()?.clone())
    }

    /// Produces the telegram answering one read request.
    ///
    /// Static mode returns a copy of the template. Live mode resamples
    /// every record, then encodes the first record's value into a template
    /// copy and restores the checksum invariant. Later records feed the
    /// metadata display only; the captured telegram carries a single
    /// mutable field.
    pub fn response_telegram(&self) -> Result<Vec<u8>, SimError> {
        match self.mode {
            ResponseMode::Static => Ok(self.template.clone()),
            ResponseMode::Live => self.mutated_telegram(),
        }
    }

    fn mutated_telegram(&self) -> Result<Vec<u8>, SimError> {
        let locator = self.locator.ok_or(SimError::ValueFieldNotFound)?;
        let mut records = self.lock_records()?;

        let mut rng = rand::thread_rng();
        for record in records.iter_mut() {
            record.perturb(&mut rng)?;
            debug!(
                "record [{}] {} ({}) = {}",
                record.id, record.quantity, record.unit, record.value
            );
        }

        let first = records.first().ok_or_else(|| {
            SimError::InvalidDescription("description contains no data records".to_string())
        })?;
        let value = truncate_decimal(&first.value)?;
        patch_value_field(&self.template, &locator, value)
    }

    fn lock_records(&self) -> Result<std::sync::MutexGuard<'_, Vec<DataRecord>>, SimError> {
        self.records
            .lock()
            .map_err(|_| SimError::Other("record set lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TEMPLATE_VALUE_DIF, TEMPLATE_VALUE_VIF};
    use crate::payload::data_encoding::{decode_bcd4, long_frame_checksum};

    fn description(unit: &str, value: &str) -> MeterDescription {
        MeterDescription {
            slave_information: SlaveInformation {
                id: "12345678".to_string(),
                manufacturer: "ABC".to_string(),
                version: "1".to_string(),
                medium: "Electricity".to_string(),
                access_number: "1".to_string(),
                status: "00".to_string(),
                signature: "0000".to_string(),
            },
            data_records: vec![DataRecord {
                id: 0,
                quantity: "Energy".to_string(),
                unit: unit.to_string(),
                value: value.to_string(),
            }],
        }
    }

    fn template_with_signature() -> Vec<u8> {
        let mut telegram = vec![0u8; 30];
        telegram[0] = 0x68;
        telegram[1] = 24;
        telegram[2] = 24;
        telegram[3] = 0x68;
        telegram[20] = TEMPLATE_VALUE_DIF;
        telegram[21] = TEMPLATE_VALUE_VIF;
        telegram[29] = 0x16;
        telegram
    }

    #[test]
    fn test_live_mode_requires_signature() {
        let no_signature = vec![0u8; 30];
        assert!(
            MeterDevice::new(description("Wh", "1.0"), no_signature.clone(), ResponseMode::Live)
                .is_err()
        );
        // Static mode never touches the value field
        assert!(
            MeterDevice::new(description("Wh", "1.0"), no_signature, ResponseMode::Static).is_ok()
        );
    }

    #[test]
    fn test_static_mode_serves_template_verbatim() {
        let template = template_with_signature();
        let device =
            MeterDevice::new(description("Wh", "1.0"), template.clone(), ResponseMode::Static)
                .unwrap();
        assert_eq!(device.response_telegram().unwrap(), template);
        assert_eq!(device.response_telegram().unwrap(), template);
    }

    #[test]
    fn test_live_mode_upholds_checksum_invariant() {
        let device = MeterDevice::new(
            description("Wh", "00001234"),
            template_with_signature(),
            ResponseMode::Live,
        )
        .unwrap();

        let telegram = device.response_telegram().unwrap();
        let checksum_pos = telegram.len() - 2;
        assert_eq!(telegram[checksum_pos], long_frame_checksum(&telegram));

        let mut field = [0u8; 4];
        field.copy_from_slice(&telegram[22..26]);
        let value = decode_bcd4(&field).unwrap();
        // 0-2% upward drift, truncated
        assert!((1234..=1258).contains(&value), "value out of band: {value}");
    }

    #[test]
    fn test_live_mode_advances_records_per_request() {
        let device = MeterDevice::new(
            description("Wh", "1000.000000"),
            template_with_signature(),
            ResponseMode::Live,
        )
        .unwrap();

        device.response_telegram().unwrap();
        let after_one = device.records().unwrap()[0].value_f64().unwrap();
        assert!(after_one >= 1000.0);

        device.response_telegram().unwrap();
        let after_two = device.records().unwrap()[0].value_f64().unwrap();
        assert!(after_two >= after_one);
    }
}
