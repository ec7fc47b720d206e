//! # Meter Description and Data Records
//!
//! This module models the description document of the simulated meter: the
//! display-only slave information block and the ordered data records whose
//! values drift on every accepted read request.

use crate::error::SimError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Represents one named data record of the simulated meter.
///
/// The unit string selects the perturbation band applied per read. Only
/// the first record of a description is ever encoded back into the binary
/// telegram; later records exist for metadata display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRecord {
    pub id: u32,
    pub quantity: String,
    pub unit: String,
    /// Current value as a decimal string with 6 fractional digits
    pub value: String,
}

/// Display-only identification block of the simulated meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveInformation {
    pub id: String,
    pub manufacturer: String,
    pub version: String,
    pub medium: String,
    pub access_number: String,
    pub status: String,
    pub signature: String,
}

/// Parsed meter description document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterDescription {
    pub slave_information: SlaveInformation,
    pub data_records: Vec<DataRecord>,
}

impl MeterDescription {
    /// Parses a description document from JSON.
    ///
    /// The document must carry at least one data record and every record
    /// value must parse as a decimal number; anything else is fatal before
    /// the device starts serving.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        let description: MeterDescription =
            serde_json::from_str(text).map_err(|e| SimError::InvalidDescription(e.to_string()))?;

        if description.data_records.is_empty() {
            return Err(SimError::InvalidDescription(
                "description contains no data records".to_string(),
            ));
        }
        for record in &description.data_records {
            record.value_f64()?;
        }
        Ok(description)
    }
}

impl DataRecord {
    /// Returns the record value as a float.
    pub fn value_f64(&self) -> Result<f64, SimError> {
        let parsed: f64 = self
            .value
            .trim()
            .parse()
            .map_err(|_| SimError::InvalidRecordValue(self.value.clone()))?;
        if !parsed.is_finite() {
            return Err(SimError::InvalidRecordValue(self.value.clone()));
        }
        Ok(parsed)
    }

    /// Resamples the record value according to its unit.
    ///
    /// Energy readings only ever drift upward (0-2% per read); electrical
    /// quantities wander inside a band around the current value. The
    /// result keeps 6 fractional digits, matching captured meter output.
    pub fn perturb<R: Rng>(&mut self, rng: &mut R) -> Result<(), SimError> {
        let current = self.value_f64()?;
        let factor = perturbation_factor(&self.unit, rng);
        self.value = format!("{:.6}", current * factor);
        Ok(())
    }
}

/// Samples the per-read scaling factor for a unit.
fn perturbation_factor<R: Rng>(unit: &str, rng: &mut R) -> f64 {
    match unit {
        "Wh" => rng.gen_range(1.0..1.02),
        "V" => rng.gen_range(0.95..1.05),
        "A" => rng.gen_range(0.8..1.2),
        "W" => rng.gen_range(0.7..1.3),
        _ => rng.gen_range(0.9..1.1),
    }
}
