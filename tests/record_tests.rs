//! Tests for the meter description model: JSON parsing, validation, and
//! the per-unit perturbation bands.

use mbus_sim::payload::record::{DataRecord, MeterDescription};

fn sample_description_json() -> &'static str {
    r#"{
        "slave_information": {
            "id": "08205037",
            "manufacturer": "ACW",
            "version": "14",
            "medium": "Electricity",
            "access_number": "6",
            "status": "00",
            "signature": "0000"
        },
        "data_records": [
            { "id": 0, "quantity": "Energy", "unit": "Wh", "value": "2850427.000000" },
            { "id": 1, "quantity": "Voltage", "unit": "V", "value": "229.000000" },
            { "id": 2, "quantity": "Current", "unit": "A", "value": "0.320000" },
            { "id": 3, "quantity": "Power", "unit": "W", "value": "54.000000" }
        ]
    }"#
}

#[test]
fn test_parse_description() {
    let description = MeterDescription::from_json(sample_description_json()).unwrap();
    assert_eq!(description.slave_information.id, "08205037");
    assert_eq!(description.slave_information.manufacturer, "ACW");
    assert_eq!(description.slave_information.medium, "Electricity");
    assert_eq!(description.data_records.len(), 4);

    let energy = &description.data_records[0];
    assert_eq!(energy.id, 0);
    assert_eq!(energy.quantity, "Energy");
    assert_eq!(energy.unit, "Wh");
    assert_eq!(energy.value, "2850427.000000");
    assert_eq!(energy.value_f64().unwrap(), 2850427.0);
}

#[test]
fn test_description_requires_records() {
    let json = r#"{
        "slave_information": {
            "id": "1", "manufacturer": "ABC", "version": "1",
            "medium": "Electricity", "access_number": "1",
            "status": "00", "signature": "0000"
        },
        "data_records": []
    }"#;
    assert!(MeterDescription::from_json(json).is_err());
}

#[test]
fn test_description_rejects_non_numeric_value() {
    let json = r#"{
        "slave_information": {
            "id": "1", "manufacturer": "ABC", "version": "1",
            "medium": "Electricity", "access_number": "1",
            "status": "00", "signature": "0000"
        },
        "data_records": [
            { "id": 0, "quantity": "Energy", "unit": "Wh", "value": "n/a" }
        ]
    }"#;
    assert!(MeterDescription::from_json(json).is_err());
}

#[test]
fn test_description_rejects_malformed_json() {
    assert!(MeterDescription::from_json("not json at all").is_err());
    assert!(MeterDescription::from_json("{}").is_err());
}

#[test]
fn test_voltage_band_per_step() {
    // V wanders 0.95..1.05 of the current value per read
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let mut record = DataRecord {
            id: 1,
            quantity: "Voltage".to_string(),
            unit: "V".to_string(),
            value: "230.000000".to_string(),
        };
        record.perturb(&mut rng).unwrap();
        let v = record.value_f64().unwrap();
        assert!((218.5..241.5).contains(&v), "voltage out of band: {v}");
    }
}

#[test]
fn test_current_band_per_step() {
    // A wanders 0.8..1.2 of the current value per read
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let mut record = DataRecord {
            id: 2,
            quantity: "Current".to_string(),
            unit: "A".to_string(),
            value: "0.320000".to_string(),
        };
        record.perturb(&mut rng).unwrap();
        let v = record.value_f64().unwrap();
        assert!((0.255..0.385).contains(&v), "current out of band: {v}");
    }
}

#[test]
fn test_power_band_per_step() {
    // W has the widest band, 0.7..1.3 per read
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let mut record = DataRecord {
            id: 3,
            quantity: "Power".to_string(),
            unit: "W".to_string(),
            value: "100.000000".to_string(),
        };
        record.perturb(&mut rng).unwrap();
        let v = record.value_f64().unwrap();
        assert!((70.0..130.0).contains(&v), "power out of band: {v}");
    }
}

#[test]
fn test_perturbed_value_keeps_decimal_format() {
    let mut rng = rand::thread_rng();
    let mut record = DataRecord {
        id: 0,
        quantity: "Energy".to_string(),
        unit: "Wh".to_string(),
        value: "2850427.000000".to_string(),
    };
    for _ in 0..10 {
        record.perturb(&mut rng).unwrap();
        let fraction = record.value.split('.').nth(1).unwrap();
        assert_eq!(fraction.len(), 6, "not a 6-digit fraction: {}", record.value);
    }
}
