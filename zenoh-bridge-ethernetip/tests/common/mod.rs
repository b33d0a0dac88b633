//! In-memory device shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use zenoh_bridge_ethernetip::cip::{CipError, RawValue, WireType, WireValue, status_message};
use zenoh_bridge_ethernetip::{BridgeContext, Tag, TagDirectory, TagSession};

#[derive(Default)]
struct MockState {
    values: HashMap<String, RawValue>,
    failures: HashMap<String, u8>,
    write_status: u8,
    reads: Vec<String>,
    writes: Vec<(String, WireValue)>,
}

/// A device that keeps tag values in memory.
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn set(&self, name: &str, wire_type: WireType, data: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .values
            .insert(name.to_string(), RawValue { wire_type, data });
    }

    /// Make every access to `name` fail with a CIP general status.
    pub fn fail(&self, name: &str, status: u8) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(name.to_string(), status);
    }

    /// Status returned by writes that reach the device.
    pub fn set_write_status(&self, status: u8) {
        self.state.lock().unwrap().write_status = status;
    }

    pub fn reads(&self) -> Vec<String> {
        self.state.lock().unwrap().reads.clone()
    }

    pub fn writes(&self) -> Vec<(String, WireValue)> {
        self.state.lock().unwrap().writes.clone()
    }
}

fn status_error(status: u8) -> CipError {
    CipError::Status {
        status,
        message: status_message(status),
    }
}

impl TagSession for MockDevice {
    async fn read_tag(&self, tag: &Tag) -> Result<RawValue, CipError> {
        let mut state = self.state.lock().unwrap();
        state.reads.push(tag.name.clone());

        if let Some(status) = state.failures.get(&tag.name) {
            return Err(status_error(*status));
        }
        state
            .values
            .get(&tag.name)
            .cloned()
            .ok_or_else(|| status_error(0x05))
    }

    async fn write_tag(&self, tag: &Tag, value: WireValue) -> Result<u8, CipError> {
        let mut state = self.state.lock().unwrap();

        if let Some(status) = state.failures.get(&tag.name) {
            return Err(status_error(*status));
        }
        state.writes.push((tag.name.clone(), value.clone()));
        if state.write_status == 0 {
            state.values.insert(
                tag.name.clone(),
                RawValue {
                    wire_type: value.wire_type,
                    data: value.data,
                },
            );
        }
        Ok(state.write_status)
    }
}

pub fn string_bytes(text: &str) -> Vec<u8> {
    let mut data = (text.len() as u16).to_le_bytes().to_vec();
    data.extend_from_slice(text.as_bytes());
    data
}

/// A small plant: a string, a few integers, a float, an array, a structure
/// and a flag.
pub fn plant() -> (MockDevice, BridgeContext<MockDevice>) {
    let device = MockDevice::default();
    device.set("Temperature", WireType::String, string_bytes("72F"));
    device.set("Count", WireType::Dint, 42i32.to_le_bytes().to_vec());
    device.set("Total", WireType::Udint, 3_000_000u32.to_le_bytes().to_vec());
    device.set("Running", WireType::Bool, vec![0x01]);
    device.set("Speed", WireType::Real, 1.5f32.to_le_bytes().to_vec());
    // a one-element read of an array answers with its first element
    device.set("Setpoints", WireType::Int, 7i16.to_le_bytes().to_vec());
    device.set("Recipe", WireType::Structured, vec![0; 8]);
    device.set("Big", WireType::Ulint, 0u64.to_le_bytes().to_vec());

    let directory = TagDirectory::from_tags([
        Tag::new("Temperature", WireType::String),
        Tag::new("Count", WireType::Dint),
        Tag::new("Total", WireType::Udint),
        Tag::new("Running", WireType::Bool),
        Tag::new("Speed", WireType::Real),
        Tag::array("Setpoints", WireType::Int),
        Tag::new("Recipe", WireType::Structured),
        Tag::new("Big", WireType::Ulint),
    ]);

    let ctx = BridgeContext::new(device.clone(), Arc::new(directory));
    (device, ctx)
}
