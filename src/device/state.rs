//! Device status parsing and the state projections compared by confirmation polls.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, api::Payload, device::DeviceMethod};

/// Colour carried by RGB commands and reported packed as `0xRRGGBB`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
}
impl Rgb {
	/// Creates a colour from its channels.
	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Unpacks a `0xRRGGBB` value; higher bits are ignored.
	pub const fn from_packed(value: u32) -> Self {
		Self { r: (value >> 16) as u8, g: (value >> 8) as u8, b: value as u8 }
	}

	/// Packs the colour as `0xRRGGBB`.
	pub const fn packed(self) -> u32 {
		((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
	}
}

/// Device state compared by confirmation polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceState {
	/// Last executed method bit, without a level.
	Method(u32),
	/// Dimmed to the given level.
	Dimmed(u8),
	/// Showing the given colour.
	Colour(Rgb),
}

/// One `{state, value}` pair of the `statevalues` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateValue {
	/// Method bit the value belongs to.
	pub state: u32,
	/// Raw value as reported.
	pub value: String,
}

/// Parsed `/device/info` response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceStatus {
	/// Last executed method bit.
	pub state: Option<u32>,
	/// Legacy single value field.
	pub state_value: Option<String>,
	/// Per-method values.
	pub state_values: Vec<StateValue>,
}
impl DeviceStatus {
	/// Reads `state`, `statevalue`, and `statevalues` from a device info document.
	///
	/// Fields that are missing or carry unexpected types are left empty.
	pub fn from_payload(payload: &Payload) -> Self {
		let state = payload.text("state").and_then(|raw| raw.trim().parse().ok());
		let state_value =
			payload.text("statevalue").map(|raw| raw.into_owned()).filter(|raw| !raw.is_empty());
		let state_values = match payload.get("statevalues") {
			Some(Value::Array(items)) => items.iter().filter_map(state_value_of).collect(),
			_ => Vec::new(),
		};

		Self { state, state_value, state_values }
	}

	/// Returns the value reported for `method`.
	///
	/// Falls back to `statevalue` when `method` is the current state and no per-method entry
	/// exists.
	pub fn value_for(&self, method: DeviceMethod) -> Option<&str> {
		self.state_values
			.iter()
			.find(|entry| entry.state == method.bits())
			.map(|entry| entry.value.as_str())
			.or_else(|| {
				self.state_value.as_deref().filter(|_| self.state == Some(method.bits()))
			})
	}

	/// Reported dim level.
	pub fn dim_level(&self) -> Option<u8> {
		self.value_for(DeviceMethod::Dim)?.trim().parse().ok()
	}

	/// Reported colour.
	pub fn colour(&self) -> Option<Rgb> {
		self.value_for(DeviceMethod::Rgb)?.trim().parse().ok().map(Rgb::from_packed)
	}

	/// Projects the status onto the shape of `desired`, so the two can be compared.
	///
	/// A dim or colour projection only yields a level when the device's current state is the
	/// matching method; otherwise the plain method state is returned.
	pub fn observe(&self, desired: &DeviceState) -> Option<DeviceState> {
		let state = self.state?;

		match desired {
			DeviceState::Dimmed(_) if state == DeviceMethod::Dim.bits() =>
				Some(self.dim_level().map_or(DeviceState::Method(state), DeviceState::Dimmed)),
			DeviceState::Colour(_) if state == DeviceMethod::Rgb.bits() =>
				Some(self.colour().map_or(DeviceState::Method(state), DeviceState::Colour)),
			_ => Some(DeviceState::Method(state)),
		}
	}
}

fn state_value_of(item: &Value) -> Option<StateValue> {
	let object = item.as_object()?;
	let state = match object.get("state")? {
		Value::String(raw) => raw.trim().parse().ok()?,
		Value::Number(raw) => u32::try_from(raw.as_u64()?).ok()?,
		_ => return None,
	};
	let value = match object.get("value")? {
		Value::String(raw) => raw.clone(),
		Value::Number(raw) => raw.to_string(),
		_ => return None,
	};

	Some(StateValue { state, value })
}
