//! Device command wrapper built on the authenticated client and the confirmation scheduler.
//!
//! [`DeviceController::set_state`] issues `/device/command` (or `/device/rgb`) and, when the API
//! acknowledges with `status == "success"`, registers a confirmation poll for
//! `(device, context)` that reads `/device/info` on every tick. `learn` commands are never
//! confirmed because they do not change the reported state.

pub mod state;

pub use state::*;

// self
use crate::{
	_prelude::*,
	api::{EndpointRequest, Payload},
	auth::{ContextId, TargetId},
	client::AuthenticatedClient,
	confirm::{ConfirmationScheduler, PollHandle, PollSchedule, PollTarget},
	http::ApiTransport,
	obs::trace_event,
};

/// Method bits understood by the device endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMethod {
	/// Turn on.
	On,
	/// Turn off.
	Off,
	/// Ring.
	Bell,
	/// Toggle between on and off.
	Toggle,
	/// Dim to a level.
	Dim,
	/// Send a pairing signal.
	Learn,
	/// Run a scene.
	Execute,
	/// Move up.
	Up,
	/// Move down.
	Down,
	/// Stop moving.
	Stop,
	/// Set a colour.
	Rgb,
	/// Set a thermostat.
	Thermostat,
}
impl DeviceMethod {
	/// Every method, in bit order.
	pub const ALL: [DeviceMethod; 12] = [
		DeviceMethod::On,
		DeviceMethod::Off,
		DeviceMethod::Bell,
		DeviceMethod::Toggle,
		DeviceMethod::Dim,
		DeviceMethod::Learn,
		DeviceMethod::Execute,
		DeviceMethod::Up,
		DeviceMethod::Down,
		DeviceMethod::Stop,
		DeviceMethod::Rgb,
		DeviceMethod::Thermostat,
	];

	/// Wire value of the method.
	pub const fn bits(self) -> u32 {
		match self {
			DeviceMethod::On => 1,
			DeviceMethod::Off => 2,
			DeviceMethod::Bell => 4,
			DeviceMethod::Toggle => 8,
			DeviceMethod::Dim => 16,
			DeviceMethod::Learn => 32,
			DeviceMethod::Execute => 64,
			DeviceMethod::Up => 128,
			DeviceMethod::Down => 256,
			DeviceMethod::Stop => 512,
			DeviceMethod::Rgb => 1024,
			DeviceMethod::Thermostat => 2048,
		}
	}

	/// Looks a method up by its wire value.
	pub fn from_bits(bits: u32) -> Option<Self> {
		Self::ALL.into_iter().find(|method| method.bits() == bits)
	}

	/// Combines methods into a `supportedMethods` mask.
	pub fn mask(methods: impl IntoIterator<Item = DeviceMethod>) -> u32 {
		methods.into_iter().fold(0, |mask, method| mask | method.bits())
	}

	/// Returns `false` for methods whose effect cannot be observed.
	pub const fn needs_confirmation(self) -> bool {
		!matches!(self, DeviceMethod::Learn)
	}
}

/// State-changing command sent to a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
	/// Method without a value (on, off, bell, ...).
	Method(DeviceMethod),
	/// Dim to a level.
	Dim(u8),
	/// Set a colour.
	Colour(Rgb),
}
impl DeviceCommand {
	/// Method bit the command executes.
	pub const fn method(&self) -> DeviceMethod {
		match self {
			DeviceCommand::Method(method) => *method,
			DeviceCommand::Dim(_) => DeviceMethod::Dim,
			DeviceCommand::Colour(_) => DeviceMethod::Rgb,
		}
	}

	/// State a confirmation poll waits for.
	pub const fn desired(&self) -> DeviceState {
		match self {
			DeviceCommand::Method(method) => DeviceState::Method(method.bits()),
			DeviceCommand::Dim(level) => DeviceState::Dimmed(*level),
			DeviceCommand::Colour(colour) => DeviceState::Colour(*colour),
		}
	}

	/// Endpoint request carrying the command.
	pub fn request(&self, device: &TargetId) -> EndpointRequest {
		match self {
			DeviceCommand::Method(method) => command_request(device, *method, None),
			DeviceCommand::Dim(level) =>
				command_request(device, DeviceMethod::Dim, Some(u32::from(*level))),
			DeviceCommand::Colour(colour) => rgb_request(device, *colour),
		}
	}
}

/// Builds `/device/command?id=&method=&value=`; `value` is omitted when `None`.
pub fn command_request(
	device: &TargetId,
	method: DeviceMethod,
	value: Option<u32>,
) -> EndpointRequest {
	let builder = EndpointRequest::get("/device/command")
		.query("id", device)
		.query("method", method.bits());

	match value {
		Some(value) => builder.query("value", value).build(),
		None => builder.build(),
	}
}

/// Builds `/device/rgb?id=&r=&g=&b=`.
pub fn rgb_request(device: &TargetId, colour: Rgb) -> EndpointRequest {
	EndpointRequest::get("/device/rgb")
		.query("id", device)
		.query("r", colour.r)
		.query("g", colour.g)
		.query("b", colour.b)
		.build()
}

/// Builds `/device/info?id=&supportedMethods=`.
pub fn info_request(device: &TargetId, supported_methods: u32) -> EndpointRequest {
	EndpointRequest::get("/device/info")
		.query("id", device)
		.query("supportedMethods", supported_methods)
		.build()
}

/// Result of [`DeviceController::set_state`].
#[derive(Debug)]
pub enum CommandOutcome {
	/// Command accepted; the handle resolves once the new state is confirmed or times out.
	Pending(PollHandle<DeviceState>),
	/// Command accepted without confirmation (`learn`, or no `success` status).
	Accepted(Payload),
	/// The API answered with an `error` field.
	Rejected {
		/// Value of the `error` field.
		reason: String,
		/// Full response document.
		payload: Payload,
	},
}

/// Issues device commands and confirms their effect.
pub struct DeviceController<T>
where
	T: ?Sized + ApiTransport,
{
	client: Arc<AuthenticatedClient<T>>,
	scheduler: ConfirmationScheduler<DeviceState>,
	schedule: PollSchedule,
	supported_methods: u32,
}
impl<T> DeviceController<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a controller using the default 2 s / 10 s poll schedule and every method bit.
	pub fn new(
		client: Arc<AuthenticatedClient<T>>,
		scheduler: ConfirmationScheduler<DeviceState>,
	) -> Self {
		Self {
			client,
			scheduler,
			schedule: PollSchedule::default(),
			supported_methods: DeviceMethod::mask(DeviceMethod::ALL),
		}
	}

	/// Overrides the confirmation schedule.
	pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
		self.schedule = schedule;

		self
	}

	/// Overrides the `supportedMethods` mask sent to `/device/info`.
	pub fn with_supported_methods(mut self, mask: u32) -> Self {
		self.supported_methods = mask;

		self
	}

	/// Scheduler the controller registers polls with.
	pub fn scheduler(&self) -> &ConfirmationScheduler<DeviceState> {
		&self.scheduler
	}

	/// Fetches and parses `/device/info` for `device`.
	pub async fn info(&self, device: &TargetId) -> Result<DeviceStatus> {
		let payload = self.client.call(&info_request(device, self.supported_methods)).await?;

		Ok(DeviceStatus::from_payload(&payload))
	}

	/// Sends `command` to `device` on behalf of `context`.
	///
	/// A previous pending confirmation for the same `(device, context)` pair is superseded.
	pub async fn set_state(
		&self,
		device: TargetId,
		context: ContextId,
		command: DeviceCommand,
	) -> Result<CommandOutcome> {
		let payload = self.client.call(&command.request(&device)).await?;

		if let Some(reason) = payload.error() {
			let reason = reason.to_owned();

			trace_event!(
				warn,
				device = %device,
				reason = reason.as_str(),
				"Device command was rejected."
			);

			return Ok(CommandOutcome::Rejected { reason, payload });
		}
		if !payload.is_success() || !command.method().needs_confirmation() {
			return Ok(CommandOutcome::Accepted(payload));
		}

		let client = Arc::clone(&self.client);
		let request = info_request(&device, self.supported_methods);
		let desired = command.desired();
		let check = move || {
			let client = Arc::clone(&client);
			let request = request.clone();

			async move {
				let payload = match client.call(&request).await {
					Ok(payload) => payload,
					Err(_e) => {
						trace_event!(
							debug,
							error = %_e,
							"Device status check failed; skipping tick."
						);

						return None;
					},
				};

				DeviceStatus::from_payload(&payload).observe(&desired)
			}
		};
		let target = PollTarget { target: device, context };
		let handle = self.scheduler.start_polling(target, desired, self.schedule, check);

		Ok(CommandOutcome::Pending(handle))
	}
}
impl<T> Debug for DeviceController<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeviceController")
			.field("schedule", &self.schedule)
			.field("supported_methods", &self.supported_methods)
			.field("scheduler", &self.scheduler)
			.finish()
	}
}
