//! Request descriptors and response documents exchanged with the remote API.
//!
//! [`EndpointRequest`] is the immutable description of one API call; the pipeline replays the
//! identical value after a token refresh. [`Payload`] is the untyped JSON object every
//! endpoint answers with, and [`ErrorSignal`] classifies its `error` field.

pub mod endpoint;
pub mod payload;
pub mod signal;

pub use endpoint::*;
pub use payload::*;
pub use signal::*;
