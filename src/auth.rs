//! Credential models, token grants, and the identifiers used by confirmation polling.

pub mod credentials;
pub mod grant;
pub mod id;
pub mod secret;

pub use credentials::*;
pub use grant::*;
pub use id::*;
pub use secret::*;
