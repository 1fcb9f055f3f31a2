//! Role login: identifiers, redacted secrets, credentials, and the login exchange.

pub mod credential;
pub mod id;
pub mod login;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use login::*;
pub use secret::*;
