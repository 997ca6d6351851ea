//! nestx Session
//!
//! Binds one transaction manager to one session and serializes access to
//! it. Sessions are opened, looked up and closed through a
//! [`SessionRegistry`].

mod error;
mod registry;
mod session;

pub use error::{SessionError, SessionResult};
pub use registry::SessionRegistry;
pub use session::Session;
