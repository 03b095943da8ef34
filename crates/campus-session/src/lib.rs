//! Client sessions for the Campus platform.
//!
//! A [`Session`] binds one authenticated [`Actor`](campus_types::Actor),
//! owns that actor's inbox subscription, and is the only way to reach the
//! record store for mutations: every write goes through the authorization
//! engine first.

pub mod actions;
pub mod credentials;
pub mod identity;
pub mod session;

pub use credentials::{authenticate, register, Registration};
pub use identity::SessionIdentity;
pub use session::Session;

use campus_types::ActionError;

/// Runs blocking store work off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ActionError>
where
    F: FnOnce() -> Result<T, ActionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ActionError::PersistenceFailure(format!("blocking task failed: {e}")))?
}
