//! Session lifecycle for the AuthServer admin console
//!
//! [`SessionContext`] owns the state machine and performs every transition.
//! [`AdminConsole`] wires it to the token store and the [`admin_http::AuthGateway`]
//! so that an unrecoverable 401 anywhere ends the session exactly once.

pub mod console;
pub mod context;
pub mod error;
pub mod guard;
pub mod state;
pub mod validator;

pub use console::{AdminConsole, AdminConsoleBuilder};
pub use context::{Redirector, SessionContext, TracingRedirector};
pub use error::{INVALID_CREDENTIALS_MESSAGE, LoginError, SessionError};
pub use guard::{GuardDecision, LoginRedirect, RouteGuard, decide};
pub use state::{SessionState, SignOutReason};
pub use validator::{SessionValidator, ValidationOutcome};
