//! Client side of the festival service: an HTTP client bound to an explicit
//! auth context, and the scanner that feeds decoded tickets to the check-in
//! endpoint.

pub mod api;
pub mod auth;
pub mod error;
pub mod scanner;

pub use api::{ApiClient, TicketView};
pub use auth::{AuthContext, AuthState, SessionUser};
pub use error::{ClientError, ScanError};
