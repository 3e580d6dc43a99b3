use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status and a `{success, message}` body.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("not signed in")]
    NotSignedIn,

    #[error("ticket image: {0}")]
    Ticket(#[from] utsav_ticket::TicketError),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// A scan is already running or waiting on the server.
    #[error("scanner is busy")]
    Busy,
}
