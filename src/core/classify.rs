//! Purpose: Turn HTTP error responses and transport failures into classified errors.
//! Exports: `classify_response`, `classify_transport`, `INVALID_IMAGE_MESSAGE`.
//! Role: Single mapping point from wire failures to `ErrorKind`; no I/O, no state.
//! Invariants: Known statuses map to fixed kinds and messages regardless of body.
//! Invariants: The "InvalidImage" substitution applies to any extracted body message.
use super::error::{Error, ErrorKind};
use super::transport::TransportError;
use serde::Deserialize;

pub const INVALID_IMAGE_MESSAGE: &str =
    "Image is either corrupted, not supported, or got moderated.";

const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub fn classify_response(status: u16, status_text: &str, body: &[u8]) -> Error {
    if let Some((kind, message)) = known_status(status) {
        return Error::new(kind).with_message(message).with_status(status);
    }

    let err = Error::new(ErrorKind::UnknownHttp).with_status(status);
    let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) else {
        return err.with_message(UNKNOWN_ERROR_MESSAGE);
    };
    match parsed.message {
        Some(message) if message.contains("InvalidImage") => {
            err.with_message(INVALID_IMAGE_MESSAGE)
        }
        Some(message) => {
            err.with_message(format!("{} | {message}", status_label(status, status_text)))
        }
        None => err.with_message(status_label(status, status_text)),
    }
}

pub fn classify_transport(err: TransportError) -> Error {
    Error::new(ErrorKind::Network)
        .with_message(err.to_string())
        .with_source(err)
}

fn known_status(status: u16) -> Option<(ErrorKind, &'static str)> {
    let classified = match status {
        401 => (ErrorKind::Auth, "credential is invalid"),
        403 => (ErrorKind::Permission, "credential does not permit this operation"),
        404 => (ErrorKind::NotFound, "resource not found"),
        415 => (ErrorKind::UnsupportedMedia, "unsupported media type"),
        429 => (ErrorKind::RateLimit, "too many requests"),
        500 => (ErrorKind::Server, "internal server error"),
        _ => return None,
    };
    Some(classified)
}

fn status_label(status: u16, status_text: &str) -> String {
    let text = status_text.trim();
    if text.is_empty() {
        format!("HTTP {status}")
    } else {
        text.to_string()
    }
}
