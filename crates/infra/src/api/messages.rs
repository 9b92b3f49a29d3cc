//! User-facing messages for API errors
//!
//! A fixed lookup from backend code, then HTTP status, to a
//! title/message/action triple. Unmapped errors get the `UNKNOWN` entry.

use serde::Serialize;

use super::errors::ApiError;

/// Text shown to the user for a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub title: &'static str,
    pub message: &'static str,
    pub action: &'static str,
}

impl UserMessage {
    const fn new(title: &'static str, message: &'static str, action: &'static str) -> Self {
        Self { title, message, action }
    }
}

const UNKNOWN: UserMessage = UserMessage::new(
    "Something went wrong",
    "An unexpected error occurred.",
    "Please try again. If the problem persists, contact support.",
);

const BY_CODE: &[(&str, UserMessage)] = &[
    (
        "TOKEN_EXPIRED",
        UserMessage::new(
            "Session expired",
            "Your session has expired.",
            "Please log in again.",
        ),
    ),
    (
        "TIMEOUT",
        UserMessage::new(
            "Request timed out",
            "The server took too long to respond.",
            "Check your connection and try again.",
        ),
    ),
    (
        "NETWORK_ERROR",
        UserMessage::new(
            "Connection problem",
            "We couldn't reach the server.",
            "Check your internet connection and try again.",
        ),
    ),
    (
        "MALFORMED_RESPONSE",
        UserMessage::new(
            "Unexpected response",
            "The server sent a response we couldn't read.",
            "Please try again shortly.",
        ),
    ),
    (
        "INVALID_REQUEST",
        UserMessage::new(
            "Invalid request",
            "The request could not be sent.",
            "Please check your input and try again.",
        ),
    ),
];

const BY_STATUS: &[(u16, UserMessage)] = &[
    (
        400,
        UserMessage::new(
            "Invalid request",
            "Some of the information provided is not valid.",
            "Please check your input and try again.",
        ),
    ),
    (
        401,
        UserMessage::new(
            "Session expired",
            "You need to sign in to continue.",
            "Please log in again.",
        ),
    ),
    (
        403,
        UserMessage::new(
            "Access denied",
            "You don't have permission to do that.",
            "Contact the store owner if you think this is a mistake.",
        ),
    ),
    (
        404,
        UserMessage::new(
            "Not found",
            "The requested item could not be found.",
            "It may have been removed. Go back and try another item.",
        ),
    ),
    (
        409,
        UserMessage::new(
            "Conflict",
            "This item was changed by someone else.",
            "Refresh the page and try again.",
        ),
    ),
    (
        422,
        UserMessage::new(
            "Check your input",
            "Some fields need attention.",
            "Please correct the highlighted fields and try again.",
        ),
    ),
    (
        429,
        UserMessage::new(
            "Too many requests",
            "You're doing that too often.",
            "Please wait a moment and retry shortly.",
        ),
    ),
    (
        500,
        UserMessage::new(
            "Server error",
            "Something went wrong on our side.",
            "Please retry shortly.",
        ),
    ),
    (
        502,
        UserMessage::new(
            "Service unavailable",
            "The service is temporarily unreachable.",
            "Please retry shortly.",
        ),
    ),
    (
        503,
        UserMessage::new(
            "Service unavailable",
            "The service is down for maintenance or overloaded.",
            "Please retry shortly.",
        ),
    ),
    (
        504,
        UserMessage::new(
            "Server timeout",
            "The server took too long to respond.",
            "Please retry shortly.",
        ),
    ),
];

/// Map an error to user-facing text.
///
/// The backend code takes precedence over the status.
pub fn to_user_message(error: &ApiError) -> UserMessage {
    let by_code = error
        .code()
        .and_then(|code| BY_CODE.iter().find(|(c, _)| *c == code).map(|(_, m)| *m));
    let by_status = || {
        let status = error.status()?;
        BY_STATUS.iter().find(|(s, _)| *s == status).map(|(_, m)| *m)
    };
    by_code.or_else(by_status).unwrap_or(UNKNOWN)
}
