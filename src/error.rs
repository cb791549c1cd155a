// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

use std::io;

use thiserror::Error;

// Authentication failure classes, upper 16 bits of the result code
const AUTH_CLASS_REQUEST_DATA: u16 = 0x0001;
const AUTH_CLASS_USER: u16 = 0x0002;
const AUTH_CLASS_PASSWORD: u16 = 0x0003;
const AUTH_CLASS_SECURITY: u16 = 0x0004;
const AUTH_CLASS_TOKEN: u16 = 0x0006;

// Specific authentication result codes
const AUTH_UNKNOWN_USER: u32 = 0x0002_0001;
const AUTH_USER_DISABLED: u32 = 0x0002_0002;
const AUTH_USER_MISMATCH: u32 = 0x0002_0003;
const AUTH_BAD_PASSWORD: u32 = 0x0003_000B;
const AUTH_BAD_PASSWORD_LAST_TRY: u32 = 0x0003_000C;
const AUTH_PASSWORD_EXPIRED: u32 = 0x0003_000D;
const AUTH_PASSWORD_PRE_V2R2: u32 = 0x0003_000E;
const AUTH_PASSWORD_NONE: u32 = 0x0003_0010;

/// Error types returned by this crate.
///
/// Non zero result codes from program and command calls are *not* errors,
/// they come back as plain return values next to the server's messages.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied value violates a protocol limit. Raised before
    /// any I/O happens.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A call was attempted on a session that is not in the ready state.
    #[error("client not connected")]
    NotConnected,

    /// Establishing the TCP or TLS connection failed.
    #[error("connection error: {0}")]
    Connect(String),

    /// Socket read or write failure. Fatal for the session.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TLS failure after the connection phase.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// The server sent bytes the protocol grammar cannot account for.
    #[error("malformed response: {reason}")]
    Frame { reason: String },

    /// A handshake step was rejected by the server.
    #[error("authentication failed ({code:#010x}): {}", auth_text(.code))]
    Authentication { code: u32 },

    /// The attribute exchange reply carried a result code outside the
    /// tolerated set.
    #[error("attribute exchange rejected ({code:#06x})")]
    ServerInfo { code: u16 },

    /// Text was tagged with a CCSID this build carries no table for.
    #[error("unsupported CCSID {0}")]
    UnsupportedCcsid(u32),
}

impl Error {
    pub(crate) fn frame(reason: impl Into<String>) -> Error {
        Error::Frame {
            reason: reason.into(),
        }
    }
}

fn auth_text(code: &u32) -> &'static str {
    auth_error_text(*code)
}

//auth_error_text returns a string error text from an authentication result code
pub fn auth_error_text(code: u32) -> &'static str {
    match code {
        AUTH_UNKNOWN_USER => "SEC : User ID is not known to the system",
        AUTH_USER_DISABLED => "SEC : User profile is disabled",
        AUTH_USER_MISMATCH => "SEC : User ID does not match the authentication token",
        AUTH_BAD_PASSWORD => "SEC : Password is not correct",
        AUTH_BAD_PASSWORD_LAST_TRY => {
            "SEC : Password is not correct, profile will be disabled on the next failure"
        }
        AUTH_PASSWORD_EXPIRED => "SEC : Password is expired",
        AUTH_PASSWORD_PRE_V2R2 => "SEC : Password was encrypted before V2R2",
        AUTH_PASSWORD_NONE => "SEC : Password is *NONE",
        _ => match (code >> 16) as u16 {
            AUTH_CLASS_REQUEST_DATA => "SEC : Error in request data",
            AUTH_CLASS_USER => "SEC : User ID is not valid",
            AUTH_CLASS_PASSWORD => "SEC : Password is not valid",
            AUTH_CLASS_SECURITY => "SEC : General security failure",
            AUTH_CLASS_TOKEN => "SEC : Authentication token error",
            _ => "SEC : Unknown security failure",
        },
    }
}

#[test]
fn test_auth_error_text_specific_codes() {
    assert_eq!(auth_error_text(0x0002_0001), "SEC : User ID is not known to the system");
    assert_eq!(auth_error_text(0x0003_000B), "SEC : Password is not correct");
    assert_eq!(auth_error_text(0x0003_0010), "SEC : Password is *NONE");
}

#[test]
fn test_auth_error_text_classes() {
    assert_eq!(auth_error_text(0x0001_0042), "SEC : Error in request data");
    assert_eq!(auth_error_text(0x0002_00FF), "SEC : User ID is not valid");
    assert_eq!(auth_error_text(0x0003_00FF), "SEC : Password is not valid");
    assert_eq!(auth_error_text(0x0004_0001), "SEC : General security failure");
    assert_eq!(auth_error_text(0x0006_0001), "SEC : Authentication token error");
    assert_eq!(auth_error_text(0x0099_0000), "SEC : Unknown security failure");
}

#[test]
fn test_display_includes_code_and_text() {
    let e = Error::Authentication { code: 0x0003_000D };
    let text = e.to_string();
    assert!(text.contains("0x0003000d"), "got {}", text);
    assert!(text.contains("expired"), "got {}", text);
}
