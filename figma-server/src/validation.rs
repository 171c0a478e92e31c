//! Checks applied to frames arriving from the plugin socket.

use thiserror::Error;

/// Maximum WebSocket message size.
pub const MAX_WS_MESSAGE_SIZE: usize = 1_048_576; // 1MB

/// Validation error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// WebSocket message exceeds maximum size.
    #[error("message too large (max {MAX_WS_MESSAGE_SIZE} bytes)")]
    MessageTooLarge,
    /// Binary frame is not UTF-8 text.
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,
}

/// Validate WebSocket message size.
///
/// # Errors
///
/// Returns [`ValidationError::MessageTooLarge`] if the size exceeds 1MB.
pub fn validate_message_size(size: usize) -> Result<(), ValidationError> {
    if size > MAX_WS_MESSAGE_SIZE {
        return Err(ValidationError::MessageTooLarge);
    }
    Ok(())
}

/// Interpret a binary frame as a text payload.
///
/// Some plugin builds send JSON as binary frames.
///
/// # Errors
///
/// Returns [`ValidationError::MessageTooLarge`] for oversized frames and
/// [`ValidationError::InvalidUtf8`] when the bytes are not UTF-8.
pub fn decode_binary_frame(bytes: &[u8]) -> Result<&str, ValidationError> {
    validate_message_size(bytes.len())?;
    std::str::from_utf8(bytes).map_err(|_| ValidationError::InvalidUtf8)
}
