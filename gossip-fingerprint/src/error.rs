use std::fmt;

use gossip_wire::ln::msgs::DecodeError;

/// All-encompassing standard error type that archive processing can return.
///
/// Every variant is local to one record; processing the rest of a batch continues regardless.
#[derive(Debug, PartialEq)]
pub enum ArchiveError {
	/// The record carried a message type discriminant this engine does not decode.
	UnknownMessageType(u8),
	/// The stored payload was not recoverable as URL-safe base64.
	Base64(base64::DecodeError),
	/// Error decoding the recovered wire payload, typically an erroneous length indication that
	/// is greater than the actual amount of data provided.
	Decode(DecodeError),
}

impl From<base64::DecodeError> for ArchiveError {
	fn from(error: base64::DecodeError) -> Self {
		Self::Base64(error)
	}
}

impl From<DecodeError> for ArchiveError {
	fn from(error: DecodeError) -> Self {
		Self::Decode(error)
	}
}

impl fmt::Display for ArchiveError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ArchiveError::UnknownMessageType(message_type) => {
				write!(f, "unknown message type {}", message_type)
			},
			ArchiveError::Base64(e) => write!(f, "invalid stored payload: {}", e),
			ArchiveError::Decode(e) => write!(f, "invalid wire payload: {}", e),
		}
	}
}

impl std::error::Error for ArchiveError {}
