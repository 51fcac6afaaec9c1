//! Per-record decoding: the storage boundary (URL-safe base64, padding stripped) and the
//! dispatch on the archive's message type discriminants.
//!
//! Everything here is pure and stateless so records can be decoded on any worker and folded
//! into a [`FingerprintIndex`](crate::index::FingerprintIndex) afterwards.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use gossip_wire::ln::msgs::{
	decode_channel_announcement, decode_node_announcement, ChannelAnnouncement, NodeAnnouncement,
};

use crate::error::ArchiveError;

/// Archive discriminant for `channel_announcement` records.
pub const MSG_TYPE_CHANNEL_ANNOUNCEMENT: u8 = 1;
/// Archive discriminant for `node_announcement` records.
pub const MSG_TYPE_NODE_ANNOUNCEMENT: u8 = 2;
/// Archive discriminant for `channel_update` records, which the capture pipeline emits but this
/// engine does not analyze.
pub const MSG_TYPE_CHANNEL_UPDATE: u8 = 3;

/// One record of the archive export, before any decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveRecord {
	/// The archive's message type discriminant.
	pub message_type: u8,
	/// The stored payload: the signature-stripped wire bytes as URL-safe base64 with the
	/// trailing padding removed.
	pub raw: String,
}

/// A fully decoded gossip message.
#[derive(Clone, Debug, PartialEq)]
pub enum GossipMessage {
	/// A decoded `node_announcement`.
	Node(NodeAnnouncement),
	/// A decoded `channel_announcement`.
	Channel(ChannelAnnouncement),
}

/// Recovers the wire bytes of a stored payload.
///
/// The archiver strips the `=` padding when it writes records, so the payload is re-padded to a
/// multiple of four characters before decoding. This normalization is boundary-level only;
/// nothing downstream sees base64.
pub fn decode_payload(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
	let mut padded = raw.to_owned();
	while padded.len() % 4 != 0 {
		padded.push('=');
	}
	URL_SAFE.decode(padded)
}

/// Decodes one archive record into a [`GossipMessage`].
///
/// Fails per-record: an undecodable payload or an unknown discriminant never affects any other
/// record in a batch.
pub fn decode_record(record: &ArchiveRecord) -> Result<GossipMessage, ArchiveError> {
	match record.message_type {
		MSG_TYPE_CHANNEL_ANNOUNCEMENT => {
			let payload = decode_payload(&record.raw)?;
			Ok(GossipMessage::Channel(decode_channel_announcement(&payload)?))
		},
		MSG_TYPE_NODE_ANNOUNCEMENT => {
			let payload = decode_payload(&record.raw)?;
			Ok(GossipMessage::Node(decode_node_announcement(&payload)?))
		},
		message_type => Err(ArchiveError::UnknownMessageType(message_type)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gossip_wire::ln::msgs::{DecodeError, NetAddress};

	/// The reference node announcement: flen 2, optional data_loss_protect, timestamp 1, zero
	/// node_id, alias "Test", one IPv4 address.
	const NODE_ANNOUNCEMENT_B64: &str =
		"AAIAAgAAAAEAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABUZXN0\
		 AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAGAX8AAAEmBw";

	#[test]
	fn decode_payload_restores_stripped_padding() {
		assert_eq!(decode_payload("AAE").unwrap(), vec![0x00, 0x01]);
		// Already-padded input passes through unchanged
		assert_eq!(decode_payload("AAE=").unwrap(), vec![0x00, 0x01]);
		assert_eq!(decode_payload("").unwrap(), Vec::<u8>::new());
	}

	#[test]
	fn decode_payload_uses_the_url_safe_alphabet() {
		// '-' and '_' are values 62 and 63; the standard alphabet would reject them
		assert_eq!(decode_payload("_-8").unwrap(), vec![0xff, 0xef]);
		assert!(decode_payload("+/8").is_err());
	}

	#[test]
	fn decode_record_dispatches_on_the_discriminant() {
		let record = ArchiveRecord {
			message_type: MSG_TYPE_NODE_ANNOUNCEMENT,
			raw: NODE_ANNOUNCEMENT_B64.to_owned(),
		};
		match decode_record(&record).unwrap() {
			GossipMessage::Node(ann) => {
				assert_eq!(ann.timestamp, 1);
				assert_eq!(ann.alias.to_string(), "Test");
				assert_eq!(
					ann.addresses,
					vec![NetAddress::IPv4 { addr: [127, 0, 0, 1], port: 9735 }]
				);
			},
			GossipMessage::Channel(_) => panic!("decoded the wrong message type"),
		}
	}

	#[test]
	fn decode_record_rejects_unknown_discriminants() {
		let record =
			ArchiveRecord { message_type: MSG_TYPE_CHANNEL_UPDATE, raw: "AAE".to_owned() };
		assert_eq!(decode_record(&record), Err(ArchiveError::UnknownMessageType(3)));
		let record = ArchiveRecord { message_type: 0, raw: "AAE".to_owned() };
		assert_eq!(decode_record(&record), Err(ArchiveError::UnknownMessageType(0)));
	}

	#[test]
	fn decode_record_surfaces_payload_errors() {
		let record =
			ArchiveRecord { message_type: MSG_TYPE_NODE_ANNOUNCEMENT, raw: "!!!!".to_owned() };
		assert!(matches!(decode_record(&record), Err(ArchiveError::Base64(_))));

		let record = ArchiveRecord { message_type: MSG_TYPE_NODE_ANNOUNCEMENT, raw: "AAE".to_owned() };
		assert_eq!(
			decode_record(&record),
			Err(ArchiveError::Decode(DecodeError::BadLengthDescriptor))
		);
	}
}
