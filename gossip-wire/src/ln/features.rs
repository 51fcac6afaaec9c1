//! Lightning exposes sets of supported operations through "feature flags". This module includes
//! types to decode those feature flags from gossip messages and query for specific flags.
//!
//! A feature bitmap is a variable-length big-endian bit vector; bit 0 is the least significant
//! bit of the last byte. Feature bits come in even/odd pairs sharing one semantic name: the even
//! bit means support is compulsory, the odd bit means it is optional. The bitmap bytes are kept
//! verbatim after decoding because downstream analysis fingerprints nodes by the exact byte
//! sequence, zero padding included.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use crate::ln::msgs::DecodeError;
use crate::util::ser::{Readable, Writeable, Writer};

/// Whether a node requires or merely supports a feature.
///
/// Even feature bits are compulsory ("the peer must understand this"), odd bits are optional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FeatureLevel {
	/// The even bit of the pair: peers which do not understand the feature must disconnect.
	Compulsory,
	/// The odd bit of the pair: the feature is supported but not required.
	Optional,
}

/// A named protocol feature from the BOLT 9 registry, or an unassigned bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Feature {
	/// Commitment-state recovery after data loss (bits 0/1)
	DataLossProtect,
	/// Commits a shutdown scriptpubkey when opening a channel (bits 4/5)
	UpfrontShutdownScript,
	/// Gossip queries for selective sync (bits 6/7)
	GossipQueries,
	/// Variable-length onion payload format (bits 8/9)
	TlvOnion,
	/// Gossip queries with additional checksum data (bits 10/11)
	GossipQueriesEx,
	/// Static to_remote key (bits 12/13)
	StaticRemoteKey,
	/// Payment secret in the final onion hop (bits 14/15)
	PaymentSecret,
	/// Multi-part payments (bits 16/17)
	BasicMpp,
	/// Channels larger than the original wumbo limit (bits 18/19)
	LargeChannels,
	/// Anchor outputs commitment format (bits 20/21)
	AnchorOutputs,
	/// Anchor outputs with zero-fee HTLC transactions (bits 22/23)
	AnchorsZeroFeeHtlcTx,
	/// Blinded route support (bits 24/25)
	RouteBlinding,
	/// Any-segwit shutdown scripts (bits 26/27)
	ShutdownAnysegwit,
	/// Dual-funded (v2) channel establishment (bits 28/29)
	DualFund,
	/// Explicit channel type negotiation (bits 44/45)
	ChannelType,
	/// Short channel id aliases (bits 46/47)
	ScidAlias,
	/// Payment metadata in the onion (bits 48/49)
	PaymentMetadata,
	/// Zero-conf channel funding (bits 50/51)
	ZeroConf,
	/// A bit with no entry in the registry table. The original bit index is retained so
	/// distinct unknown bits stay distinguishable. A u16 `flen` admits bit indices up to
	/// 524279, so the index is wider than u16.
	Unknown(u32),
}

impl Feature {
	/// Looks up the feature assigned to a bit. Even and odd bits of a pair share one name, so
	/// the lookup is keyed on the even member of the pair.
	pub fn from_bit(bit: u32) -> Feature {
		match bit & !1 {
			0 => Feature::DataLossProtect,
			4 => Feature::UpfrontShutdownScript,
			6 => Feature::GossipQueries,
			8 => Feature::TlvOnion,
			10 => Feature::GossipQueriesEx,
			12 => Feature::StaticRemoteKey,
			14 => Feature::PaymentSecret,
			16 => Feature::BasicMpp,
			18 => Feature::LargeChannels,
			20 => Feature::AnchorOutputs,
			22 => Feature::AnchorsZeroFeeHtlcTx,
			24 => Feature::RouteBlinding,
			26 => Feature::ShutdownAnysegwit,
			28 => Feature::DualFund,
			44 => Feature::ChannelType,
			46 => Feature::ScidAlias,
			48 => Feature::PaymentMetadata,
			50 => Feature::ZeroConf,
			_ => Feature::Unknown(bit),
		}
	}
}

impl fmt::Display for Feature {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Feature::DataLossProtect => f.write_str("data_loss_protect"),
			Feature::UpfrontShutdownScript => f.write_str("upfront_shutdown_script"),
			Feature::GossipQueries => f.write_str("gossip_queries"),
			Feature::TlvOnion => f.write_str("tlv_onion"),
			Feature::GossipQueriesEx => f.write_str("gossip_queries_ex"),
			Feature::StaticRemoteKey => f.write_str("static_remote_key"),
			Feature::PaymentSecret => f.write_str("payment_secret"),
			Feature::BasicMpp => f.write_str("basic_mpp"),
			Feature::LargeChannels => f.write_str("large_channels"),
			Feature::AnchorOutputs => f.write_str("anchor_outputs"),
			Feature::AnchorsZeroFeeHtlcTx => f.write_str("anchors_zero_fee_htlc_tx"),
			Feature::RouteBlinding => f.write_str("route_blinding"),
			Feature::ShutdownAnysegwit => f.write_str("shutdown_anysegwit"),
			Feature::DualFund => f.write_str("dual_fund"),
			Feature::ChannelType => f.write_str("channel_type"),
			Feature::ScidAlias => f.write_str("scid_alias"),
			Feature::PaymentMetadata => f.write_str("payment_metadata"),
			Feature::ZeroConf => f.write_str("zero_conf"),
			Feature::Unknown(bit) => write!(f, "unknown_bit_{}", bit),
		}
	}
}

/// The feature bitmap attached to a gossip message.
///
/// Note that the wire bytes are retained verbatim, so two bitmaps which decode to the same
/// feature names but differ in zero padding compare unequal. That is deliberate: the raw byte
/// sequence is the fingerprint identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureSet {
	/// Big-endian bitmap exactly as it appeared on the wire.
	flags: Vec<u8>,
}

impl FeatureSet {
	/// A bitmap with no bits, as carried by messages with `flen == 0`.
	pub fn empty() -> FeatureSet {
		FeatureSet { flags: Vec::new() }
	}

	/// Wraps bitmap bytes taken from the wire.
	pub fn from_wire(flags: Vec<u8>) -> FeatureSet {
		FeatureSet { flags }
	}

	/// The verbatim wire bytes.
	pub fn raw(&self) -> &[u8] {
		&self.flags
	}

	/// The wire length of the bitmap (the message's `flen`).
	pub fn byte_len(&self) -> usize {
		self.flags.len()
	}

	/// Whether the given bit is set.
	pub fn is_set(&self, bit: u32) -> bool {
		match self.flags.len().checked_sub(bit as usize / 8 + 1) {
			Some(idx) => self.flags[idx] & (1 << (bit % 8)) != 0,
			None => false,
		}
	}

	/// Decodes every set bit into its feature name and requirement level.
	///
	/// When both members of an even/odd pair are set the pair maps to a single entry and the
	/// odd (Optional) bit wins, since bits are visited in ascending order.
	pub fn decoded(&self) -> BTreeMap<Feature, FeatureLevel> {
		let mut features = BTreeMap::new();
		for (idx, byte) in self.flags.iter().rev().enumerate() {
			for shift in 0..8 {
				if byte & (1 << shift) != 0 {
					let bit = (idx * 8 + shift) as u32;
					let level = if bit % 2 == 0 {
						FeatureLevel::Compulsory
					} else {
						FeatureLevel::Optional
					};
					features.insert(Feature::from_bit(bit), level);
				}
			}
		}
		features
	}
}

impl Writeable for FeatureSet {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), std::io::Error> {
		self.flags.write(w)
	}
}

impl Readable for FeatureSet {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let flags: Vec<u8> = Readable::read(r)?;
		Ok(FeatureSet { flags })
	}
}

#[cfg(test)]
mod tests {
	use super::{Feature, FeatureLevel, FeatureSet};
	use crate::util::ser::{Readable, Writeable};
	use std::io::Cursor;

	#[test]
	fn empty_bitmap_is_not_an_error() {
		let features = FeatureSet::empty();
		assert!(features.raw().is_empty());
		assert!(features.decoded().is_empty());

		// flen == 0 on the wire
		let mut cursor = Cursor::new(vec![0, 0]);
		let read: FeatureSet = Readable::read(&mut cursor).unwrap();
		assert_eq!(read, features);
	}

	#[test]
	fn odd_bits_are_optional_even_bits_compulsory() {
		let optional = FeatureSet::from_wire(vec![0x00, 0x02]);
		assert!(optional.is_set(1));
		assert_eq!(
			optional.decoded().get(&Feature::DataLossProtect),
			Some(&FeatureLevel::Optional)
		);

		let compulsory = FeatureSet::from_wire(vec![0x01]);
		assert_eq!(
			compulsory.decoded().get(&Feature::DataLossProtect),
			Some(&FeatureLevel::Compulsory)
		);
	}

	#[test]
	fn every_set_bit_yields_exactly_one_entry() {
		// Bits 0..=7: two named pairs, two unknown bits, one more named pair
		let features = FeatureSet::from_wire(vec![0xff]);
		let decoded = features.decoded();
		assert_eq!(decoded.len(), 5);
		assert_eq!(decoded[&Feature::DataLossProtect], FeatureLevel::Optional);
		assert_eq!(decoded[&Feature::Unknown(2)], FeatureLevel::Compulsory);
		assert_eq!(decoded[&Feature::Unknown(3)], FeatureLevel::Optional);
		assert_eq!(decoded[&Feature::UpfrontShutdownScript], FeatureLevel::Optional);
		assert_eq!(decoded[&Feature::GossipQueries], FeatureLevel::Optional);
	}

	#[test]
	fn bit_numbering_crosses_byte_boundaries() {
		// Bit 8 is the least significant bit of the second-to-last byte
		let features = FeatureSet::from_wire(vec![0x01, 0x00]);
		assert!(features.is_set(8));
		assert!(!features.is_set(0));
		assert_eq!(features.decoded()[&Feature::TlvOnion], FeatureLevel::Compulsory);
	}

	#[test]
	fn unknown_bits_render_with_their_index() {
		assert_eq!(Feature::Unknown(2).to_string(), "unknown_bit_2");
		assert_eq!(Feature::from_bit(52), Feature::Unknown(52));
		assert_eq!(Feature::from_bit(50), Feature::ZeroConf);
	}

	#[test]
	fn bit_indices_above_u16_stay_distinct() {
		// An 8193-byte bitmap puts its highest byte at bit 65536, past u16 range
		let mut flags = vec![0u8; 8193];
		flags[0] = 0x01;
		let features = FeatureSet::from_wire(flags);
		assert!(features.is_set(65536));
		assert!(!features.is_set(0));
		let decoded = features.decoded();
		assert_eq!(decoded.len(), 1);
		assert_eq!(decoded[&Feature::Unknown(65536)], FeatureLevel::Compulsory);
		assert!(!decoded.contains_key(&Feature::DataLossProtect));
		assert_eq!(Feature::Unknown(65536).to_string(), "unknown_bit_65536");
	}

	#[test]
	fn zero_padding_changes_raw_but_not_decoded() {
		let bare = FeatureSet::from_wire(vec![0x02]);
		let padded = FeatureSet::from_wire(vec![0x00, 0x02]);
		assert_eq!(bare.decoded(), padded.decoded());
		assert_ne!(bare.raw(), padded.raw());
		assert_ne!(bare, padded);
	}

	#[test]
	fn wire_round_trip_preserves_padding() {
		let features = FeatureSet::from_wire(vec![0x00, 0x00, 0x02]);
		let encoded = features.encode();
		assert_eq!(encoded, vec![0, 3, 0, 0, 2]);
		let decoded: FeatureSet = Readable::read(&mut Cursor::new(encoded)).unwrap();
		assert_eq!(decoded, features);
	}
}
