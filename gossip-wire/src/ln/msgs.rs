//! Wire structs for the two gossip message types which survive in the archive, and the decoders
//! which reconstruct them from signature-stripped payloads.
//!
//! Stored `node_announcement` layout (64-byte signature stripped by the archiver):
//! `flen`(2) `features`(flen) `timestamp`(4) `node_id`(33) `rgb`(3) `alias`(32) `addrlen`(2)
//! `addresses`(addrlen).
//!
//! Stored `channel_announcement` layout (all four signatures stripped):
//! `flen`(2) `features`(flen) `chain_hash`(32) `short_channel_id`(8) `node_id_1`(33)
//! `node_id_2`(33) `bitcoin_key_1`(33) `bitcoin_key_2`(33).

use std::cmp;
use std::fmt;
use std::io::{Cursor, Read};

use crate::ln::features::FeatureSet;
use crate::util::ser::{Readable, Writeable, Writer};

/// An error in decoding a message or struct.
#[derive(Debug, PartialEq)]
pub enum DecodeError {
	/// A fixed- or declared-length read ran past the end of the provided bytes.
	ShortRead,
	/// The buffer is shorter than the message type's fixed minimum, or a length field in the
	/// message implied a read past the end of the buffer.
	BadLengthDescriptor,
	/// Error from [`std::io`].
	Io(std::io::ErrorKind),
}

impl fmt::Display for DecodeError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			DecodeError::ShortRead => f.write_str("Message extended beyond the provided bytes"),
			DecodeError::BadLengthDescriptor => {
				f.write_str("A length descriptor didn't describe the message's data correctly")
			},
			DecodeError::Io(kind) => write!(f, "I/O error: {:?}", kind),
		}
	}
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
	fn from(e: std::io::Error) -> Self {
		if e.kind() == std::io::ErrorKind::UnexpectedEof {
			DecodeError::ShortRead
		} else {
			DecodeError::Io(e.kind())
		}
	}
}

/// The 33-byte identifier of a node, a compressed curve point on the wire.
///
/// Signatures are stripped before the archive is written, so the bytes are carried opaquely and
/// never validated as a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId([u8; 33]);

impl NodeId {
	/// Wraps raw identifier bytes.
	pub fn from_bytes(bytes: [u8; 33]) -> Self {
		NodeId(bytes)
	}

	/// The raw identifier bytes.
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "NodeId({})", hex::encode(self.0))
	}
}
impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&hex::encode(self.0))
	}
}

impl cmp::PartialOrd for NodeId {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}
impl cmp::Ord for NodeId {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		self.0[..].cmp(&other.0[..])
	}
}

impl Writeable for NodeId {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), std::io::Error> {
		writer.write_all(&self.0)
	}
}
impl Readable for NodeId {
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
		Ok(NodeId(Readable::read(reader)?))
	}
}

/// The 32-byte hash identifying the chain a channel announcement commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainHash(pub [u8; 32]);

impl fmt::Display for ChainHash {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&hex::encode(self.0))
	}
}

impl Writeable for ChainHash {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), std::io::Error> {
		writer.write_all(&self.0)
	}
}
impl Readable for ChainHash {
	fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
		Ok(ChainHash(Readable::read(reader)?))
	}
}

/// A user-defined name for a node, zero-padded to 32 bytes on the wire.
///
/// Aliases are provided by third parties and may contain arbitrary bytes; display decodes
/// permissively (invalid UTF-8 becomes replacement characters) after trimming the trailing zero
/// padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeAlias(pub [u8; 32]);

impl fmt::Display for NodeAlias {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let end = self.0.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);
		f.write_str(&String::from_utf8_lossy(&self.0[..end]))
	}
}

impl Writeable for NodeAlias {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), std::io::Error> {
		self.0.write(w)
	}
}
impl Readable for NodeAlias {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(NodeAlias(Readable::read(r)?))
	}
}

/// An address which can be used to connect to a remote peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetAddress {
	/// An IPv4 address/port on which the peer is listening.
	IPv4 {
		/// The 4-byte IPv4 address
		addr: [u8; 4],
		/// The port on which the node is listening
		port: u16,
	},
	/// An IPv6 address/port on which the peer is listening.
	IPv6 {
		/// The 16-byte IPv6 address
		addr: [u8; 16],
		/// The port on which the node is listening
		port: u16,
	},
	/// A deprecated Tor v2 onion address. The 10+2 byte body is consumed but not retained;
	/// only the presence of the descriptor is recorded.
	OnionV2,
	/// A Tor v3 onion address. The 35+2 byte body is consumed but not retained; only the
	/// presence of the descriptor is recorded.
	OnionV3,
	/// A DNS hostname/port on which the peer is listening.
	Hostname {
		/// The hostname, decoded permissively
		hostname: String,
		/// The port on which the node is listening
		port: u16,
	},
}

impl NetAddress {
	fn get_id(&self) -> u8 {
		match self {
			NetAddress::IPv4 { .. } => 1,
			NetAddress::IPv6 { .. } => 2,
			NetAddress::OnionV2 => 3,
			NetAddress::OnionV3 => 4,
			NetAddress::Hostname { .. } => 5,
		}
	}

	/// A short label for the descriptor type, used as a histogram key.
	pub fn type_label(&self) -> &'static str {
		match self {
			NetAddress::IPv4 { .. } => "ipv4",
			NetAddress::IPv6 { .. } => "ipv6",
			NetAddress::OnionV2 => "torv2",
			NetAddress::OnionV3 => "torv3",
			NetAddress::Hostname { .. } => "dns",
		}
	}
}

impl fmt::Display for NetAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			NetAddress::IPv4 { addr, port } => {
				write!(f, "{}.{}.{}.{}:{}", addr[0], addr[1], addr[2], addr[3], port)
			},
			NetAddress::IPv6 { addr, port } => {
				f.write_str("[")?;
				for (i, chunk) in addr.chunks(2).enumerate() {
					if i > 0 {
						f.write_str(":")?;
					}
					write!(f, "{:02x}{:02x}", chunk[0], chunk[1])?;
				}
				write!(f, "]:{}", port)
			},
			NetAddress::OnionV2 => f.write_str("torv2"),
			NetAddress::OnionV3 => f.write_str("torv3_onion"),
			NetAddress::Hostname { hostname, port } => write!(f, "{}:{}", hostname, port),
		}
	}
}

impl Writeable for NetAddress {
	/// Note that the onion variants carry no data, so their bodies serialize as zeroes of the
	/// correct descriptor length.
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), std::io::Error> {
		self.get_id().write(writer)?;
		match self {
			NetAddress::IPv4 { addr, port } => {
				addr.write(writer)?;
				port.write(writer)?;
			},
			NetAddress::IPv6 { addr, port } => {
				addr.write(writer)?;
				port.write(writer)?;
			},
			NetAddress::OnionV2 => {
				[0u8; 10].write(writer)?;
				0u16.write(writer)?;
			},
			NetAddress::OnionV3 => {
				[0u8; 35].write(writer)?;
				0u16.write(writer)?;
			},
			NetAddress::Hostname { hostname, port } => {
				// The descriptor length field is one byte; decode can never produce more
				debug_assert!(hostname.len() <= 255);
				(hostname.len() as u8).write(writer)?;
				writer.write_all(hostname.as_bytes())?;
				port.write(writer)?;
			},
		}
		Ok(())
	}
}

impl Readable for Result<NetAddress, u8> {
	fn read<R: Read>(reader: &mut R) -> Result<Result<NetAddress, u8>, DecodeError> {
		let byte: u8 = Readable::read(reader)?;
		match byte {
			1 => Ok(Ok(NetAddress::IPv4 {
				addr: Readable::read(reader)?,
				port: Readable::read(reader)?,
			})),
			2 => Ok(Ok(NetAddress::IPv6 {
				addr: Readable::read(reader)?,
				port: Readable::read(reader)?,
			})),
			3 => {
				let _addr: [u8; 10] = Readable::read(reader)?;
				let _port: u16 = Readable::read(reader)?;
				Ok(Ok(NetAddress::OnionV2))
			},
			4 => {
				let _onion: [u8; 35] = Readable::read(reader)?;
				let _port: u16 = Readable::read(reader)?;
				Ok(Ok(NetAddress::OnionV3))
			},
			5 => {
				let len: u8 = Readable::read(reader)?;
				let mut hostname = vec![0; len as usize];
				reader.read_exact(&mut hostname)?;
				Ok(Ok(NetAddress::Hostname {
					hostname: String::from_utf8_lossy(&hostname).into_owned(),
					port: Readable::read(reader)?,
				}))
			},
			_ => Ok(Err(byte)),
		}
	}
}

/// Parses a length-delimited address list into descriptors.
///
/// BOLT 7 requires unknown descriptor types to be safely ignorable for forward compatibility and
/// permits trailing extension data, so an unrecognized tag or a descriptor truncated by the end
/// of the list terminates the loop without failing: every descriptor fully read before that
/// point is returned.
pub fn read_addresses(data: &[u8]) -> Vec<NetAddress> {
	let mut addresses = Vec::new();
	let mut cursor = Cursor::new(data);
	while (cursor.position() as usize) < data.len() {
		match <Result<NetAddress, u8> as Readable>::read(&mut cursor) {
			Ok(Ok(addr)) => addresses.push(addr),
			// Unknown descriptor type: nothing after this point can be framed
			Ok(Err(_unknown_tag)) => break,
			// Truncated trailing descriptor
			Err(_) => break,
		}
	}
	addresses
}

/// A `node_announcement` with its signature already stripped by the archiver.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeAnnouncement {
	/// The advertised feature bitmap
	pub features: FeatureSet,
	/// When the announcement was issued; opaque, as set by the announcing node
	pub timestamp: u32,
	/// The node_id this announcement originated from
	pub node_id: NodeId,
	/// Color assigned to the node
	pub rgb: [u8; 3],
	/// Moniker assigned to the node
	pub alias: NodeAlias,
	/// List of addresses on which this node is reachable, in wire order. May be empty, and may
	/// omit descriptors the announcement carried in unknown or truncated trailing data.
	pub addresses: Vec<NetAddress>,
}

/// A `channel_announcement` with all four signatures already stripped by the archiver.
///
/// The two bitcoin funding keys trailing on the wire are required to be present but are not
/// retained.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelAnnouncement {
	/// The advertised channel-level feature bitmap, usually empty
	pub features: FeatureSet,
	/// The hash of the genesis block of the chain the channel exists on
	pub chain_hash: ChainHash,
	/// The channel's on-chain location
	pub short_channel_id: u64,
	/// The lesser node_id of the channel's two endpoints
	pub node_id_1: NodeId,
	/// The greater node_id of the channel's two endpoints
	pub node_id_2: NodeId,
}

impl Writeable for NodeAnnouncement {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), std::io::Error> {
		self.features.write(w)?;
		self.timestamp.write(w)?;
		self.node_id.write(w)?;
		self.rgb.write(w)?;
		self.alias.write(w)?;
		let mut addr_bytes = Vec::new();
		for addr in &self.addresses {
			addr.write(&mut addr_bytes)?;
		}
		addr_bytes.write(w)?;
		Ok(())
	}
}

impl Readable for NodeAnnouncement {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		let features: FeatureSet = Readable::read(r)?;
		let timestamp: u32 = Readable::read(r)?;
		let node_id: NodeId = Readable::read(r)?;
		let rgb: [u8; 3] = Readable::read(r)?;
		let alias: NodeAlias = Readable::read(r)?;
		let addr_bytes: Vec<u8> = Readable::read(r)?;
		let addresses = read_addresses(&addr_bytes);
		Ok(NodeAnnouncement { features, timestamp, node_id, rgb, alias, addresses })
	}
}

impl Writeable for ChannelAnnouncement {
	/// The bitcoin funding keys are not retained after decoding, so encoding emits zeroed
	/// placeholders in their positions to produce a buffer of valid stored length.
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), std::io::Error> {
		self.features.write(w)?;
		self.chain_hash.write(w)?;
		self.short_channel_id.write(w)?;
		self.node_id_1.write(w)?;
		self.node_id_2.write(w)?;
		[0u8; 33].write(w)?;
		[0u8; 33].write(w)?;
		Ok(())
	}
}

impl Readable for ChannelAnnouncement {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(ChannelAnnouncement {
			features: Readable::read(r)?,
			chain_hash: Readable::read(r)?,
			short_channel_id: Readable::read(r)?,
			node_id_1: Readable::read(r)?,
			node_id_2: Readable::read(r)?,
		})
	}
}

/// Fixed-length portion of a stored `node_announcement`:
/// `flen`(2) + `timestamp`(4) + `node_id`(33) + `rgb`(3) + `alias`(32) + `addrlen`(2).
pub const NODE_ANNOUNCEMENT_MIN_LEN: usize = 2 + 4 + 33 + 3 + 32 + 2;

/// Fixed-length portion of a stored `channel_announcement`:
/// `flen`(2) + `chain_hash`(32) + `short_channel_id`(8) + four 33-byte keys.
pub const CHANNEL_ANNOUNCEMENT_MIN_LEN: usize = 2 + 32 + 8 + 33 * 4;

/// Decodes a signature-stripped `node_announcement` payload.
///
/// Fails with [`DecodeError::BadLengthDescriptor`] if the payload cannot hold the fixed fields
/// or if `flen`/`addrlen` overruns the buffer. Failures are local to this payload and never
/// affect other messages in a batch.
pub fn decode_node_announcement(payload: &[u8]) -> Result<NodeAnnouncement, DecodeError> {
	if payload.len() < NODE_ANNOUNCEMENT_MIN_LEN {
		return Err(DecodeError::BadLengthDescriptor);
	}
	match Readable::read(&mut Cursor::new(payload)) {
		// The fixed fields fit, so running short means a length field overran the buffer
		Err(DecodeError::ShortRead) => Err(DecodeError::BadLengthDescriptor),
		other => other,
	}
}

/// Decodes a signature-stripped `channel_announcement` payload.
///
/// The same length rules as [`decode_node_announcement`] apply, with the minimum covering the
/// two bitcoin funding keys even though they are not retained.
pub fn decode_channel_announcement(payload: &[u8]) -> Result<ChannelAnnouncement, DecodeError> {
	if payload.len() < CHANNEL_ANNOUNCEMENT_MIN_LEN {
		return Err(DecodeError::BadLengthDescriptor);
	}
	match Readable::read(&mut Cursor::new(payload)) {
		Err(DecodeError::ShortRead) => Err(DecodeError::BadLengthDescriptor),
		other => other,
	}
}
