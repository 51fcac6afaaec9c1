#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! This crate analyzes an archive of signature-stripped Lightning gossip messages, grouping
//! nodes by their exact feature bitmap bytes.
//!
//! The archive stores each message as `<type>,<base64>` with URL-safe base64 and the padding
//! stripped, type 1 being `channel_announcement` and type 2 `node_announcement`. Records are
//! decoded individually, node announcements are deduplicated keeping the newest per node, and
//! the surviving nodes are partitioned by byte-identical feature bitmaps. The resulting
//! [`FingerprintReport`](report::FingerprintReport) feeds a dashboard with feature prevalence
//! and per-fingerprint node groups, a useful signal for clustering node implementations.
//!
//! Decoding failures are counted, never fatal: one undecodable record costs exactly that
//! record.
//!
//! # Getting Started
//!
//! ```
//! use gossip_fingerprint::processing::ArchiveRecord;
//! use gossip_fingerprint::report::FingerprintReport;
//! use gossip_fingerprint::FingerprintSync;
//!
//! # use gossip_wire::util::logger::{Logger, Record};
//! # struct FakeLogger {}
//! # impl Logger for FakeLogger {
//! #     fn log(&self, _record: Record) {}
//! # }
//! # let logger = FakeLogger {};
//!
//! let sync = FingerprintSync::new(&logger);
//! let records: Vec<ArchiveRecord> = vec![];
//! let index = sync.index_records(records);
//! let report = FingerprintReport::from_index(&index);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Deref;

use gossip_wire::util::logger::Logger;
use gossip_wire::{log_debug, log_gossip, log_info, log_trace};

use crate::index::FingerprintIndex;
use crate::processing::{
	decode_record, ArchiveRecord, GossipMessage, MSG_TYPE_CHANNEL_ANNOUNCEMENT,
	MSG_TYPE_CHANNEL_UPDATE, MSG_TYPE_NODE_ANNOUNCEMENT,
};

pub use crate::error::ArchiveError;

/// Error types that archive processing can return
pub mod error;

/// Per-record payload and message decoding
pub mod processing;

/// The deduplicating accumulator and fingerprint partition
pub mod index;

/// The dashboard-facing output document
pub mod report;

/// The main archive analysis object.
///
/// Owns the logger and runs the decode-and-reduce pass; see [crate-level documentation] for
/// usage.
///
/// [crate-level documentation]: crate
pub struct FingerprintSync<L: Deref>
where
	L::Target: Logger,
{
	logger: L,
}

impl<L: Deref> FingerprintSync<L>
where
	L::Target: Logger,
{
	/// Instantiate a new [`FingerprintSync`] instance.
	pub fn new(logger: L) -> Self {
		Self { logger }
	}

	/// Indexes a batch of archive records.
	///
	/// Order only matters for equal-timestamp duplicates of one node, where the earlier record
	/// wins. Batches may be split across workers and the partial indexes combined with
	/// [`FingerprintIndex::merge`].
	pub fn index_records(
		&self, records: impl IntoIterator<Item = ArchiveRecord>,
	) -> FingerprintIndex {
		let mut index = FingerprintIndex::new();
		for record in records {
			self.index_record(&mut index, record);
		}
		log_info!(
			self.logger,
			"Indexed {} unique nodes ({} node failures, {} channels, {} channel failures, {} skipped)",
			index.node_count(),
			index.node_decode_failures(),
			index.channels_decoded(),
			index.channel_decode_failures(),
			index.skipped_records()
		);
		index
	}

	/// Indexes an archive export file of `<type>,<base64>` lines.
	///
	/// Blank lines are ignored; lines without a comma or with a non-numeric type are counted
	/// as skipped. Only I/O failures abort the pass.
	pub fn index_file(&self, sync_path: &str) -> Result<FingerprintIndex, std::io::Error> {
		let file = File::open(sync_path)?;
		let mut index = FingerprintIndex::new();
		for line in BufReader::new(file).lines() {
			let line = line?;
			if line.trim().is_empty() {
				continue;
			}
			let parsed = line
				.split_once(',')
				.and_then(|(type_field, payload)| {
					type_field.trim().parse::<u8>().ok().map(|message_type| (message_type, payload))
				});
			match parsed {
				Some((message_type, payload)) => self.index_record(
					&mut index,
					ArchiveRecord { message_type, raw: payload.trim().to_owned() },
				),
				None => {
					log_debug!(self.logger, "Skipping unusable archive line");
					index.note_skipped();
				},
			}
		}
		log_info!(
			self.logger,
			"Indexed {} unique nodes from {} ({} skipped records)",
			index.node_count(),
			sync_path,
			index.skipped_records()
		);
		Ok(index)
	}

	fn index_record(&self, index: &mut FingerprintIndex, record: ArchiveRecord) {
		if record.message_type == MSG_TYPE_CHANNEL_UPDATE {
			// Present in real archives, out of scope for fingerprinting
			log_gossip!(self.logger, "Skipping channel_update record");
			index.note_skipped();
			return;
		}
		match decode_record(&record) {
			Ok(GossipMessage::Node(announcement)) => {
				log_gossip!(
					self.logger,
					"Decoded node announcement for {} ({} feature bytes, {} addresses)",
					announcement.node_id,
					announcement.features.byte_len(),
					announcement.addresses.len()
				);
				index.add_node(announcement);
			},
			Ok(GossipMessage::Channel(announcement)) => {
				log_gossip!(
					self.logger,
					"Decoded channel announcement {}",
					announcement.short_channel_id
				);
				index.add_channel(&announcement);
			},
			Err(error) => match record.message_type {
				MSG_TYPE_NODE_ANNOUNCEMENT => {
					log_trace!(self.logger, "Undecodable node announcement: {}", error);
					index.note_node_failure();
				},
				MSG_TYPE_CHANNEL_ANNOUNCEMENT => {
					log_trace!(self.logger, "Undecodable channel announcement: {}", error);
					index.note_channel_failure();
				},
				message_type => {
					log_debug!(self.logger, "Skipping record of unknown type {}", message_type);
					index.note_skipped();
				},
			},
		}
	}
}
