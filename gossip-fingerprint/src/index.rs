//! The deduplicating accumulator decoded records fold into, and the fingerprint partition
//! computed over it.
//!
//! The accumulator is a commutative monoid under [`FingerprintIndex::merge`]: splitting a batch
//! across workers, indexing the pieces and merging the results yields the same index as a single
//! sequential pass, except where two announcements for one node carry equal timestamps (the
//! earlier insertion wins, which under parallel merge depends on merge order).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use gossip_wire::ln::features::Feature;
use gossip_wire::ln::msgs::{ChannelAnnouncement, NodeAnnouncement, NodeId};

/// Accumulates decoded archive records for fingerprint analysis.
#[derive(Clone, Debug, Default)]
pub struct FingerprintIndex {
	nodes: BTreeMap<NodeId, NodeAnnouncement>,
	channel_features: BTreeMap<Feature, u64>,
	channels_decoded: u64,
	node_decode_failures: u64,
	channel_decode_failures: u64,
	skipped_records: u64,
}

/// One fingerprint partition cell: every surviving node whose feature bitmap bytes are
/// identical, zero padding included.
#[derive(Clone, Debug, PartialEq)]
pub struct FingerprintGroup {
	/// The exact bitmap bytes shared by every member.
	pub features_raw: Vec<u8>,
	/// The decoded feature names of the shared bitmap.
	pub features: Vec<Feature>,
	/// Members, in `node_id` order.
	pub members: Vec<NodeId>,
}

impl FingerprintIndex {
	/// Creates an empty index.
	pub fn new() -> FingerprintIndex {
		FingerprintIndex::default()
	}

	/// Folds in a node announcement, keeping at most one per `node_id`.
	///
	/// The announcement with the strictly greater timestamp survives; on a timestamp tie the
	/// incumbent is kept. Returns whether the given announcement was retained.
	pub fn add_node(&mut self, announcement: NodeAnnouncement) -> bool {
		match self.nodes.entry(announcement.node_id) {
			Entry::Vacant(entry) => {
				entry.insert(announcement);
				true
			},
			Entry::Occupied(mut entry) => {
				if announcement.timestamp > entry.get().timestamp {
					entry.insert(announcement);
					true
				} else {
					false
				}
			},
		}
	}

	/// Folds in a channel announcement. Channels are not retained individually; only their
	/// count and decoded feature names are aggregated.
	pub fn add_channel(&mut self, announcement: &ChannelAnnouncement) {
		self.channels_decoded += 1;
		for feature in announcement.features.decoded().keys() {
			*self.channel_features.entry(*feature).or_insert(0) += 1;
		}
	}

	/// Counts a node announcement record that failed to decode.
	pub fn note_node_failure(&mut self) {
		self.node_decode_failures += 1;
	}

	/// Counts a channel announcement record that failed to decode.
	pub fn note_channel_failure(&mut self) {
		self.channel_decode_failures += 1;
	}

	/// Counts a record that was never decoded: an unknown discriminant or an unusable line.
	pub fn note_skipped(&mut self) {
		self.skipped_records += 1;
	}

	/// Absorbs another index built from a disjoint or overlapping slice of the same archive.
	///
	/// The fold is associative and commutative up to equal-timestamp ties: the greatest
	/// timestamp per node wins across both indexes and all counters sum.
	pub fn merge(&mut self, other: FingerprintIndex) {
		for (_node_id, announcement) in other.nodes {
			self.add_node(announcement);
		}
		for (feature, count) in other.channel_features {
			*self.channel_features.entry(feature).or_insert(0) += count;
		}
		self.channels_decoded += other.channels_decoded;
		self.node_decode_failures += other.node_decode_failures;
		self.channel_decode_failures += other.channel_decode_failures;
		self.skipped_records += other.skipped_records;
	}

	/// The number of unique nodes surviving deduplication.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// The surviving announcement for a node, if any.
	pub fn node(&self, node_id: &NodeId) -> Option<&NodeAnnouncement> {
		self.nodes.get(node_id)
	}

	/// The number of channel announcements successfully decoded.
	pub fn channels_decoded(&self) -> u64 {
		self.channels_decoded
	}

	/// The number of node announcement records that failed to decode.
	pub fn node_decode_failures(&self) -> u64 {
		self.node_decode_failures
	}

	/// The number of channel announcement records that failed to decode.
	pub fn channel_decode_failures(&self) -> u64 {
		self.channel_decode_failures
	}

	/// The number of records skipped without decoding.
	pub fn skipped_records(&self) -> u64 {
		self.skipped_records
	}

	/// Feature name counts aggregated over decoded channel announcements.
	pub fn channel_features(&self) -> &BTreeMap<Feature, u64> {
		&self.channel_features
	}

	/// Partitions the surviving nodes by exact byte equality of their feature bitmaps.
	///
	/// Two nodes share a group iff their bitmap bytes are identical; a bitmap which differs
	/// only in trailing zero padding lands in a different group, since the padding itself is
	/// an implementation signal. Groups are ordered by descending member count; ties keep the
	/// order in which the fingerprints are first encountered while walking nodes in `node_id`
	/// order, so the output is deterministic for a given node set.
	pub fn fingerprint_groups(&self) -> Vec<FingerprintGroup> {
		let mut group_by_raw: HashMap<&[u8], usize> = HashMap::new();
		let mut groups: Vec<FingerprintGroup> = Vec::new();
		for (node_id, announcement) in &self.nodes {
			let raw = announcement.features.raw();
			let position = *group_by_raw.entry(raw).or_insert_with(|| {
				groups.push(FingerprintGroup {
					features_raw: raw.to_vec(),
					features: announcement.features.decoded().keys().copied().collect(),
					members: Vec::new(),
				});
				groups.len() - 1
			});
			groups[position].members.push(*node_id);
		}
		// Stable sort: equal-sized groups stay in first-encounter order
		groups.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
		groups
	}

	/// Counts, per feature name, how many surviving nodes advertise it at either level.
	pub fn feature_prevalence(&self) -> BTreeMap<Feature, u64> {
		let mut prevalence = BTreeMap::new();
		for announcement in self.nodes.values() {
			for feature in announcement.features.decoded().keys() {
				*prevalence.entry(*feature).or_insert(0) += 1;
			}
		}
		prevalence
	}

	/// Distribution of feature bitmap wire lengths over surviving nodes.
	pub fn flen_histogram(&self) -> BTreeMap<usize, u64> {
		let mut histogram = BTreeMap::new();
		for announcement in self.nodes.values() {
			*histogram.entry(announcement.features.byte_len()).or_insert(0) += 1;
		}
		histogram
	}

	/// Distribution of address descriptor types over surviving nodes' address lists.
	pub fn address_type_histogram(&self) -> BTreeMap<&'static str, u64> {
		let mut histogram = BTreeMap::new();
		for announcement in self.nodes.values() {
			for address in &announcement.addresses {
				*histogram.entry(address.type_label()).or_insert(0) += 1;
			}
		}
		histogram
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gossip_wire::ln::features::FeatureSet;
	use gossip_wire::ln::msgs::{ChainHash, NetAddress, NodeAlias};

	fn node_announcement(id: u8, timestamp: u32, features: Vec<u8>) -> NodeAnnouncement {
		NodeAnnouncement {
			features: FeatureSet::from_wire(features),
			timestamp,
			node_id: NodeId::from_bytes([id; 33]),
			rgb: [0; 3],
			alias: NodeAlias([0; 32]),
			addresses: Vec::new(),
		}
	}

	#[test]
	fn newest_announcement_survives_in_either_order() {
		let older = node_announcement(1, 100, vec![0x02]);
		let newer = node_announcement(1, 200, vec![0x00, 0x02]);

		let mut forward = FingerprintIndex::new();
		assert!(forward.add_node(older.clone()));
		assert!(forward.add_node(newer.clone()));

		let mut backward = FingerprintIndex::new();
		assert!(backward.add_node(newer.clone()));
		assert!(!backward.add_node(older));

		for index in [forward, backward] {
			assert_eq!(index.node_count(), 1);
			let survivor = index.node(&NodeId::from_bytes([1; 33])).unwrap();
			assert_eq!(survivor.timestamp, 200);
			assert_eq!(survivor.features.raw(), &[0x00, 0x02]);
		}
	}

	#[test]
	fn timestamp_tie_keeps_the_incumbent() {
		let first = node_announcement(1, 100, vec![0x02]);
		let second = node_announcement(1, 100, vec![0x22]);
		let mut index = FingerprintIndex::new();
		assert!(index.add_node(first));
		assert!(!index.add_node(second));
		assert_eq!(index.node(&NodeId::from_bytes([1; 33])).unwrap().features.raw(), &[0x02]);
	}

	#[test]
	fn identical_bitmap_bytes_share_a_group() {
		let mut index = FingerprintIndex::new();
		index.add_node(node_announcement(1, 1, vec![0x02, 0x22]));
		index.add_node(node_announcement(2, 1, vec![0x02, 0x22]));
		index.add_node(node_announcement(3, 1, vec![0x22]));

		let groups = index.fingerprint_groups();
		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].features_raw, vec![0x02, 0x22]);
		assert_eq!(groups[0].members.len(), 2);
		assert_eq!(groups[1].members, vec![NodeId::from_bytes([3; 33])]);
	}

	#[test]
	fn zero_padding_splits_groups() {
		let mut index = FingerprintIndex::new();
		index.add_node(node_announcement(1, 1, vec![0x02]));
		index.add_node(node_announcement(2, 1, vec![0x00, 0x02]));

		let groups = index.fingerprint_groups();
		assert_eq!(groups.len(), 2);
		// Same decoded names in both cells regardless
		assert_eq!(groups[0].features, groups[1].features);
	}

	#[test]
	fn group_order_is_descending_by_size_then_first_encounter() {
		let mut index = FingerprintIndex::new();
		index.add_node(node_announcement(1, 1, vec![0x01]));
		index.add_node(node_announcement(2, 1, vec![0x02]));
		index.add_node(node_announcement(3, 1, vec![0x02]));
		index.add_node(node_announcement(4, 1, vec![0x03]));

		let groups = index.fingerprint_groups();
		assert_eq!(groups[0].features_raw, vec![0x02]);
		// The singletons tie and keep node_id walk order
		assert_eq!(groups[1].features_raw, vec![0x01]);
		assert_eq!(groups[2].features_raw, vec![0x03]);
	}

	#[test]
	fn two_bitmaps_over_a_thousand_nodes_yield_two_groups() {
		let mut index = FingerprintIndex::new();
		for i in 0..1000u32 {
			let bitmap = if i % 3 == 0 { vec![0x02, 0x22] } else { vec![0x80, 0x00, 0x02] };
			let mut id = [0u8; 33];
			id[29..33].copy_from_slice(&i.to_be_bytes());
			index.add_node(NodeAnnouncement {
				features: FeatureSet::from_wire(bitmap),
				timestamp: i,
				node_id: NodeId::from_bytes(id),
				rgb: [0; 3],
				alias: NodeAlias([0; 32]),
				addresses: Vec::new(),
			});
		}
		let groups = index.fingerprint_groups();
		assert_eq!(groups.len(), 2);
		assert_eq!(groups.iter().map(|g| g.members.len()).sum::<usize>(), 1000);
		assert_eq!(groups[0].members.len(), 666);
		assert_eq!(groups[1].members.len(), 334);
	}

	#[test]
	fn merge_equals_sequential_indexing() {
		let announcements: Vec<NodeAnnouncement> = (0..20u8)
			.map(|i| node_announcement(i % 7, 1000 + i as u32, vec![i % 3]))
			.collect();

		let mut sequential = FingerprintIndex::new();
		for ann in &announcements {
			sequential.add_node(ann.clone());
			sequential.note_skipped();
		}

		let (left_half, right_half) = announcements.split_at(9);
		let mut left = FingerprintIndex::new();
		for ann in left_half {
			left.add_node(ann.clone());
			left.note_skipped();
		}
		let mut right = FingerprintIndex::new();
		for ann in right_half {
			right.add_node(ann.clone());
			right.note_skipped();
		}
		left.merge(right);

		assert_eq!(left.node_count(), sequential.node_count());
		assert_eq!(left.skipped_records(), sequential.skipped_records());
		assert_eq!(left.feature_prevalence(), sequential.feature_prevalence());
		assert_eq!(left.fingerprint_groups(), sequential.fingerprint_groups());
		for i in 0..7u8 {
			let node_id = NodeId::from_bytes([i; 33]);
			assert_eq!(
				left.node(&node_id).unwrap().timestamp,
				sequential.node(&node_id).unwrap().timestamp
			);
		}
	}

	#[test]
	fn channel_aggregation_counts_but_does_not_retain() {
		let mut index = FingerprintIndex::new();
		index.add_channel(&ChannelAnnouncement {
			features: FeatureSet::from_wire(vec![0x02]),
			chain_hash: ChainHash([0; 32]),
			short_channel_id: 1,
			node_id_1: NodeId::from_bytes([1; 33]),
			node_id_2: NodeId::from_bytes([2; 33]),
		});
		index.add_channel(&ChannelAnnouncement {
			features: FeatureSet::empty(),
			chain_hash: ChainHash([0; 32]),
			short_channel_id: 2,
			node_id_1: NodeId::from_bytes([1; 33]),
			node_id_2: NodeId::from_bytes([3; 33]),
		});
		assert_eq!(index.channels_decoded(), 2);
		assert_eq!(index.node_count(), 0);
		assert_eq!(index.channel_features().get(&Feature::DataLossProtect), Some(&1));
	}

	#[test]
	fn histograms_cover_surviving_nodes_only() {
		let mut index = FingerprintIndex::new();
		let mut with_addresses = node_announcement(1, 100, vec![0x02]);
		with_addresses.addresses = vec![
			NetAddress::IPv4 { addr: [127, 0, 0, 1], port: 9735 },
			NetAddress::OnionV3,
		];
		index.add_node(with_addresses);
		// Replaced by a newer announcement with different texture
		let mut replacement = node_announcement(1, 200, vec![0x00, 0x02]);
		replacement.addresses = vec![NetAddress::OnionV3];
		index.add_node(replacement);
		index.add_node(node_announcement(2, 100, vec![0x02]));

		assert_eq!(index.flen_histogram(), [(1, 1), (2, 1)].into_iter().collect());
		assert_eq!(index.address_type_histogram(), [("torv3", 1)].into_iter().collect());
		assert_eq!(index.feature_prevalence().get(&Feature::DataLossProtect), Some(&2));
	}
}
