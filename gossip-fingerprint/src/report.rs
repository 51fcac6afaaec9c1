//! The dashboard-facing output document.
//!
//! Field names and value formats are fixed: the dashboard consumes this JSON directly. Node
//! identifiers and bitmap bytes are fixed-width lowercase hex, timestamps are u32, ports u16.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::FingerprintIndex;

/// How many members a group lists in `sample_nodes` before truncating.
pub const SAMPLE_NODES_PER_GROUP: usize = 5;

/// One fingerprint group as the dashboard renders it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
	/// The shared bitmap bytes as lowercase hex, padding included. Empty string for an empty
	/// bitmap.
	pub features_hex: String,
	/// Decoded feature names, sorted alphabetically.
	pub feature_names: Vec<String>,
	/// Total members in the group.
	pub node_count: usize,
	/// The first members of the group, capped at [`SAMPLE_NODES_PER_GROUP`].
	pub sample_nodes: Vec<String>,
	/// Every member, in `node_id` order.
	pub all_nodes: Vec<String>,
}

/// The complete analysis document for one archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerprintReport {
	/// Per feature name, how many surviving nodes advertise it.
	pub feature_prevalence: BTreeMap<String, u64>,
	/// Fingerprint groups, largest first.
	pub fingerprint_groups: Vec<GroupSummary>,
	/// The number of distinct bitmap byte strings observed.
	pub total_unique_fingerprints: usize,
	/// The number of unique nodes surviving deduplication.
	pub total_nodes_parsed: usize,
	/// Node announcement records that failed to decode.
	pub node_parse_errors: u64,
	/// Channel announcements successfully decoded.
	pub channels_parsed: u64,
	/// Channel announcement records that failed to decode.
	pub channel_parse_errors: u64,
	/// Records skipped without decoding.
	pub skipped_records: u64,
	/// Per feature name, how many decoded channels advertise it. Usually sparse, since channel
	/// bitmaps are almost always empty.
	pub channel_feature_prevalence: BTreeMap<String, u64>,
	/// Distribution of feature bitmap wire lengths over surviving nodes.
	pub flen_histogram: BTreeMap<usize, u64>,
	/// Distribution of address descriptor types over surviving nodes.
	pub address_type_histogram: BTreeMap<String, u64>,
}

impl FingerprintReport {
	/// Builds the document from an accumulated index.
	pub fn from_index(index: &FingerprintIndex) -> FingerprintReport {
		let fingerprint_groups: Vec<GroupSummary> = index
			.fingerprint_groups()
			.into_iter()
			.map(|group| {
				let mut feature_names: Vec<String> =
					group.features.iter().map(|feature| feature.to_string()).collect();
				feature_names.sort();
				let all_nodes: Vec<String> =
					group.members.iter().map(|node_id| node_id.to_string()).collect();
				GroupSummary {
					features_hex: hex::encode(&group.features_raw),
					feature_names,
					node_count: group.members.len(),
					sample_nodes: all_nodes.iter().take(SAMPLE_NODES_PER_GROUP).cloned().collect(),
					all_nodes,
				}
			})
			.collect();
		FingerprintReport {
			feature_prevalence: index
				.feature_prevalence()
				.into_iter()
				.map(|(feature, count)| (feature.to_string(), count))
				.collect(),
			total_unique_fingerprints: fingerprint_groups.len(),
			total_nodes_parsed: index.node_count(),
			node_parse_errors: index.node_decode_failures(),
			channels_parsed: index.channels_decoded(),
			channel_parse_errors: index.channel_decode_failures(),
			skipped_records: index.skipped_records(),
			channel_feature_prevalence: index
				.channel_features()
				.iter()
				.map(|(feature, count)| (feature.to_string(), *count))
				.collect(),
			flen_histogram: index.flen_histogram(),
			address_type_histogram: index
				.address_type_histogram()
				.into_iter()
				.map(|(label, count)| (label.to_owned(), count))
				.collect(),
			fingerprint_groups,
		}
	}

	/// Serializes the document the way the dashboard ingests it.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}
}
