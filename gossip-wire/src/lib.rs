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

//! Wire-level decoding of archived Lightning gossip messages.
//!
//! Gossip archives store `node_announcement` and `channel_announcement` payloads with their
//! signatures stripped, so nothing here touches a curve or a chain: payloads are plain byte
//! buffers and decoding reconstructs the BOLT 7 field layout byte-for-byte. Feature bitmaps are
//! retained verbatim in addition to being decoded, because the exact byte sequence (padding
//! included) is the fingerprint identity downstream analysis groups nodes by.
//!
//! Decode failures are always local to a single message. The two failure modes are
//! [`DecodeError::ShortRead`] (a fixed- or declared-length read ran past the end of the buffer)
//! and [`DecodeError::BadLengthDescriptor`] (the buffer cannot possibly hold the message type's
//! fixed fields, or a length field overran it). A truncated or unrecognized trailing address
//! descriptor is not a failure at all; see [`ln::msgs::read_addresses`].
//!
//! [`DecodeError::ShortRead`]: ln::msgs::DecodeError::ShortRead
//! [`DecodeError::BadLengthDescriptor`]: ln::msgs::DecodeError::BadLengthDescriptor

pub mod ln;
pub mod util;
