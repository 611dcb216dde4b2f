//! SNMP message wrappers.
//!
//! Only community-based messages (v1 and v2c) are supported.

mod community;

pub use community::CommunityMessage;
