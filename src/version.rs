//! SNMP protocol version.

/// SNMP version.
///
/// The wire value is what goes in the message header: 0 for v1, 1 for v2c
/// and 3 for v3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// SNMPv1 (RFC 1157). Rack PDUs are usually configured for this.
    #[default]
    V1,
    /// SNMPv2c (RFC 3416).
    V2c,
    /// SNMPv3. Accepted in configuration, refused when a session opens.
    V3,
}

impl Version {
    /// Wire value.
    pub fn as_i32(self) -> i32 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
            Version::V3 => 3,
        }
    }

    /// Parse a wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Version::V1),
            1 => Some(Version::V2c),
            3 => Some(Version::V3),
            _ => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::V1 => write!(f, "v1"),
            Version::V2c => write!(f, "v2c"),
            Version::V3 => write!(f, "v3"),
        }
    }
}

impl std::str::FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(Version::V1),
            "2c" | "v2c" => Ok(Version::V2c),
            "3" | "v3" => Ok(Version::V3),
            other => Err(format!("unknown SNMP version '{}'", other)),
        }
    }
}
