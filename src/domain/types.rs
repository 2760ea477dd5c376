//! Identifier types for proof retrieval
//!
//! A node-level id (`hash_id_node`) is what clients hold. Every node id maps
//! to a core-level id (`hash_id_core`) living on exactly one shard host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::{Uuid, Variant, Version};

/// Length of the hyphenated UUID text form
const HYPHENATED_LEN: usize = 36;

/// 100ns ticks between the Gregorian epoch (1582-10-15) and the Unix epoch
const GREGORIAN_TO_UNIX_TICKS: i64 = 0x01B2_1DD2_1381_4000;

/// Client-visible proof identifier.
///
/// Always an RFC 4122 version 1 (time-based) UUID in hyphenated form, so the
/// submission time can be recovered from the id itself. The text is kept as
/// the client sent it and is what the gateway echoes and looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashIdNode {
    uuid: Uuid,
    raw: [u8; HYPHENATED_LEN],
}

impl HashIdNode {
    /// Parse a node id: `xxxxxxxx-xxxx-1xxx-[89ab]xxx-xxxxxxxxxxxx`, any case.
    pub fn parse(value: &str) -> Option<Self> {
        let raw: [u8; HYPHENATED_LEN] = value.as_bytes().try_into().ok()?;
        let hyphens_in_place = raw.iter().enumerate().all(|(i, b)| {
            matches!(i, 8 | 13 | 18 | 23) == (*b == b'-')
        });
        if !hyphens_in_place {
            return None;
        }

        let uuid = Uuid::try_parse(value).ok()?;
        Self::is_v1(&uuid).then_some(Self { uuid, raw })
    }

    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        let mut raw = [0u8; HYPHENATED_LEN];
        uuid.hyphenated().encode_lower(&mut raw);
        Self::is_v1(&uuid).then_some(Self { uuid, raw })
    }

    fn is_v1(uuid: &Uuid) -> bool {
        uuid.get_version() == Some(Version::Mac) && uuid.get_variant() == Variant::RFC4122
    }

    /// The id exactly as the client supplied it.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.raw).unwrap_or_default()
    }

    /// Time embedded in the id, truncated to whole seconds.
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        let (time_low, time_mid, time_hi_and_version, _) = self.uuid.as_fields();
        let ticks = (u64::from(time_hi_and_version & 0x0FFF) << 48)
            | (u64::from(time_mid) << 32)
            | u64::from(time_low);

        let unix_ticks = i64::try_from(ticks).ok()? - GREGORIAN_TO_UNIX_TICKS;
        DateTime::from_timestamp(unix_ticks.div_euclid(10_000_000), 0)
    }

    /// `submitted_at` rendered as ISO 8601 without fractional seconds.
    pub fn submitted_at_iso8601(&self) -> Option<String> {
        self.submitted_at()
            .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    /// True when `other` names this id, ignoring case.
    pub fn matches(&self, other: &str) -> bool {
        Uuid::try_parse(other.trim())
            .map(|uuid| uuid == self.uuid)
            .unwrap_or(false)
    }
}

impl fmt::Display for HashIdNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for HashIdNode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a version 1 uuid: {value}"))
    }
}

impl From<HashIdNode> for String {
    fn from(id: HashIdNode) -> Self {
        id.to_string()
    }
}

/// Shard-side proof identifier. Opaque to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashIdCore(pub String);

impl HashIdCore {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashIdCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shard (Core) host name, `host`, `host:port` or a full base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardHost(pub String);

impl ShardHost {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the core proof for a node id lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoreLocation {
    pub hash_id_core: HashIdCore,
    pub shard_host: ShardHost,
}

impl CoreLocation {
    pub fn new(hash_id_core: HashIdCore, shard_host: ShardHost) -> Self {
        Self {
            hash_id_core,
            shard_host,
        }
    }

    /// Parse a lookup value of the form `<hash_id_core>:<shard_host>`.
    ///
    /// Splits at the first `:` so hosts carrying a port survive.
    pub fn parse_lookup_value(value: &str) -> Option<Self> {
        let (core, host) = value.split_once(':')?;
        let (core, host) = (core.trim(), host.trim());
        if core.is_empty() || host.is_empty() {
            return None;
        }
        Some(Self::new(HashIdCore::new(core), ShardHost::new(host)))
    }
}

/// Response representation selected by content negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProofFormat {
    /// Proof objects embedded as JSON-LD.
    #[default]
    JsonLd,
    /// Proofs as base64 encoded binary.
    Base64,
}

impl ProofFormat {
    pub const JSONLD_MIME_TYPE: &'static str = "application/vnd.chainpoint.ld+json";
    pub const BASE64_MIME_TYPE: &'static str = "application/vnd.chainpoint.json+base64";
}
