//! DAG-JSON special forms for bytes and links.
//!
//! JSON has no native byte string or link type. DAG-JSON reserves the `"/"` key for both:
//!
//! - bytes: `{"/":{"bytes":"<base64, standard alphabet, no padding>"}}`
//! - links: `{"/":"<cid string>"}`

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use cid::Cid;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A byte string in its DAG-JSON text form.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct DagJsonBytes(Vec<u8>);

impl DagJsonBytes {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the raw bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// True if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for DagJsonBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for DagJsonBytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl AsRef<[u8]> for DagJsonBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DagJsonBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DagJsonBytes({})", STANDARD_NO_PAD.encode(&self.0))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BytesNode {
    #[serde(rename = "/")]
    slash: BytesInner,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BytesInner {
    bytes: String,
}

impl Serialize for DagJsonBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BytesNode { slash: BytesInner { bytes: STANDARD_NO_PAD.encode(&self.0) } }
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DagJsonBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = BytesNode::deserialize(deserializer)?;
        // padding is not canonical but some encoders emit it
        let encoded = node.slash.bytes.trim_end_matches('=');
        STANDARD_NO_PAD.decode(encoded).map(Self).map_err(de::Error::custom)
    }
}

/// A content link in its DAG-JSON text form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DagJsonLink(pub Cid);

impl DagJsonLink {
    /// The linked content id.
    pub fn cid(&self) -> &Cid {
        &self.0
    }
}

impl From<Cid> for DagJsonLink {
    fn from(value: Cid) -> Self {
        Self(value)
    }
}

impl From<DagJsonLink> for Cid {
    fn from(value: DagJsonLink) -> Self {
        value.0
    }
}

impl fmt::Debug for DagJsonLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DagJsonLink({})", self.0)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkNode {
    #[serde(rename = "/")]
    slash: String,
}

impl Serialize for DagJsonLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LinkNode { slash: self.0.to_string() }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DagJsonLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = LinkNode::deserialize(deserializer)?;
        Cid::try_from(node.slash.as_str()).map(Self).map_err(de::Error::custom)
    }
}
