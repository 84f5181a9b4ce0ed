//! Statically configured provider records.

use dr_types::{AddrInfo, Cid, Multiaddr, PeerId};
use eyre::Context as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One provider and the content it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Content id strings.
    pub keys: Vec<String>,
    /// The provider's identity.
    pub peer_id: PeerId,
    /// Addresses in preference order.
    #[serde(default)]
    pub addrs: Vec<Multiaddr>,
}

/// A table of provider records loaded from YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticProviders {
    /// Records in file order.
    #[serde(default)]
    pub providers: Vec<ProviderRecord>,
}

impl StaticProviders {
    /// Build the lookup index.
    ///
    /// Keys are matched by multihash so any codec of the same content resolves.
    pub fn index(&self) -> eyre::Result<ProviderIndex> {
        let mut by_multihash: HashMap<Vec<u8>, Vec<AddrInfo>> = HashMap::new();
        for record in &self.providers {
            let info = AddrInfo::new(record.peer_id, record.addrs.clone());
            for key in &record.keys {
                let cid = Cid::try_from(key.as_str())
                    .wrap_err_with(|| format!("invalid content id {key:?}"))?;
                by_multihash.entry(cid.hash().to_bytes()).or_default().push(info.clone());
            }
        }
        debug!(target: "dr::config", keys = by_multihash.len(), "provider index built");
        Ok(ProviderIndex { by_multihash })
    }
}

/// Providers by content multihash.
#[derive(Debug, Clone, Default)]
pub struct ProviderIndex {
    by_multihash: HashMap<Vec<u8>, Vec<AddrInfo>>,
}

impl ProviderIndex {
    /// Record `info` as a provider of the content.
    ///
    /// An existing entry for the same peer is replaced in place.
    pub fn insert(&mut self, cid: &Cid, info: AddrInfo) {
        let entries = self.by_multihash.entry(cid.hash().to_bytes()).or_default();
        match entries.iter_mut().find(|existing| existing.id == info.id) {
            Some(existing) => *existing = info,
            None => entries.push(info),
        }
    }

    /// Providers of the content, in file order.
    pub fn lookup(&self, cid: &Cid) -> &[AddrInfo] {
        self.by_multihash.get(&cid.hash().to_bytes()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.by_multihash.len()
    }

    /// True if no keys are indexed.
    pub fn is_empty(&self) -> bool {
        self.by_multihash.is_empty()
    }
}
