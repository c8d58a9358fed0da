//! DHT ring interface and replica-set helpers.
//!
//! The overlay itself (membership, stabilization) lives outside this crate.
//! The transport only needs successor lookups and its own host name.

use std::collections::HashSet;
use std::fmt;

use ringchain_crypto::{blake2b_256, blake2b_256_multi};

use crate::NetworkError;

/// A virtual node on the ring. Several vnodes may share one host.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Vnode {
    pub host: String,
    pub id: [u8; 32],
}

impl Vnode {
    pub fn new(host: impl Into<String>, id: [u8; 32]) -> Self {
        Self {
            host: host.into(),
            id,
        }
    }
}

impl fmt::Debug for Vnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vnode({}, {:02x}{:02x}{:02x}{:02x})",
            self.host, self.id[0], self.id[1], self.id[2], self.id[3]
        )
    }
}

/// Successor lookups on a DHT ring.
pub trait Ring: Send + Sync {
    /// Up to `n` vnodes responsible for `key`, nearest first.
    fn lookup(&self, n: usize, key: &[u8]) -> Result<Vec<Vnode>, NetworkError>;

    /// The host name this node is known by on the ring.
    fn hostname(&self) -> &str;
}

/// Distinct hosts of `vnodes`, in first-seen order.
pub fn unique_hosts(vnodes: &[Vnode]) -> Vec<String> {
    let mut seen = HashSet::new();
    vnodes
        .iter()
        .filter(|v| seen.insert(v.host.as_str()))
        .map(|v| v.host.clone())
        .collect()
}

/// Hosts to contact for a replica set: distinct, and never this node.
pub fn replica_targets(vnodes: &[Vnode], self_host: &str) -> Vec<String> {
    unique_hosts(vnodes)
        .into_iter()
        .filter(|h| h != self_host)
        .collect()
}

/// A ring with fixed membership.
///
/// Each host gets `vnodes_per_host` positions at `Blake2b(host || index)`.
/// Keys are placed at `Blake2b(key)` and served by the next positions
/// clockwise. Stands in for a real overlay in the daemon and in tests.
pub struct StaticRing {
    hostname: String,
    vnodes: Vec<Vnode>,
}

impl StaticRing {
    /// Build a ring over `hostname` plus `peers`. Duplicate hosts are
    /// placed once.
    pub fn new<I, S>(hostname: impl Into<String>, peers: I, vnodes_per_host: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hostname = hostname.into();
        let mut hosts = vec![hostname.clone()];
        for peer in peers {
            let peer = peer.into();
            if !hosts.contains(&peer) {
                hosts.push(peer);
            }
        }

        let mut vnodes: Vec<Vnode> = hosts
            .iter()
            .flat_map(|host| {
                (0..vnodes_per_host.max(1) as u32).map(move |i| {
                    Vnode::new(
                        host.clone(),
                        blake2b_256_multi(&[host.as_bytes(), &i.to_be_bytes()]),
                    )
                })
            })
            .collect();
        vnodes.sort_by(|a, b| a.id.cmp(&b.id));

        Self { hostname, vnodes }
    }

    /// Every vnode, ordered by ring position.
    pub fn vnodes(&self) -> &[Vnode] {
        &self.vnodes
    }
}

impl Ring for StaticRing {
    fn lookup(&self, n: usize, key: &[u8]) -> Result<Vec<Vnode>, NetworkError> {
        if self.vnodes.is_empty() {
            return Err(NetworkError::Ring("ring has no members".into()));
        }
        let position = blake2b_256(key);
        let start = self.vnodes.partition_point(|v| v.id < position);
        Ok(self
            .vnodes
            .iter()
            .cycle()
            .skip(start)
            .take(n.min(self.vnodes.len()))
            .cloned()
            .collect())
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }
}
