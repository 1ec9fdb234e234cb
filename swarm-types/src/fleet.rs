//! Fleet identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned identifier of one instance (e.g. `i-0abc123`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wrap a provider instance identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The persisted description of the single active fleet.
///
/// Written once when every node is running and replaced wholesale, never
/// edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetRecord {
    /// Login user on every node.
    pub owner: String,
    /// Name of the key pair; the private key lives at `<key_dir>/<key_name>.pem`.
    pub key_name: String,
    /// Availability zone the fleet was launched in.
    pub zone: String,
    /// Instances in launch order.
    pub instance_ids: Vec<InstanceId>,
}

impl FleetRecord {
    /// Create a fleet record.
    pub fn new(
        owner: impl Into<String>,
        key_name: impl Into<String>,
        zone: impl Into<String>,
        instance_ids: Vec<InstanceId>,
    ) -> Self {
        Self {
            owner: owner.into(),
            key_name: key_name.into(),
            zone: zone.into(),
            instance_ids,
        }
    }

    /// Number of nodes in the fleet.
    pub fn len(&self) -> usize {
        self.instance_ids.len()
    }

    /// True if the record lists no nodes.
    pub fn is_empty(&self) -> bool {
        self.instance_ids.is_empty()
    }

    /// Region the fleet's zone belongs to.
    pub fn region(&self) -> &str {
        region_from_zone(&self.zone)
    }
}

/// One reachable member of the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Provider instance identifier.
    pub id: InstanceId,
    /// Public DNS name or IP address.
    pub address: String,
    /// Position of the node within the fleet (0-based).
    pub index: usize,
}

impl Node {
    /// Create a node.
    pub fn new(id: InstanceId, address: impl Into<String>, index: usize) -> Self {
        Self {
            id,
            address: address.into(),
            index,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bee {} ({})", self.index, self.id)
    }
}

/// Derive a region from an availability zone by dropping the zone letter.
///
/// `us-east-1d` becomes `us-east-1`. Zones that do not end in a letter are
/// returned unchanged.
pub fn region_from_zone(zone: &str) -> &str {
    match zone.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => &zone[..zone.len() - 1],
        _ => zone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_strips_zone_letter() {
        assert_eq!(region_from_zone("us-east-1d"), "us-east-1");
        assert_eq!(region_from_zone("eu-west-2a"), "eu-west-2");
    }

    #[test]
    fn region_keeps_bare_region() {
        assert_eq!(region_from_zone("us-east-1"), "us-east-1");
        assert_eq!(region_from_zone(""), "");
    }

    #[test]
    fn fleet_record_json_roundtrip() {
        let record = FleetRecord::new(
            "ubuntu",
            "frontend",
            "us-east-1d",
            vec!["i-1".into(), "i-2".into(), "i-3".into()],
        );
        let json = serde_json::to_string(&record).unwrap();
        let restored: FleetRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.region(), "us-east-1");
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn instance_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&InstanceId::new("i-42")).unwrap();
        assert_eq!(json, "\"i-42\"");
    }

    #[test]
    fn node_display() {
        let node = Node::new("i-9".into(), "ec2.example.com", 3);
        assert_eq!(node.to_string(), "bee 3 (i-9)");
    }
}
