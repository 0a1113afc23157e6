//! Network topology: nodes, heterogeneous links, and shortest paths.
//!
//! The backbone (cloud and edge data centers) is a static directed graph
//! built once before the simulation loop; all-pairs shortest paths over
//! propagation latency are memoized at build time. Edge devices hang off
//! the backbone through a pair of access links (uplink and downlink) whose
//! data-center endpoint can be re-pointed in O(1) as the device moves,
//! without invalidating the memoized backbone paths.

use crate::node::NodeId;
use crate::transfer::TransferId;
use serde::{Deserialize, Serialize};
use std::collections::{BinaryHeap, HashMap, HashSet};

pub type LinkId = usize;

/// Physical flavor of a network link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Wan,
    Man,
    Lan,
    Wifi,
    Cellular,
    Ethernet,
}

impl LinkType {
    pub const ALL: [LinkType; 6] = [
        LinkType::Wan,
        LinkType::Man,
        LinkType::Lan,
        LinkType::Wifi,
        LinkType::Cellular,
        LinkType::Ethernet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LinkType::Wan => "wan",
            LinkType::Man => "man",
            LinkType::Lan => "lan",
            LinkType::Wifi => "wifi",
            LinkType::Cellular => "cellular",
            LinkType::Ethernet => "ethernet",
        }
    }
}

/// Parse a link type name as written in configuration files.
pub fn parse_link_type(name: &str) -> Option<LinkType> {
    LinkType::ALL.iter().copied().find(|t| t.name() == name)
}

/// A directed link. Capacity and propagation latency are immutable; the
/// achieved rate of any one transfer varies with contention, tracked through
/// the `active` set by the transfer engine.
#[derive(Debug, Clone)]
pub struct NetworkLink {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub link_type: LinkType,
    /// Capacity in bits per second.
    pub bandwidth_bps: f64,
    /// Propagation latency in seconds.
    pub latency_s: f64,
    /// Joules consumed per bit carried.
    pub energy_per_bit_j: f64,
    /// Transfers currently flowing over this link.
    pub active: HashSet<TransferId>,
    /// Total bits carried, for network usage reporting.
    pub bits_carried: f64,
    /// Total joules consumed carrying them.
    pub energy_consumed_j: f64,
}

impl NetworkLink {
    /// Fair share of capacity for one of the currently active transfers.
    pub fn fair_share_bps(&self) -> f64 {
        if self.active.is_empty() {
            self.bandwidth_bps
        } else {
            self.bandwidth_bps / self.active.len() as f64
        }
    }
}

/// Access links tying one device to the backbone. The data-center endpoint
/// is `None` while the device is out of coverage.
#[derive(Debug, Clone, Copy)]
struct DeviceAttachment {
    up: LinkId,
    down: LinkId,
    dc: Option<NodeId>,
}

/// The topology graph. Backbone paths are memoized; device paths compose
/// the device's current access link with a memoized backbone segment.
#[derive(Debug, Default)]
pub struct Topology {
    links: Vec<NetworkLink>,
    /// Outgoing backbone links per infrastructure node.
    adjacency: HashMap<NodeId, Vec<LinkId>>,
    attachments: HashMap<NodeId, DeviceAttachment>,
    /// Memoized backbone shortest paths, keyed by (from, to).
    backbone_paths: HashMap<(NodeId, NodeId), Vec<LinkId>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an infrastructure node (cloud or edge data center) so it
    /// participates in backbone path computation.
    pub fn add_infrastructure_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    /// Add one directed backbone link.
    pub fn add_backbone_link(
        &mut self,
        from: NodeId,
        to: NodeId,
        link_type: LinkType,
        bandwidth_bps: f64,
        latency_s: f64,
        energy_per_bit_j: f64,
    ) -> LinkId {
        let id = self.links.len();
        self.links.push(NetworkLink {
            id,
            from,
            to,
            link_type,
            bandwidth_bps,
            latency_s,
            energy_per_bit_j,
            active: HashSet::new(),
            bits_carried: 0.0,
            energy_consumed_j: 0.0,
        });
        self.adjacency.entry(from).or_default().push(id);
        self.adjacency.entry(to).or_default();
        id
    }

    /// Create the access link pair for a device, initially disconnected.
    /// The data-center endpoint of both links is re-pointed on attachment.
    pub fn add_device(
        &mut self,
        device: NodeId,
        link_type: LinkType,
        bandwidth_bps: f64,
        latency_s: f64,
        energy_per_bit_up_j: f64,
        energy_per_bit_down_j: f64,
    ) {
        let up = self.links.len();
        self.links.push(NetworkLink {
            id: up,
            from: device,
            to: device, // re-pointed on attach
            link_type,
            bandwidth_bps,
            latency_s,
            energy_per_bit_j: energy_per_bit_up_j,
            active: HashSet::new(),
            bits_carried: 0.0,
            energy_consumed_j: 0.0,
        });
        let down = self.links.len();
        self.links.push(NetworkLink {
            id: down,
            from: device,
            to: device,
            link_type,
            bandwidth_bps,
            latency_s,
            energy_per_bit_j: energy_per_bit_down_j,
            active: HashSet::new(),
            bits_carried: 0.0,
            energy_consumed_j: 0.0,
        });
        self.attachments
            .insert(device, DeviceAttachment { up, down, dc: None });
    }

    /// Re-point a device's access links at a new data center, or detach it
    /// when the device is out of coverage. O(1); memoized backbone paths are
    /// untouched and access link ids are stable, so in-flight transfers over
    /// them survive a handover.
    pub fn reattach_device(&mut self, device: NodeId, dc: Option<NodeId>) {
        let attachment = self
            .attachments
            .get_mut(&device)
            .unwrap_or_else(|| panic!("node {device:?} has no access links"));
        attachment.dc = dc;
        let anchor = dc.unwrap_or(device);
        self.links[attachment.up].to = anchor;
        self.links[attachment.down].from = anchor;
    }

    /// Data center the device is currently attached to, if any.
    pub fn attachment_of(&self, device: NodeId) -> Option<NodeId> {
        self.attachments.get(&device).and_then(|a| a.dc)
    }

    pub fn is_device(&self, node: NodeId) -> bool {
        self.attachments.contains_key(&node)
    }

    /// Memoize all-pairs backbone shortest paths. Call once after the
    /// backbone is built; device attachment changes never require a rebuild.
    pub fn compute_backbone_paths(&mut self) {
        let nodes: Vec<NodeId> = self.adjacency.keys().copied().collect();
        for &source in &nodes {
            let tree = self.dijkstra(source);
            for &target in &nodes {
                if let Some(path) = self.reconstruct(&tree, source, target) {
                    self.backbone_paths.insert((source, target), path);
                }
            }
        }
    }

    /// Walk the predecessor tree back from `target` to `source`.
    fn reconstruct(
        &self,
        tree: &HashMap<NodeId, LinkId>,
        source: NodeId,
        target: NodeId,
    ) -> Option<Vec<LinkId>> {
        if source == target {
            return Some(Vec::new());
        }
        let mut path = Vec::new();
        let mut current = target;
        while current != source {
            let link_id = *tree.get(&current)?;
            path.push(link_id);
            current = self.links[link_id].from;
        }
        path.reverse();
        Some(path)
    }

    /// Shortest path from a backbone node, as a map target -> incoming link.
    fn dijkstra(&self, source: NodeId) -> HashMap<NodeId, LinkId> {
        #[derive(PartialEq)]
        struct State {
            cost: f64,
            node: NodeId,
        }
        impl Eq for State {}
        impl PartialOrd for State {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for State {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                other
                    .cost
                    .total_cmp(&self.cost)
                    .then(other.node.0.cmp(&self.node.0))
            }
        }

        let mut dist: HashMap<NodeId, f64> = HashMap::new();
        let mut previous: HashMap<NodeId, LinkId> = HashMap::new();
        let mut heap = BinaryHeap::new();
        dist.insert(source, 0.0);
        heap.push(State {
            cost: 0.0,
            node: source,
        });

        while let Some(State { cost, node }) = heap.pop() {
            if cost > dist.get(&node).copied().unwrap_or(f64::INFINITY) {
                continue;
            }
            let Some(out) = self.adjacency.get(&node) else {
                continue;
            };
            for &link_id in out {
                let link = &self.links[link_id];
                let next_cost = cost + link.latency_s;
                if next_cost < dist.get(&link.to).copied().unwrap_or(f64::INFINITY) {
                    dist.insert(link.to, next_cost);
                    previous.insert(link.to, link_id);
                    heap.push(State {
                        cost: next_cost,
                        node: link.to,
                    });
                }
            }
        }
        previous
    }

    /// Ordered list of links from `from` to `to`, or `None` when no route
    /// exists (including a detached device at either end). An empty path
    /// means the endpoints are the same node.
    pub fn path(&self, from: NodeId, to: NodeId) -> Option<Vec<LinkId>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut path = Vec::new();
        let src_anchor = match self.attachments.get(&from) {
            Some(attachment) => {
                let dc = attachment.dc?;
                path.push(attachment.up);
                dc
            }
            None => from,
        };
        let (dst_anchor, last_hop) = match self.attachments.get(&to) {
            Some(attachment) => (attachment.dc?, Some(attachment.down)),
            None => (to, None),
        };

        if src_anchor != dst_anchor {
            let backbone = self.backbone_paths.get(&(src_anchor, dst_anchor))?;
            path.extend_from_slice(backbone);
        }
        if let Some(down) = last_hop {
            path.push(down);
        }
        Some(path)
    }

    /// Total propagation latency along a path, applied once at flow start.
    pub fn path_latency(&self, path: &[LinkId]) -> f64 {
        path.iter().map(|&id| self.links[id].latency_s).sum()
    }

    pub fn link(&self, id: LinkId) -> &NetworkLink {
        &self.links[id]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut NetworkLink {
        &mut self.links[id]
    }

    pub fn links(&self) -> &[NetworkLink] {
        &self.links
    }

    pub fn links_by_type(&self, link_type: LinkType) -> impl Iterator<Item = &NetworkLink> {
        self.links.iter().filter(move |l| l.link_type == link_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_dc_backbone() -> Topology {
        // cloud(0) -- dc1(1) -- dc2(2), links both ways
        let mut topo = Topology::new();
        for i in 0..3 {
            topo.add_infrastructure_node(NodeId(i));
        }
        for (a, b, latency) in [(0usize, 1usize, 0.1), (1, 2, 0.005)] {
            topo.add_backbone_link(NodeId(a), NodeId(b), LinkType::Wan, 1e9, latency, 1e-9);
            topo.add_backbone_link(NodeId(b), NodeId(a), LinkType::Wan, 1e9, latency, 1e-9);
        }
        topo.compute_backbone_paths();
        topo
    }

    #[test]
    fn test_backbone_path_and_latency() {
        let topo = three_dc_backbone();
        let path = topo.path(NodeId(0), NodeId(2)).unwrap();
        assert_eq!(path.len(), 2);
        assert!((topo.path_latency(&path) - 0.105).abs() < 1e-12);
    }

    #[test]
    fn test_path_to_self_is_empty() {
        let topo = three_dc_backbone();
        assert_eq!(topo.path(NodeId(1), NodeId(1)), Some(Vec::new()));
    }

    #[test]
    fn test_device_path_composes_access_and_backbone() {
        let mut topo = three_dc_backbone();
        let device = NodeId(10);
        topo.add_device(device, LinkType::Wifi, 1e8, 0.002, 2e-9, 1e-9);
        topo.reattach_device(device, Some(NodeId(2)));

        // device -> cloud: uplink + dc2->dc1 + dc1->cloud
        let path = topo.path(device, NodeId(0)).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(topo.link(path[0]).link_type, LinkType::Wifi);

        // cloud -> device ends on the downlink
        let back = topo.path(NodeId(0), device).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(topo.link(*back.last().unwrap()).link_type, LinkType::Wifi);
    }

    #[test]
    fn test_detached_device_has_no_path() {
        let mut topo = three_dc_backbone();
        let device = NodeId(10);
        topo.add_device(device, LinkType::Cellular, 1e8, 0.002, 2e-9, 1e-9);
        assert_eq!(topo.path(device, NodeId(0)), None);
        assert_eq!(topo.path(NodeId(0), device), None);
    }

    #[test]
    fn test_reattach_is_transparent_to_backbone_paths() {
        let mut topo = three_dc_backbone();
        let device = NodeId(10);
        topo.add_device(device, LinkType::Wifi, 1e8, 0.002, 2e-9, 1e-9);
        topo.reattach_device(device, Some(NodeId(1)));
        let before = topo.path(device, NodeId(0)).unwrap();
        assert_eq!(before.len(), 2);

        topo.reattach_device(device, Some(NodeId(2)));
        let after = topo.path(device, NodeId(0)).unwrap();
        assert_eq!(after.len(), 3);
        // Same uplink id before and after the handover.
        assert_eq!(before[0], after[0]);
    }

    #[test]
    fn test_links_by_type() {
        let mut topo = three_dc_backbone();
        topo.add_device(NodeId(10), LinkType::Wifi, 1e8, 0.002, 2e-9, 1e-9);
        assert_eq!(topo.links_by_type(LinkType::Wan).count(), 4);
        assert_eq!(topo.links_by_type(LinkType::Wifi).count(), 2);
        assert_eq!(topo.links_by_type(LinkType::Man).count(), 0);
    }
}
