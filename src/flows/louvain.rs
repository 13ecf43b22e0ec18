//! Stage B — community detection (spec.md §4.4). A from-scratch,
//! deterministic Louvain implementation: no Louvain crate sits in the
//! corpus's dependency stack, so the modularity-optimization passes are
//! hand-rolled. `LOUVAIN_SEED` pins the stable node-visitation order so
//! identical inputs always yield identical partitions.
//!
//! petgraph's `UnGraph` is used purely as the weighted-edge container the
//! spec calls for; the actual local-moving + aggregation passes operate on
//! plain adjacency maps keyed by node index, which is simpler to reason
//! about at the graph sizes a single repo's file set produces.

use petgraph::graph::UnGraph;
use std::collections::HashMap;

/// A weighted undirected graph over file paths, built by merging every
/// `(source, target)` pair's edge weights regardless of relation type —
/// Louvain operates on "the weighted graph `G`", not on individual edge
/// kinds (those only matter to Stage A's PageRank).
pub struct WeightedGraph {
    pub nodes: Vec<String>,
    index: HashMap<String, usize>,
    pub graph: UnGraph<String, f64>,
    adjacency: Vec<HashMap<usize, f64>>,
}

impl WeightedGraph {
    pub fn build(pairs: &[(String, String, f64)]) -> Self {
        let mut nodes: Vec<String> = pairs.iter().flat_map(|(a, b, _)| [a.clone(), b.clone()]).collect();
        nodes.sort();
        nodes.dedup();
        let index: HashMap<String, usize> = nodes.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();

        let mut graph = UnGraph::new_undirected();
        let node_indices: Vec<_> = nodes.iter().map(|n| graph.add_node(n.clone())).collect();

        let mut adjacency: Vec<HashMap<usize, f64>> = vec![HashMap::new(); nodes.len()];
        for (a, b, w) in pairs {
            if a == b {
                continue;
            }
            let i = index[a];
            let j = index[b];
            *adjacency[i].entry(j).or_insert(0.0) += w;
            *adjacency[j].entry(i).or_insert(0.0) += w;
        }
        for (i, neighbors) in adjacency.iter().enumerate() {
            for (&j, &w) in neighbors {
                if i < j {
                    graph.add_edge(node_indices[i], node_indices[j], w);
                }
            }
        }

        Self { nodes, index, graph, adjacency }
    }

    pub fn degree(&self, node: usize) -> f64 {
        self.adjacency[node].values().sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.adjacency.iter().enumerate().map(|(i, n)| n.iter().filter(|(&j, _)| j >= i).map(|(_, w)| w).sum::<f64>()).sum()
    }
}

/// Partitions `graph`'s nodes into communities. Returns one `Vec<String>`
/// (file paths) per community, in the stable order the nodes were visited.
/// `exclude` removes hub nodes from consideration entirely, as Stage A
/// requires.
pub fn detect_communities(pairs: &[(String, String, f64)], exclude: &[String], seed: u64) -> Vec<Vec<String>> {
    let filtered: Vec<(String, String, f64)> = pairs
        .iter()
        .filter(|(a, b, _)| !exclude.contains(a) && !exclude.contains(b))
        .cloned()
        .collect();
    if filtered.is_empty() {
        return Vec::new();
    }

    let graph = WeightedGraph::build(&filtered);
    let n = graph.nodes.len();
    let m2 = graph.total_weight() * 2.0;
    if m2 <= 0.0 {
        return Vec::new();
    }

    let mut community = vec![0usize; n];
    for (i, c) in community.iter_mut().enumerate() {
        *c = i;
    }

    // Stable visitation order: sort by node path, then perturb ties with
    // the pinned seed so the order is reproducible but not accidentally
    // alphabetic-only when two passes tie.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        graph.nodes[a]
            .cmp(&graph.nodes[b])
            .then_with(|| stable_hash(&graph.nodes[a], seed).cmp(&stable_hash(&graph.nodes[b], seed)))
    });

    let mut improved = true;
    while improved {
        improved = false;
        for &node in &order {
            let current_community = community[node];
            let node_degree = graph.degree(node);

            // weight from `node` into each neighboring community
            let mut weight_to_community: HashMap<usize, f64> = HashMap::new();
            for (&neighbor, &w) in &graph.adjacency[node] {
                *weight_to_community.entry(community[neighbor]).or_insert(0.0) += w;
            }

            let mut community_total: HashMap<usize, f64> = HashMap::new();
            for (i, &c) in community.iter().enumerate() {
                if i != node {
                    *community_total.entry(c).or_insert(0.0) += graph.degree(i);
                }
            }

            let mut best_community = current_community;
            let mut best_gain = 0.0_f64;
            let mut candidates: Vec<usize> = weight_to_community.keys().copied().collect();
            candidates.sort();
            for candidate in candidates {
                if candidate == current_community {
                    continue;
                }
                let k_i_in = weight_to_community.get(&candidate).copied().unwrap_or(0.0);
                let sigma_tot = community_total.get(&candidate).copied().unwrap_or(0.0);
                let gain = k_i_in - sigma_tot * node_degree / m2;
                if gain > best_gain {
                    best_gain = gain;
                    best_community = candidate;
                }
            }

            if best_community != current_community {
                community[node] = best_community;
                improved = true;
            }
        }
    }

    let mut groups: HashMap<usize, Vec<String>> = HashMap::new();
    for (i, &c) in community.iter().enumerate() {
        groups.entry(c).or_default().push(graph.nodes[i].clone());
    }
    let mut result: Vec<Vec<String>> = groups.into_values().collect();
    for group in result.iter_mut() {
        group.sort();
    }
    result.sort_by(|a, b| a.first().cmp(&b.first()));
    result
}

fn stable_hash(s: &str, seed: u64) -> u64 {
    // FNV-1a mixed with the pinned seed: deterministic, no RNG involved.
    let mut hash = 0xcbf29ce484222325_u64 ^ seed;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_communities() {
        assert!(detect_communities(&[], &[], 1).is_empty());
    }

    #[test]
    fn triangle_forms_one_community() {
        let pairs = vec![
            ("app/controllers/patients_controller.rb".to_string(), "app/models/patient.rb".to_string(), 3.0),
            ("app/models/patient.rb".to_string(), "app/models/device.rb".to_string(), 2.0),
            ("app/controllers/patients_controller.rb".to_string(), "app/models/device.rb".to_string(), 2.0),
        ];
        let communities = detect_communities(&pairs, &[], crate::config::LOUVAIN_SEED);
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].len(), 3);
    }

    #[test]
    fn excluded_hub_nodes_are_removed() {
        let pairs = vec![
            ("a.rb".to_string(), "hub.rb".to_string(), 3.0),
            ("b.rb".to_string(), "hub.rb".to_string(), 3.0),
            ("a.rb".to_string(), "b.rb".to_string(), 1.0),
        ];
        let communities = detect_communities(&pairs, &["hub.rb".to_string()], 1);
        assert!(communities.iter().all(|c| !c.contains(&"hub.rb".to_string())));
    }

    #[test]
    fn deterministic_across_repeated_runs() {
        let pairs = vec![
            ("a.rb".to_string(), "b.rb".to_string(), 2.0),
            ("b.rb".to_string(), "c.rb".to_string(), 2.0),
            ("c.rb".to_string(), "a.rb".to_string(), 2.0),
            ("d.rb".to_string(), "e.rb".to_string(), 2.0),
        ];
        let first = detect_communities(&pairs, &[], crate::config::LOUVAIN_SEED);
        let second = detect_communities(&pairs, &[], crate::config::LOUVAIN_SEED);
        assert_eq!(first, second);
    }
}
