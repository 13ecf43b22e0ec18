//! Stage A — hub detection (spec.md §4.4). PageRank over the directed
//! subgraph restricted to `HIGH_SIGNAL` relations, with hubs flagged by
//! (top `HUB_PERCENTILE`, in-degree >= `HUB_MIN_IN_DEGREE`).

use crate::config::FlowConfig;
use crate::graph::GraphEdge;
use std::collections::{BTreeMap, HashMap};

/// Runs weighted PageRank over the `is_high_signal()` edges only and
/// returns, for every node that appears in that subgraph, its rank and
/// in-degree. Nodes with no high-signal edges at all never appear here
/// (they cannot become hubs).
pub fn rank_high_signal_nodes(edges: &[GraphEdge], config: &FlowConfig) -> BTreeMap<String, (f64, u32)> {
    let high_signal: Vec<&GraphEdge> = edges.iter().filter(|e| e.relation.is_high_signal()).collect();
    if high_signal.is_empty() {
        return BTreeMap::new();
    }

    // Stable node ordering by path, independent of edge insertion order.
    let mut nodes: Vec<String> = high_signal
        .iter()
        .flat_map(|e| [e.source_file.clone(), e.target_file.clone()])
        .collect();
    nodes.sort();
    nodes.dedup();
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
    let n = nodes.len();

    let mut out_weight = vec![0.0_f64; n];
    let mut in_degree = vec![0_u32; n];
    // adjacency[i] = list of (j, weight) for edges i -> j
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for edge in &high_signal {
        let i = index[edge.source_file.as_str()];
        let j = index[edge.target_file.as_str()];
        adjacency[i].push((j, edge.weight));
        out_weight[i] += edge.weight;
        in_degree[j] += 1;
    }

    let damping = config.pagerank_damping;
    let mut rank = vec![1.0 / n as f64; n];
    for _ in 0..config.pagerank_iterations {
        let mut next = vec![(1.0 - damping) / n as f64; n];
        let mut dangling_mass = 0.0;
        for i in 0..n {
            if out_weight[i] <= 0.0 {
                dangling_mass += rank[i];
            }
        }
        for i in 0..n {
            if out_weight[i] <= 0.0 {
                continue;
            }
            for &(j, w) in &adjacency[i] {
                next[j] += damping * rank[i] * (w / out_weight[i]);
            }
        }
        // redistribute dangling mass uniformly, same damping treatment
        if dangling_mass > 0.0 {
            let share = damping * dangling_mass / n as f64;
            for slot in next.iter_mut() {
                *slot += share;
            }
        }
        rank = next;
    }

    nodes
        .into_iter()
        .enumerate()
        .map(|(i, path)| (path, (rank[i], in_degree[i])))
        .collect()
}

/// Returns the set of hub file paths: rank in the top `hub_percentile`
/// quantile *and* in-degree >= `hub_min_in_degree`.
pub fn detect_hubs(edges: &[GraphEdge], config: &FlowConfig) -> Vec<String> {
    let ranks = rank_high_signal_nodes(edges, config);
    if ranks.is_empty() {
        return Vec::new();
    }

    let mut sorted_ranks: Vec<f64> = ranks.values().map(|(r, _)| *r).collect();
    sorted_ranks.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted_ranks.len();
    // top `hub_percentile` quantile: at least the single highest-ranked node.
    let top_k = (((1.0 - config.hub_percentile) * n as f64).ceil() as usize).max(1).min(n);
    let threshold = sorted_ranks[n - top_k];

    let mut hubs: Vec<String> = ranks
        .iter()
        .filter(|(_, (rank, in_deg))| *rank >= threshold && *in_deg >= config.hub_min_in_degree)
        .map(|(path, _)| path.clone())
        .collect();
    hubs.sort();
    hubs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelationKind;

    #[test]
    fn empty_graph_yields_no_hubs() {
        let config = FlowConfig::default();
        assert!(detect_hubs(&[], &config).is_empty());
    }

    #[test]
    fn nine_files_pointing_at_one_model_makes_it_a_hub() {
        let config = FlowConfig::default();
        let mut edges = Vec::new();
        for i in 0..9 {
            edges.push(GraphEdge::new(
                format!("file_{i}.rb"),
                "app/models/user.rb",
                RelationKind::ModelAssociation,
                3.0,
                "app",
            ));
        }
        let hubs = detect_hubs(&edges, &config);
        assert_eq!(hubs, vec!["app/models/user.rb".to_string()]);
    }

    #[test]
    fn low_in_degree_node_never_becomes_a_hub() {
        let config = FlowConfig::default();
        let edges = vec![GraphEdge::new("a.rb", "b.rb", RelationKind::ModelAssociation, 3.0, "app")];
        assert!(detect_hubs(&edges, &config).is_empty());
    }
}
