//! Personalized PageRank over the reference graph, and redistribution of
//! file rank onto the `(file, identifier)` pairs its edges stand for.

use std::collections::HashMap;

use petgraph::visit::EdgeRef;

use crate::graph::ReferenceGraph;

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1.0e-6;

/// Why a ranking could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankError {
    #[error("reference graph has no nodes")]
    EmptyGraph,
    #[error("personalization vector sums to zero")]
    ZeroPersonalization,
    #[error("pagerank did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },
}

/// Compute personalized PageRank scores for every file in `graph`.
///
/// Edge weights are normalised per source file. Files absent from
/// `personalization` take the uniform value `1/N`; the vector is then
/// normalised to sum to one. Rank held by files without outgoing edges is
/// redistributed according to the same vector. Iteration stops once the L1
/// change drops below `N * 1e-6`.
///
/// # Errors
///
/// Returns [`RankError`] for an empty graph, an all-zero personalization, or
/// when 100 iterations pass without convergence.
///
/// # Examples
///
/// ```
/// use std::collections::{HashMap, HashSet};
/// use std::path::PathBuf;
/// use codemap_repomap::graph::ReferenceGraph;
/// use codemap_repomap::pagerank::pagerank;
/// use codemap_repomap::tags::{LineSpan, SymbolType, Tag, TagKind};
///
/// let tag = |file: &str, kind| Tag {
///     rel_path: file.into(),
///     path: PathBuf::from(file),
///     name: "foo".into(),
///     kind,
///     symbol_type: SymbolType::Function,
///     line: Some(LineSpan::new(0, 0)),
///     scope: None,
/// };
/// let tags = vec![tag("a.py", TagKind::Definition), tag("b.py", TagKind::Reference)];
/// let (graph, _) = ReferenceGraph::build(&tags, &HashSet::new());
/// let ranks = pagerank(&graph, &HashMap::new()).unwrap();
/// assert!(ranks["a.py"] > ranks["b.py"]);
/// ```
pub fn pagerank(
    graph: &ReferenceGraph,
    personalization: &HashMap<String, f64>,
) -> Result<HashMap<String, f64>, RankError> {
    let g = graph.inner();
    let n = g.node_count();
    if n == 0 {
        return Err(RankError::EmptyGraph);
    }
    let n_f64 = n as f64;

    let p = personalization_vector(graph, personalization)?;

    let mut out_weight = vec![0.0; n];
    for edge in g.edge_references() {
        out_weight[edge.source().index()] += edge.weight().weight;
    }
    let dangling: Vec<usize> = (0..n).filter(|&i| out_weight[i] <= 0.0).collect();

    let mut ranks = vec![1.0 / n_f64; n];

    for _ in 0..MAX_ITERATIONS {
        let last = ranks;
        ranks = vec![0.0; n];

        let dangling_sum: f64 = DAMPING * dangling.iter().map(|&i| last[i]).sum::<f64>();

        for edge in g.edge_references() {
            let from = edge.source().index();
            ranks[edge.target().index()] +=
                DAMPING * last[from] * edge.weight().weight / out_weight[from];
        }
        for (rank, weight) in ranks.iter_mut().zip(&p) {
            *rank += (dangling_sum + 1.0 - DAMPING) * weight;
        }

        let err: f64 = ranks.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if err < n_f64 * TOLERANCE {
            return Ok(g
                .node_indices()
                .map(|idx| (g[idx].clone(), ranks[idx.index()]))
                .collect());
        }
    }

    Err(RankError::NoConvergence {
        iterations: MAX_ITERATIONS,
    })
}

fn personalization_vector(
    graph: &ReferenceGraph,
    personalization: &HashMap<String, f64>,
) -> Result<Vec<f64>, RankError> {
    let g = graph.inner();
    let n = g.node_count() as f64;
    let uniform = 1.0 / n;

    let raw: Vec<f64> = g
        .node_indices()
        .map(|idx| {
            if personalization.is_empty() {
                uniform
            } else {
                personalization.get(&g[idx]).copied().unwrap_or(uniform)
            }
        })
        .collect();

    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err(RankError::ZeroPersonalization);
    }
    Ok(raw.into_iter().map(|v| v / total).collect())
}

/// Spread each file's rank over its outgoing edges, proportionally to edge
/// weight, and accumulate it per `(definer, identifier)`.
///
/// Files without outgoing edges contribute nothing, so the total distributed
/// equals the rank of files that have outgoing edges.
///
/// # Examples
///
/// ```
/// use std::collections::{HashMap, HashSet};
/// use std::path::PathBuf;
/// use codemap_repomap::graph::ReferenceGraph;
/// use codemap_repomap::pagerank::distribute;
/// use codemap_repomap::tags::{LineSpan, SymbolType, Tag, TagKind};
///
/// let tag = |file: &str, kind| Tag {
///     rel_path: file.into(),
///     path: PathBuf::from(file),
///     name: "foo".into(),
///     kind,
///     symbol_type: SymbolType::Function,
///     line: Some(LineSpan::new(0, 0)),
///     scope: None,
/// };
/// let tags = vec![tag("a.py", TagKind::Definition), tag("b.py", TagKind::Reference)];
/// let (graph, _) = ReferenceGraph::build(&tags, &HashSet::new());
/// let ranks: HashMap<String, f64> = [("a.py".into(), 0.6), ("b.py".into(), 0.4)].into();
/// let scores = distribute(&graph, &ranks);
/// assert_eq!(scores[&("a.py".to_string(), "foo".to_string())], 0.4);
/// ```
pub fn distribute(
    graph: &ReferenceGraph,
    ranks: &HashMap<String, f64>,
) -> HashMap<(String, String), f64> {
    let mut scores: HashMap<(String, String), f64> = HashMap::new();

    for file in graph.files() {
        let edges = graph.out_edges(file);
        let total: f64 = edges.iter().map(|(_, e)| e.weight).sum();
        if total <= 0.0 {
            continue;
        }
        let rank = ranks.get(file).copied().unwrap_or(0.0);
        for (to, edge) in edges {
            *scores
                .entry((to.to_string(), edge.symbol.clone()))
                .or_default() += rank * edge.weight / total;
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{LineSpan, SymbolType, Tag, TagKind};
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn tag(file: &str, name: &str, kind: TagKind) -> Tag {
        Tag {
            rel_path: file.into(),
            path: PathBuf::from(file),
            name: name.into(),
            kind,
            symbol_type: SymbolType::Function,
            line: Some(LineSpan::new(0, 0)),
            scope: None,
        }
    }

    fn chain() -> ReferenceGraph {
        // c -> b -> a, plus d -> a
        let tags = vec![
            tag("a.py", "alpha", TagKind::Definition),
            tag("b.py", "beta", TagKind::Definition),
            tag("b.py", "alpha", TagKind::Reference),
            tag("c.py", "beta", TagKind::Reference),
            tag("d.py", "alpha", TagKind::Reference),
        ];
        ReferenceGraph::build(&tags, &HashSet::new()).0
    }

    #[test]
    fn ranks_sum_to_one() {
        let ranks = pagerank(&chain(), &HashMap::new()).unwrap();
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 1e-6, "total = {total}");
        assert_eq!(ranks.len(), 4);
    }

    #[test]
    fn most_referenced_file_ranks_highest() {
        let ranks = pagerank(&chain(), &HashMap::new()).unwrap();
        let top = ranks
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(top.0, "a.py");
        assert!(ranks["b.py"] > ranks["c.py"]);
    }

    #[test]
    fn personalization_lifts_boosted_file() {
        let graph = chain();
        let plain = pagerank(&graph, &HashMap::new()).unwrap();
        let boosted: HashMap<String, f64> = [("d.py".to_string(), 25.0)].into();
        let personal = pagerank(&graph, &boosted).unwrap();
        assert!(personal["d.py"] > plain["d.py"]);
    }

    #[test]
    fn empty_graph_is_an_error() {
        let graph = ReferenceGraph::default();
        assert_eq!(
            pagerank(&graph, &HashMap::new()).unwrap_err(),
            RankError::EmptyGraph
        );
    }

    #[test]
    fn zero_personalization_is_an_error() {
        let graph = chain();
        let zeros: HashMap<String, f64> = graph.files().map(|f| (f.to_string(), 0.0)).collect();
        assert_eq!(
            pagerank(&graph, &zeros).unwrap_err(),
            RankError::ZeroPersonalization
        );
    }

    #[test]
    fn distribution_conserves_rank_of_referencing_files() {
        let graph = chain();
        let ranks = pagerank(&graph, &HashMap::new()).unwrap();
        let scores = distribute(&graph, &ranks);

        let distributed: f64 = scores.values().sum();
        let with_out_edges: f64 = graph
            .files()
            .filter(|f| !graph.out_edges(f).is_empty())
            .map(|f| ranks[f])
            .sum();
        assert!((distributed - with_out_edges).abs() < 1e-9);
    }

    #[test]
    fn distribution_splits_by_edge_weight() {
        let tags = vec![
            tag("a.py", "heavy", TagKind::Definition),
            tag("a.py", "light", TagKind::Definition),
            tag("b.py", "heavy", TagKind::Reference),
            tag("b.py", "heavy", TagKind::Reference),
            tag("b.py", "heavy", TagKind::Reference),
            tag("b.py", "heavy", TagKind::Reference),
            tag("b.py", "light", TagKind::Reference),
        ];
        let (graph, _) = ReferenceGraph::build(&tags, &HashSet::new());
        let ranks: HashMap<String, f64> = [("b.py".to_string(), 0.3)].into();
        let scores = distribute(&graph, &ranks);
        let heavy = scores[&("a.py".to_string(), "heavy".to_string())];
        let light = scores[&("a.py".to_string(), "light".to_string())];
        assert!((heavy - 0.2).abs() < 1e-12);
        assert!((light - 0.1).abs() < 1e-12);
    }
}
