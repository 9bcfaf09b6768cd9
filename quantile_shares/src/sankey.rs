use log::{debug, info};

use crate::merge::MergedRow;

#[derive(PartialEq, Debug, Clone)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// Nodes and weighted links of a flow diagram. Links refer to nodes by index.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct SankeyGraph {
    pub nodes: Vec<String>,
    pub links: Vec<SankeyLink>,
}

impl SankeyGraph {
    pub fn new() -> SankeyGraph {
        SankeyGraph::default()
    }

    /// The index of a node, added at the end if it is new.
    pub fn node(&mut self, name: &str) -> usize {
        match self.nodes.iter().position(|n| n == name) {
            Some(idx) => idx,
            None => {
                self.nodes.push(name.to_string());
                self.nodes.len() - 1
            }
        }
    }

    /// Adds a link if the value is known and strictly positive.
    pub fn add_flow(&mut self, source: &str, target: &str, value: Option<f64>) -> bool {
        match value {
            Some(v) if v > 0.0 && v.is_finite() => {
                let source = self.node(source);
                let target = self.node(target);
                self.links.push(SankeyLink {
                    source,
                    target,
                    value: v,
                });
                true
            }
            _ => {
                debug!(
                    "add_flow: skipping {:?} -> {:?} with value {:?}",
                    source, target, value
                );
                false
            }
        }
    }
}

/// Breakdown of one outflow into sub-series.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FlowBreakdown {
    pub parent: String,
    pub children: Vec<String>,
}

/// Describes the flows of income toward its uses, for one year.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FlowSpec {
    pub year: i32,
    /// The income buckets, in order.
    pub categories: Vec<String>,
    /// The series receiving the income of each bucket.
    pub outflows: Vec<String>,
    pub breakdown: Option<FlowBreakdown>,
}

/// Builds the flows from each income bucket to each outflow series, then from
/// the parent outflow to its sub-series (summed over the buckets).
///
/// The node list is the categories, then the outflows, then the sub-series,
/// whether or not they end up with links.
pub fn income_flows(rows: &[MergedRow], spec: &FlowSpec) -> SankeyGraph {
    let mut graph = SankeyGraph::new();
    for c in spec.categories.iter() {
        graph.node(c);
    }
    for o in spec.outflows.iter() {
        graph.node(o);
    }
    if let Some(b) = &spec.breakdown {
        graph.node(&b.parent);
        for c in b.children.iter() {
            graph.node(c);
        }
    }

    let year_rows: Vec<&MergedRow> = rows.iter().filter(|r| r.year == spec.year).collect();
    for c in spec.categories.iter() {
        let row = match year_rows.iter().find(|r| r.bucket == *c) {
            Some(r) => r,
            None => continue,
        };
        for o in spec.outflows.iter() {
            graph.add_flow(c, o, row.value(o));
        }
    }

    if let Some(b) = &spec.breakdown {
        for child in b.children.iter() {
            let values: Vec<Option<f64>> = year_rows
                .iter()
                .filter(|r| spec.categories.contains(&r.bucket))
                .map(|r| r.value(child))
                .collect();
            // Unknown as soon as one bucket is unknown.
            let total: Option<f64> = if values.is_empty() {
                None
            } else {
                values.iter().try_fold(0.0, |acc, v| v.map(|x| acc + x))
            };
            graph.add_flow(&b.parent, child, total);
        }
    }

    info!(
        "income_flows: year {}: {} nodes, {} links",
        spec.year,
        graph.nodes.len(),
        graph.links.len()
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(year: i32, bucket: &str, values: &[(&str, Option<f64>)]) -> MergedRow {
        MergedRow {
            year,
            bucket: bucket.to_string(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<String, Option<f64>>>(),
        }
    }

    #[test]
    fn buckets_flow_into_consumption_and_saving() {
        let rows = vec![
            row(2022, "0-20%", &[("PCE", Some(900.0)), ("PS", Some(-50.0)), ("Durable", Some(80.0))]),
            row(2022, "20-40%", &[("PCE", Some(1500.0)), ("PS", Some(100.0)), ("Durable", Some(120.0))]),
            row(2021, "0-20%", &[("PCE", Some(1.0)), ("PS", Some(1.0)), ("Durable", Some(1.0))]),
        ];
        let spec = FlowSpec {
            year: 2022,
            categories: vec!["0-20%".to_string(), "20-40%".to_string()],
            outflows: vec!["PCE".to_string(), "PS".to_string()],
            breakdown: Some(FlowBreakdown {
                parent: "PCE".to_string(),
                children: vec!["Durable".to_string(), "Services".to_string()],
            }),
        };
        let graph = income_flows(&rows, &spec);
        assert_eq!(graph.nodes, vec!["0-20%", "20-40%", "PCE", "PS", "Durable", "Services"]);
        let links: Vec<(usize, usize, f64)> = graph
            .links
            .iter()
            .map(|l| (l.source, l.target, l.value))
            .collect();
        assert_eq!(
            links,
            vec![
                (0, 2, 900.0),
                // Negative saving of the first bucket is not a flow.
                (1, 2, 1500.0),
                (1, 3, 100.0),
                (2, 4, 200.0),
            ]
        );
    }

    #[test]
    fn nodes_are_interned() {
        let mut g = SankeyGraph::new();
        assert_eq!(g.node("a"), 0);
        assert_eq!(g.node("b"), 1);
        assert_eq!(g.node("a"), 0);
        assert!(!g.add_flow("a", "b", None));
        assert!(!g.add_flow("a", "b", Some(0.0)));
        assert!(g.add_flow("a", "c", Some(2.5)));
        assert_eq!(g.nodes.len(), 3);
    }
}
