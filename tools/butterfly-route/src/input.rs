//! Plain-text inputs for the CLI
//!
//! Edge lists hold one edge per line:
//!
//! ```text
//! # from to weight [both|forward|backward]
//! 0 1 4.5
//! 1 2 3 forward
//! ```
//!
//! Restriction files hold one rule per line:
//!
//! ```text
//! ban 0 1 2      # 0 -> 1 -> 2 forbidden
//! only 3 1 4     # arriving at 1 from 3, only 4 may follow
//! closed 7       # no path may pass through 7
//! ```
//!
//! Blank lines and `#` comments are ignored in both.

use std::path::Path;

use anyhow::{bail, Context, Result};
use butterfly_routing::graph::InputEdge;
use butterfly_routing::turns::{TurnRule, TurnRuleKind};
use butterfly_routing::{Direction, EdgeList, TurnRestrictionIndex, VertexId};

fn content_lines(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.split('#').next().unwrap_or("").trim();
        (!line.is_empty()).then(|| (i + 1, line.split_whitespace().collect()))
    })
}

fn vertex(field: &str, line: usize) -> Result<VertexId> {
    field
        .parse()
        .with_context(|| format!("line {line}: invalid vertex id {field:?}"))
}

pub fn parse_edge_list(text: &str) -> Result<EdgeList> {
    let mut edges = Vec::new();
    let mut max_vertex: Option<VertexId> = None;

    for (line, fields) in content_lines(text) {
        if !(3..=4).contains(&fields.len()) {
            bail!("line {line}: expected `from to weight [direction]`");
        }
        let from = vertex(fields[0], line)?;
        let to = vertex(fields[1], line)?;
        let weight: f32 = fields[2]
            .parse()
            .with_context(|| format!("line {line}: invalid weight {:?}", fields[2]))?;
        let direction = match fields.get(3).copied() {
            None | Some("both") => Direction::Both,
            Some("forward") => Direction::Forward,
            Some("backward") => Direction::Backward,
            Some(other) => bail!("line {line}: unknown direction {other:?}"),
        };
        max_vertex = max_vertex.max(Some(from.max(to)));
        edges.push(InputEdge {
            from,
            to,
            weight,
            direction,
        });
    }

    let vertex_count = max_vertex.map_or(0, |v| v + 1);
    Ok(EdgeList::from_edges(vertex_count, edges)?)
}

pub fn parse_restrictions(text: &str) -> Result<TurnRestrictionIndex> {
    let mut index = TurnRestrictionIndex::new();

    for (line, fields) in content_lines(text) {
        match fields.as_slice() {
            ["ban" | "only", from, via, to] => {
                let kind = if fields[0] == "ban" {
                    TurnRuleKind::Ban
                } else {
                    TurnRuleKind::Only
                };
                index.add_rule(TurnRule {
                    kind,
                    from: vertex(from, line)?,
                    via: vertex(via, line)?,
                    to: vertex(to, line)?,
                });
            }
            ["closed", v] => {
                let v = vertex(v, line)?;
                index.add_sequence(v, vec![v]);
            }
            _ => bail!("line {line}: expected `ban|only from via to` or `closed vertex`"),
        }
    }
    Ok(index)
}

pub fn read_edge_list(path: &Path) -> Result<EdgeList> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read edge list {}", path.display()))?;
    parse_edge_list(&text).with_context(|| format!("in {}", path.display()))
}

pub fn read_restrictions(path: &Path) -> Result<TurnRestrictionIndex> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read restrictions {}", path.display()))?;
    parse_restrictions(&text).with_context(|| format!("in {}", path.display()))
}

/// Comma-separated vertex ids, e.g. `0,4,17`
pub fn parse_vertex_list(s: &str) -> Result<Vec<VertexId>> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse()
                .with_context(|| format!("invalid vertex id {part:?}"))
        })
        .collect()
}
