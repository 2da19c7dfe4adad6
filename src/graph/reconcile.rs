//! Applies a parsed result set to the entity store.

use std::collections::HashSet;

use log::{debug, warn};

use super::parser::ParsedGraph;
use super::store::EntityStore;
use super::types::{EdgeId, NodeId};

/// How a result set replaces what the store holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
	/// Drop every persisted entity, then insert the result set.
	FullReplace,
	/// Drop persisted entities absent from the result set, upsert the rest.
	#[default]
	IncrementalMerge,
}

impl ReconcilePolicy {
	/// Policy selected by the `clear` flag of a load.
	pub fn from_clear_flag(clear: bool) -> Self {
		if clear {
			ReconcilePolicy::FullReplace
		} else {
			ReconcilePolicy::IncrementalMerge
		}
	}
}

/// Counts of what a reconciliation changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Nodes inserted or replaced.
	pub nodes_upserted: usize,
	/// Nodes dropped.
	pub nodes_removed: usize,
	/// Edges inserted or replaced.
	pub edges_upserted: usize,
	/// Edges dropped.
	pub edges_removed: usize,
	/// Edges left out because an endpoint is not in the store.
	pub edges_dangling: usize,
}

/// Bring `store` in line with `parsed` under `policy`.
///
/// Transient nodes survive every pass. Edges are only kept or inserted when
/// both endpoints exist once the node pass is done.
pub fn reconcile(store: &mut EntityStore, parsed: ParsedGraph, policy: ReconcilePolicy) -> ReconcileReport {
	let ParsedGraph { nodes, edges, .. } = parsed;
	let mut report = ReconcileReport::default();

	let node_ids: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
	let edge_ids: HashSet<EdgeId> = edges.iter().map(|e| e.id).collect();

	let removed = match policy {
		ReconcilePolicy::FullReplace => store.nodes.remove_where(|n| !n.is_transient()),
		ReconcilePolicy::IncrementalMerge => store
			.nodes
			.remove_where(|n| !n.is_transient() && !node_ids.contains(&n.id)),
	};
	report.nodes_removed = removed.len();
	report.nodes_upserted = node_ids.len();
	store.nodes.update_batch(nodes);

	let (kept, dangling): (Vec<_>, Vec<_>) = edges
		.into_iter()
		.partition(|e| store.nodes.contains(&e.from) && store.nodes.contains(&e.to));
	for edge in &dangling {
		warn!(
			"dropping edge {} ({} -> {}): endpoint not loaded",
			edge.id, edge.from, edge.to
		);
	}
	report.edges_dangling = dangling.len();

	let nodes = &store.nodes;
	let removed = store.edges.remove_where(|e| {
		let stale = match policy {
			ReconcilePolicy::FullReplace => true,
			ReconcilePolicy::IncrementalMerge => !edge_ids.contains(&e.id),
		};
		stale || !nodes.contains(&e.from) || !nodes.contains(&e.to)
	});
	report.edges_removed = removed.len();
	report.edges_upserted = kept.iter().map(|e| e.id).collect::<HashSet<_>>().len();
	store.edges.update_batch(kept);

	debug!("reconciled ({policy:?}): {report:?}");
	report
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::parser::parse_record_set;
	use crate::graph::executor::{Record, RecordSet};
	use crate::graph::testing::{named, node, props, rel, triple};
	use crate::graph::types::{GraphNode, Position, Properties, PropertyValue};

	fn ghost() -> GraphNode {
		let mut ghost = GraphNode::new(NodeId::Ghost, Some("+".into()), Vec::new(), Properties::new());
		ghost.position = Some(Position::new(1.0, 2.0));
		ghost.fixed = true;
		ghost
	}

	fn parsed(records: Vec<Record>) -> ParsedGraph {
		parse_record_set(&RecordSet::new(records))
	}

	fn abc() -> ParsedGraph {
		parsed(vec![
			triple(named(1, "A"), rel(10, 1, 2, "R"), named(2, "B")),
			triple(named(2, "B"), rel(11, 2, 3, "R"), named(3, "C")),
		])
	}

	fn snapshot(store: &EntityStore) -> (Vec<GraphNode>, Vec<crate::graph::types::GraphEdge>) {
		(store.nodes.iter().cloned().collect(), store.edges.iter().cloned().collect())
	}

	#[test]
	fn reconciling_twice_is_idempotent() {
		let mut store = EntityStore::new();
		reconcile(&mut store, abc(), ReconcilePolicy::IncrementalMerge);
		let first = snapshot(&store);
		reconcile(&mut store, abc(), ReconcilePolicy::IncrementalMerge);
		assert_eq!(snapshot(&store), first);

		reconcile(&mut store, abc(), ReconcilePolicy::FullReplace);
		reconcile(&mut store, abc(), ReconcilePolicy::FullReplace);
		assert_eq!(snapshot(&store), first);
	}

	#[test]
	fn incremental_merge_drops_stale_and_keeps_ghost() {
		let mut store = EntityStore::new();
		reconcile(&mut store, abc(), ReconcilePolicy::IncrementalMerge);
		store.nodes.update(ghost());

		let next = parsed(vec![triple(
			node(2, &["Problem"], props(&[("name", "B2".into())])),
			rel(12, 2, 4, "R"),
			named(4, "D"),
		)]);
		let report = reconcile(&mut store, next, ReconcilePolicy::IncrementalMerge);

		assert_eq!(store.nodes.ids(), vec![NodeId::Db(2), NodeId::Ghost, NodeId::Db(4)]);
		let b = store.nodes.get(&NodeId::Db(2)).unwrap();
		assert_eq!((b.label.as_deref(), b.level(), b.group()), (Some("B2"), 4, "problem"));
		assert_eq!(store.nodes.get(&NodeId::Ghost), Some(&ghost()));
		assert_eq!(store.edges.ids(), vec![12]);
		assert_eq!((report.nodes_removed, report.edges_removed), (2, 2));
		assert!(store.is_consistent());
	}

	#[test]
	fn full_replace_with_empty_result_empties_the_store() {
		let mut store = EntityStore::new();
		reconcile(&mut store, abc(), ReconcilePolicy::FullReplace);
		store.nodes.update(ghost());

		reconcile(&mut store, ParsedGraph::default(), ReconcilePolicy::FullReplace);
		assert!(store.edges.is_empty());
		assert_eq!(store.nodes.ids(), vec![NodeId::Ghost]);
	}

	#[test]
	fn full_replace_discards_entities_missing_from_the_result() {
		let mut store = EntityStore::new();
		reconcile(&mut store, abc(), ReconcilePolicy::FullReplace);
		let next = parsed(vec![triple(named(3, "C"), rel(13, 3, 5, "R"), named(5, "E"))]);
		reconcile(&mut store, next, ReconcilePolicy::FullReplace);

		assert_eq!(store.nodes.ids(), vec![NodeId::Db(3), NodeId::Db(5)]);
		assert_eq!(store.edges.ids(), vec![13]);
	}

	#[test]
	fn dangling_edges_are_never_inserted() {
		let mut store = EntityStore::new();
		let only_edge = parsed(vec![Record::new(vec![
			("n".into(), named(1, "A")),
			("r".into(), rel(10, 1, 99, "R")),
		])]);
		let report = reconcile(&mut store, only_edge, ReconcilePolicy::IncrementalMerge);

		assert!(store.edges.is_empty());
		assert_eq!(report.edges_dangling, 1);
		assert!(store.is_consistent());
	}

	#[test]
	fn duplicate_entities_take_the_last_occurrence() {
		let mut store = EntityStore::new();
		let dupes = parsed(vec![
			Record::new(vec![("n".into(), node(1, &[], props(&[("v", PropertyValue::Int(1))])))]),
			Record::new(vec![("n".into(), node(1, &[], props(&[("v", PropertyValue::Int(2))])))]),
		]);
		reconcile(&mut store, dupes, ReconcilePolicy::FullReplace);

		assert_eq!(store.nodes.len(), 1);
		assert_eq!(
			store.nodes.get(&NodeId::Db(1)).unwrap().properties.get("v"),
			Some(&PropertyValue::Int(2))
		);
	}
}
