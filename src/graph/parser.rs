//! Converts query records into canonical nodes and edges.

use log::warn;

use super::error::GraphError;
use super::executor::{FieldValue, RawNode, RawRelationship, Record, RecordSet};
use super::types::{GraphEdge, GraphNode, NodeId, NodeRenderer, Properties};

/// Property keys tried, in order, for a node's display label.
pub const LABEL_PRIORITY: [&str; 3] = ["text", "name", "title"];

/// Nodes and edges of a result set, in the order they were read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedGraph {
	/// Nodes in result order.
	pub nodes: Vec<GraphNode>,
	/// Edges in result order.
	pub edges: Vec<GraphEdge>,
	/// Fields ignored because they were neither nodes nor relationships.
	pub skipped: usize,
}

impl ParsedGraph {
	/// Whether no node or edge was read.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}

	fn extend(&mut self, other: ParsedGraph) {
		self.nodes.extend(other.nodes);
		self.edges.extend(other.edges);
		self.skipped += other.skipped;
	}
}

/// Parse every record, keeping result order.
pub fn parse_record_set(set: &RecordSet) -> ParsedGraph {
	let mut parsed = ParsedGraph::default();
	for record in &set.records {
		parsed.extend(parse_record(record));
	}
	parsed
}

/// Classify every field of `record`. Fields that are neither nodes nor
/// relationships are skipped with a warning.
pub fn parse_record(record: &Record) -> ParsedGraph {
	let mut parsed = ParsedGraph::default();
	for (key, field) in record.fields() {
		match field {
			FieldValue::Node(raw) => parsed.nodes.push(parse_node(raw)),
			FieldValue::Relationship(raw) => parsed.edges.push(parse_relationship(raw)),
			other => {
				let skipped = GraphError::UnsupportedResultType {
					field: key.to_string(),
					kind: other.type_name().to_string(),
				};
				warn!("skipping field: {skipped}");
				parsed.skipped += 1;
			}
		}
	}
	parsed
}

/// Canonical node for a raw node. The display label is the first truthy
/// property in [`LABEL_PRIORITY`].
pub fn parse_node(raw: &RawNode) -> GraphNode {
	let mut node = GraphNode::new(
		NodeId::Db(raw.identity),
		display_label(&raw.properties),
		raw.labels.clone(),
		raw.properties.clone(),
	);
	node.renderer = Some(NodeRenderer::HoverRing);
	node
}

/// Canonical edge for a raw relationship.
pub fn parse_relationship(raw: &RawRelationship) -> GraphEdge {
	GraphEdge::new(
		raw.identity,
		NodeId::Db(raw.start),
		NodeId::Db(raw.end),
		raw.kind.as_str(),
	)
}

/// First truthy value among `text`, `name`, `title`.
pub fn display_label(properties: &Properties) -> Option<String> {
	LABEL_PRIORITY
		.iter()
		.filter_map(|key| properties.get(*key))
		.find(|value| value.is_truthy())
		.map(ToString::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::testing::{node, props, rel, triple};
	use crate::graph::types::PropertyValue;

	#[test]
	fn label_priority() {
		assert_eq!(
			display_label(&props(&[("name", "X".into()), ("title", "Y".into())])).as_deref(),
			Some("X")
		);
		assert_eq!(display_label(&props(&[("title", "Y".into())])).as_deref(), Some("Y"));
		assert_eq!(
			display_label(&props(&[("text", "T".into()), ("name", "X".into())])).as_deref(),
			Some("T")
		);
		assert_eq!(
			display_label(&props(&[("name", "".into()), ("title", "Y".into())])).as_deref(),
			Some("Y")
		);
		assert_eq!(display_label(&props(&[("name", 42i64.into())])).as_deref(), Some("42"));
		assert_eq!(display_label(&props(&[("other", "Z".into())])), None);
	}

	#[test]
	fn nodes_get_level_and_group_from_first_label() {
		let set = RecordSet::new(vec![Record::new(vec![
			("a".into(), node(1, &["Problem"], props(&[]))),
			("b".into(), node(2, &[], props(&[]))),
		])]);
		let parsed = parse_record_set(&set);

		assert_eq!(parsed.nodes[0].level(), 4);
		assert_eq!(parsed.nodes[0].group(), "problem");
		assert_eq!(parsed.nodes[1].level(), 0);
		assert_eq!(parsed.nodes[1].group(), "");
		assert_eq!(parsed.nodes[0].renderer, Some(NodeRenderer::HoverRing));
	}

	#[test]
	fn edges_carry_type_as_label() {
		let parsed = parse_record(&triple(
			node(1, &["A"], props(&[])),
			rel(7, 1, 2, "KNOWS"),
			node(2, &["B"], props(&[])),
		));
		assert_eq!(parsed.edges.len(), 1);
		let edge = &parsed.edges[0];
		assert_eq!(
			(edge.id, edge.from, edge.to, edge.label.as_str(), edge.kind.as_str()),
			(7, NodeId::Db(1), NodeId::Db(2), "KNOWS", "KNOWS")
		);
	}

	#[test]
	fn unsupported_fields_are_skipped() {
		let record = Record::new(vec![
			("p".into(), FieldValue::Path { length: 2 }),
			("c".into(), FieldValue::Scalar(PropertyValue::Int(1))),
			("n".into(), node(3, &[], props(&[]))),
		]);
		let parsed = parse_record(&record);
		assert_eq!(parsed.nodes.len(), 1);
		assert!(parsed.edges.is_empty());
		assert_eq!(parsed.skipped, 2);
	}
}
