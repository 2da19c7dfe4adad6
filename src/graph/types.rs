//! Canonical node/edge model shared by the parser, the entity store and the
//! rendering collaborator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::GraphError;
use super::styles;

/// Sentinel identity of the transient edge-creation node.
pub const GHOST_ID: &str = "ghost";

/// Identity of a node in the entity store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
	/// A node persisted in the graph database.
	Db(i64),
	/// The ghost node owned by the transient overlay.
	Ghost,
}

impl NodeId {
	/// Transient nodes are never persisted and never removed by reconciliation.
	pub fn is_transient(&self) -> bool {
		matches!(self, NodeId::Ghost)
	}

	/// The database identity, if this node is persisted.
	pub fn as_db(&self) -> Option<i64> {
		match self {
			NodeId::Db(id) => Some(*id),
			NodeId::Ghost => None,
		}
	}
}

impl From<i64> for NodeId {
	fn from(id: i64) -> Self {
		NodeId::Db(id)
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NodeId::Db(id) => write!(f, "{id}"),
			NodeId::Ghost => f.write_str(GHOST_ID),
		}
	}
}

/// Identity of a relationship in the entity store.
pub type EdgeId = i64;

/// Closed set of property values a node can carry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
	/// Absent value; in an update it removes the property.
	Null,
	/// Boolean.
	Bool(bool),
	/// Integer.
	Int(i64),
	/// Floating point number.
	Float(f64),
	/// String.
	String(String),
	/// Homogeneous or mixed list.
	List(Vec<PropertyValue>),
}

impl PropertyValue {
	/// Whether the value would be picked as a display label.
	pub fn is_truthy(&self) -> bool {
		match self {
			PropertyValue::Null => false,
			PropertyValue::Bool(b) => *b,
			PropertyValue::Int(i) => *i != 0,
			PropertyValue::Float(f) => *f != 0.0 && !f.is_nan(),
			PropertyValue::String(s) => !s.is_empty(),
			PropertyValue::List(_) => true,
		}
	}

	/// Value typed into an editor: JSON literals keep their type (`5`, `true`,
	/// `[1, 2]`, `null`), anything else is taken as text.
	pub fn from_input(raw: &str) -> Self {
		match serde_json::from_str::<serde_json::Value>(raw.trim()) {
			Ok(value) => value.into(),
			Err(_) => PropertyValue::String(raw.to_string()),
		}
	}

	/// Integer view of the value, accepting floats without a fractional part.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			PropertyValue::Int(i) => Some(*i),
			PropertyValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
			_ => None,
		}
	}
}

impl fmt::Display for PropertyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropertyValue::Null => f.write_str("null"),
			PropertyValue::Bool(b) => write!(f, "{b}"),
			PropertyValue::Int(i) => write!(f, "{i}"),
			PropertyValue::Float(x) => write!(f, "{x}"),
			PropertyValue::String(s) => f.write_str(s),
			PropertyValue::List(items) => {
				let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
				write!(f, "[{}]", parts.join(", "))
			}
		}
	}
}

impl From<serde_json::Value> for PropertyValue {
	fn from(value: serde_json::Value) -> Self {
		use serde_json::Value;
		match value {
			Value::Null => PropertyValue::Null,
			Value::Bool(b) => PropertyValue::Bool(b),
			Value::Number(n) => match n.as_i64() {
				Some(i) => PropertyValue::Int(i),
				None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			Value::String(s) => PropertyValue::String(s),
			Value::Array(items) => {
				PropertyValue::List(items.into_iter().map(PropertyValue::from).collect())
			}
			// spatial values arrive as objects; keep their JSON text
			other @ Value::Object(_) => PropertyValue::String(other.to_string()),
		}
	}
}

impl From<&str> for PropertyValue {
	fn from(value: &str) -> Self {
		PropertyValue::String(value.to_string())
	}
}

impl From<String> for PropertyValue {
	fn from(value: String) -> Self {
		PropertyValue::String(value)
	}
}

impl From<i64> for PropertyValue {
	fn from(value: i64) -> Self {
		PropertyValue::Int(value)
	}
}

impl From<f64> for PropertyValue {
	fn from(value: f64) -> Self {
		PropertyValue::Float(value)
	}
}

impl From<bool> for PropertyValue {
	fn from(value: bool) -> Self {
		PropertyValue::Bool(value)
	}
}

/// String-keyed property map.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A point on the canvas in graph coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Position {
	/// A position at `(x, y)`.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Squared distance to `other`.
	pub fn distance_squared(&self, other: &Position) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		dx * dx + dy * dy
	}
}

/// Which draw routine the rendering collaborator uses for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRenderer {
	/// Filled circle with the hover annulus used to start an edge.
	HoverRing,
	/// Translucent placeholder following the pointer.
	Ghost,
}

/// A node as mirrored in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	/// Identity.
	pub id: NodeId,
	/// Display label.
	pub label: Option<String>,
	labels: Vec<String>,
	/// Properties as stored.
	pub properties: Properties,
	level: u32,
	group: String,
	/// Layout position, when known.
	pub position: Option<Position>,
	/// Pinned by the layout.
	pub fixed: bool,
	/// Diameter override.
	pub size: Option<f64>,
	/// Draw routine, if the node has one.
	pub renderer: Option<NodeRenderer>,
}

impl GraphNode {
	/// Build a node; `level` and `group` are derived from `labels`.
	pub fn new(id: NodeId, label: Option<String>, labels: Vec<String>, properties: Properties) -> Self {
		let mut node = Self {
			id,
			label,
			labels: Vec::new(),
			properties,
			level: styles::DEFAULT_STYLE.level,
			group: String::new(),
			position: None,
			fixed: false,
			size: None,
			renderer: None,
		};
		node.set_labels(labels);
		node
	}

	/// Database labels, first one names the group.
	pub fn labels(&self) -> &[String] {
		&self.labels
	}

	/// Hierarchy level of the node's group.
	pub fn level(&self) -> u32 {
		self.level
	}

	/// Lowercased first label, or empty.
	pub fn group(&self) -> &str {
		&self.group
	}

	/// Replace the label set and recompute the derived level and group.
	pub fn set_labels(&mut self, labels: Vec<String>) {
		self.group = labels.first().map(|l| l.to_lowercase()).unwrap_or_default();
		self.level = styles::level_for(&self.group);
		self.labels = labels;
	}

	/// Whether the node is overlay-owned.
	pub fn is_transient(&self) -> bool {
		self.id.is_transient()
	}

	/// Fold a fresher version of the same node into this one. Display data is
	/// replaced; layout hints are only replaced when the incoming node has them.
	pub fn merge(&mut self, incoming: GraphNode) {
		let GraphNode {
			label,
			labels,
			properties,
			position,
			fixed,
			size,
			renderer,
			..
		} = incoming;
		self.label = label;
		self.set_labels(labels);
		self.properties = properties;
		self.fixed = fixed;
		if position.is_some() {
			self.position = position;
		}
		if size.is_some() {
			self.size = size;
		}
		if renderer.is_some() {
			self.renderer = renderer;
		}
	}
}

/// A relationship as mirrored in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	/// Identity.
	pub id: EdgeId,
	/// Display label, the relationship type.
	pub label: String,
	/// Start node.
	pub from: NodeId,
	/// End node.
	pub to: NodeId,
	/// Relationship type.
	pub kind: String,
}

impl GraphEdge {
	/// An edge labelled with its type.
	pub fn new(id: EdgeId, from: NodeId, to: NodeId, kind: impl Into<String>) -> Self {
		let kind = kind.into();
		Self {
			id,
			label: kind.clone(),
			from,
			to,
			kind,
		}
	}

	/// Replace with the fresher version.
	pub fn merge(&mut self, incoming: GraphEdge) {
		*self = incoming;
	}
}

/// Orientation of the relationship created between an anchor and a new node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	/// `(anchor)-[r]->(new)`
	Outgoing,
	/// `(new)-[r]->(anchor)`
	Incoming,
}

impl FromStr for Direction {
	type Err = GraphError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"outgoing" => Ok(Direction::Outgoing),
			"incoming" => Ok(Direction::Incoming),
			other => Err(GraphError::InvalidArgument(format!(
				"invalid edge direction `{other}`, must be \"outgoing\" or \"incoming\""
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn editor_input_keeps_json_types() {
		assert_eq!(PropertyValue::from_input("5"), PropertyValue::Int(5));
		assert_eq!(PropertyValue::from_input(" 2.5 "), PropertyValue::Float(2.5));
		assert_eq!(PropertyValue::from_input("true"), PropertyValue::Bool(true));
		assert_eq!(PropertyValue::from_input("null"), PropertyValue::Null);
		assert_eq!(
			PropertyValue::from_input("[1, \"a\"]"),
			PropertyValue::List(vec![PropertyValue::Int(1), PropertyValue::String("a".into())])
		);
		assert_eq!(
			PropertyValue::from_input("\"5\""),
			PropertyValue::String("5".into())
		);
		assert_eq!(
			PropertyValue::from_input("Alice Smith"),
			PropertyValue::String("Alice Smith".into())
		);
	}

	#[test]
	fn labels_drive_level_and_group() {
		let mut node = GraphNode::new(NodeId::Db(1), None, vec!["Problem".into()], Properties::new());
		assert_eq!((node.level(), node.group()), (4, "problem"));

		node.set_labels(vec!["Patient".into(), "Problem".into()]);
		assert_eq!((node.level(), node.group()), (1, "patient"));

		node.set_labels(Vec::new());
		assert_eq!((node.level(), node.group()), (0, ""));
	}

	#[test]
	fn merge_keeps_position_when_incoming_has_none() {
		let mut node = GraphNode::new(NodeId::Db(1), Some("a".into()), vec![], Properties::new());
		node.position = Some(Position::new(3.0, 4.0));

		let mut props = Properties::new();
		props.insert("name".into(), "b".into());
		node.merge(GraphNode::new(NodeId::Db(1), Some("b".into()), vec!["Observation".into()], props.clone()));

		assert_eq!(node.position, Some(Position::new(3.0, 4.0)));
		assert_eq!(node.label.as_deref(), Some("b"));
		assert_eq!(node.properties, props);
		assert_eq!(node.level(), 3);
	}

	#[test]
	fn direction_accepts_only_the_two_literals() {
		assert_eq!("outgoing".parse::<Direction>().unwrap(), Direction::Outgoing);
		assert_eq!("incoming".parse::<Direction>().unwrap(), Direction::Incoming);
		assert!(matches!(
			"sideways".parse::<Direction>(),
			Err(GraphError::InvalidArgument(_))
		));
	}

	#[test]
	fn json_values_map_onto_property_values() {
		let value: PropertyValue = serde_json::json!([1, 2.5, "x", null, true]).into();
		assert_eq!(
			value,
			PropertyValue::List(vec![
				PropertyValue::Int(1),
				PropertyValue::Float(2.5),
				PropertyValue::String("x".into()),
				PropertyValue::Null,
				PropertyValue::Bool(true),
			])
		);
		assert_eq!(value.to_string(), "[1, 2.5, x, null, true]");
	}
}
