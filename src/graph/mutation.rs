//! Write statements issued by the engine's mutation operations.
//!
//! Values travel as bound parameters. Schema identifiers (the new node's
//! group label, the relationship type and property keys) are spliced into the
//! statement text because Cypher does not accept them as parameters; they
//! must come from trusted input.

use super::error::{GraphError, Result};
use super::executor::Params;
use super::types::{Direction, PropertyValue};

/// A statement ready to run, with its parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
	/// Cypher text.
	pub text: String,
	/// Named parameters bound to the text.
	pub params: Params,
}

impl Statement {
	fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			params: Params::new(),
		}
	}

	fn bind(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
		self.params.insert(name.to_string(), value.into());
		self
	}
}

/// Request to create a node connected to an existing anchor node.
#[derive(Clone, Debug, PartialEq)]
pub struct NewConnectedNode {
	/// Identity of the existing node.
	pub anchor: i64,
	/// Relationship type.
	pub edge_label: String,
	/// `"outgoing"` or `"incoming"`, seen from the anchor.
	pub direction: String,
	/// Label of the new node.
	pub group: String,
	/// Value of its `name` property.
	pub name: String,
}

/// One property change; a `Null` value removes the key.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyUpdate {
	/// Property name.
	pub key: String,
	/// New value, `Null` to remove.
	pub value: PropertyValue,
}

impl PropertyUpdate {
	/// Set `key` to `value`.
	pub fn set(key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
		Self {
			key: key.into(),
			value: value.into(),
		}
	}

	/// Remove `key`.
	pub fn remove(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			value: PropertyValue::Null,
		}
	}
}

/// Column holding the identity of the node created by
/// [`create_connected_node`].
pub const NEW_NODE_COLUMN: &str = "newNodeId";

/// The node, its relationships and its direct neighbours.
pub fn neighborhood_query(node_id: i64) -> String {
	format!("MATCH (n1)<-[r]->(n2) WHERE ID(n1)={node_id} RETURN n1,r,n2")
}

/// Create a node with one relationship to the anchor and return its
/// identity in [`NEW_NODE_COLUMN`]. Fails before building anything when the
/// direction is unknown.
pub fn create_connected_node(request: &NewConnectedNode) -> Result<Statement> {
	let direction: Direction = request.direction.parse()?;
	let (edge, group) = (&request.edge_label, &request.group);
	let pattern = match direction {
		Direction::Outgoing => {
			format!("(existingNode)-[r:{edge}]->(newNode:{group} {{name: $nodeName}})")
		}
		Direction::Incoming => {
			format!("(newNode:{group} {{name: $nodeName}})-[r:{edge}]->(existingNode)")
		}
	};
	let text = format!(
		"MATCH (existingNode) WHERE id(existingNode) = $nodeId \
		 CREATE {pattern} \
		 RETURN id(newNode) as {NEW_NODE_COLUMN}"
	);
	Ok(Statement::new(text)
		.bind("nodeId", request.anchor)
		.bind("nodeName", request.name.as_str()))
}

/// Delete a node together with all of its relationships.
pub fn delete_node(node_id: i64) -> Statement {
	Statement::new(format!("MATCH (n) WHERE id(n) = {node_id} DETACH DELETE n"))
}

/// All updates folded into one statement, applied in order.
pub fn update_properties(node_id: i64, updates: &[PropertyUpdate]) -> Result<Statement> {
	if updates.is_empty() {
		return Err(GraphError::InvalidArgument(format!(
			"no property updates given for node {node_id}"
		)));
	}
	let mut statement = Statement::new(format!("MATCH (x) WHERE id(x) = {node_id}"));
	for (i, update) in updates.iter().enumerate() {
		if update.key.is_empty() {
			return Err(GraphError::InvalidArgument("empty property key".into()));
		}
		let key = &update.key;
		if update.value == PropertyValue::Null {
			statement.text.push_str(&format!(" REMOVE x.{key}"));
		} else {
			let param = format!("p{i}");
			statement.text.push_str(&format!(" SET x.{key} = ${param}"));
			statement = statement.bind(&param, update.value.clone());
		}
	}
	Ok(statement)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(direction: &str) -> NewConnectedNode {
		NewConnectedNode {
			anchor: 7,
			edge_label: "CAUSES".into(),
			direction: direction.into(),
			group: "Problem".into(),
			name: "Fever".into(),
		}
	}

	#[test]
	fn outgoing_creation_points_away_from_anchor() {
		let statement = create_connected_node(&request("outgoing")).unwrap();
		assert!(statement.text.contains(
			"CREATE (existingNode)-[r:CAUSES]->(newNode:Problem {name: $nodeName})"
		));
		assert!(statement.text.ends_with("RETURN id(newNode) as newNodeId"));
		assert_eq!(statement.params.get("nodeId"), Some(&PropertyValue::Int(7)));
		assert_eq!(statement.params.get("nodeName"), Some(&PropertyValue::from("Fever")));
	}

	#[test]
	fn incoming_creation_points_at_anchor() {
		let statement = create_connected_node(&request("incoming")).unwrap();
		assert!(statement.text.contains(
			"CREATE (newNode:Problem {name: $nodeName})-[r:CAUSES]->(existingNode)"
		));
	}

	#[test]
	fn bad_direction_is_rejected() {
		assert!(matches!(
			create_connected_node(&request("both")),
			Err(GraphError::InvalidArgument(_))
		));
	}

	#[test]
	fn updates_become_one_statement() {
		let statement = update_properties(
			5,
			&[
				PropertyUpdate::set("age", 5i64),
				PropertyUpdate::remove("nickname"),
				PropertyUpdate::set("name", "Ada"),
			],
		)
		.unwrap();
		assert_eq!(
			statement.text,
			"MATCH (x) WHERE id(x) = 5 SET x.age = $p0 REMOVE x.nickname SET x.name = $p2"
		);
		assert_eq!(statement.params.len(), 2);
		assert_eq!(statement.params.get("p0"), Some(&PropertyValue::Int(5)));
		assert_eq!(statement.params.get("p2"), Some(&PropertyValue::from("Ada")));
	}

	#[test]
	fn empty_updates_are_rejected() {
		assert!(matches!(update_properties(5, &[]), Err(GraphError::InvalidArgument(_))));
	}

	#[test]
	fn delete_and_neighborhood_statements() {
		assert_eq!(delete_node(3).text, "MATCH (n) WHERE id(n) = 3 DETACH DELETE n");
		assert_eq!(
			neighborhood_query(3),
			"MATCH (n1)<-[r]->(n2) WHERE ID(n1)=3 RETURN n1,r,n2"
		);
	}
}
