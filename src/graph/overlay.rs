//! Non-persisted UI entities that share the node collection with database
//! nodes: the ghost node that follows the pointer while an edge is being
//! drawn, and the pointer state used for hover detection.

use std::time::Duration;

use super::store::Collection;
use super::types::{GraphNode, NodeId, NodeRenderer, Position, Properties};

/// Overlay geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
	/// Radius of the drawn node circle.
	pub visible_radius: f64,
	/// Outer radius of the ring that starts an edge-creation gesture.
	pub hover_radius: f64,
	/// Text drawn inside the ghost node.
	pub ghost_label: String,
	/// Diameter of the ghost node.
	pub ghost_size: f64,
	/// Cadence of the ghost refresh loop.
	pub refresh_interval: Duration,
}

impl Default for OverlayConfig {
	fn default() -> Self {
		Self {
			visible_radius: 50.0,
			hover_radius: 60.0,
			ghost_label: "+".into(),
			ghost_size: 100.0,
			refresh_interval: Duration::from_millis(20),
		}
	}
}

/// The node an edge-creation gesture started from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingConnection {
	/// Node the gesture started on.
	pub anchor: NodeId,
	/// Its centre when the gesture started.
	pub position: Position,
}

/// Pointer and pending-connection state. The ghost node itself lives in the
/// node collection.
#[derive(Debug, Default)]
pub struct Overlay {
	config: OverlayConfig,
	pointer: Option<Position>,
	connection: Option<PendingConnection>,
}

impl Overlay {
	/// Idle overlay with `config`.
	pub fn new(config: OverlayConfig) -> Self {
		Self {
			config,
			pointer: None,
			connection: None,
		}
	}

	/// Geometry in use.
	pub fn config(&self) -> &OverlayConfig {
		&self.config
	}

	/// Last pointer position.
	pub fn pointer(&self) -> Option<Position> {
		self.pointer
	}

	/// Record the pointer position in graph coordinates, `None` once it left
	/// the canvas.
	pub fn set_pointer(&mut self, pointer: Option<Position>) {
		self.pointer = pointer;
	}

	/// The gesture in progress, if any.
	pub fn connection(&self) -> Option<PendingConnection> {
		self.connection
	}

	/// Start an edge-creation gesture.
	pub fn begin_connection(&mut self, anchor: NodeId, position: Position) {
		self.connection = Some(PendingConnection { anchor, position });
	}

	/// Insert (or move) the ghost node at `position`, or at the pointer when
	/// no position is given.
	pub fn add_ghost_node(&self, nodes: &mut Collection<GraphNode>, position: Option<Position>) {
		let mut ghost = GraphNode::new(
			NodeId::Ghost,
			Some(self.config.ghost_label.clone()),
			Vec::new(),
			Properties::new(),
		);
		ghost.position = position.or(self.pointer);
		ghost.fixed = true;
		ghost.size = Some(self.config.ghost_size);
		ghost.renderer = Some(NodeRenderer::Ghost);
		nodes.update(ghost);
	}

	/// Remove the ghost node and forget the pending connection. Returns the
	/// connection that was pending, if any.
	pub fn remove_ghost_node(&mut self, nodes: &mut Collection<GraphNode>) -> Option<PendingConnection> {
		nodes.remove(&NodeId::Ghost);
		self.connection.take()
	}

	/// One refresh step: move the ghost to the current pointer. Reads the
	/// collection fresh each time; returns whether anything moved.
	pub fn tick(&self, nodes: &mut Collection<GraphNode>) -> bool {
		let (Some(pointer), Some(ghost)) = (self.pointer, nodes.get(&NodeId::Ghost)) else {
			return false;
		};
		if ghost.position == Some(pointer) {
			return false;
		}
		let mut moved = ghost.clone();
		moved.position = Some(pointer);
		nodes.update(moved);
		true
	}

	/// Whether the pointer lies in the ring between the visible and the hover
	/// radius around a node centred at (`node_x`, `node_y`).
	pub fn is_mouse_in_hover_area(&self, node_x: f64, node_y: f64) -> bool {
		let Some(pointer) = self.pointer else {
			return false;
		};
		let d2 = pointer.distance_squared(&Position::new(node_x, node_y));
		let (inner, outer) = (self.config.visible_radius, self.config.hover_radius);
		d2 <= outer * outer && d2 > inner * inner
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hover_area_is_an_annulus() {
		let mut overlay = Overlay::new(OverlayConfig::default());
		assert!(!overlay.is_mouse_in_hover_area(0.0, 0.0));

		overlay.set_pointer(Some(Position::new(55.0, 0.0)));
		assert!(overlay.is_mouse_in_hover_area(0.0, 0.0));

		overlay.set_pointer(Some(Position::new(60.0, 0.0)));
		assert!(overlay.is_mouse_in_hover_area(0.0, 0.0));

		overlay.set_pointer(Some(Position::new(50.0, 0.0)));
		assert!(!overlay.is_mouse_in_hover_area(0.0, 0.0));

		overlay.set_pointer(Some(Position::new(10.0, 10.0)));
		assert!(!overlay.is_mouse_in_hover_area(0.0, 0.0));

		overlay.set_pointer(Some(Position::new(100.0, 0.0)));
		assert!(!overlay.is_mouse_in_hover_area(0.0, 0.0));
	}

	#[test]
	fn ghost_follows_the_pointer_on_tick() {
		let mut nodes = Collection::new();
		let mut overlay = Overlay::new(OverlayConfig::default());
		assert!(!overlay.tick(&mut nodes));

		overlay.set_pointer(Some(Position::new(1.0, 1.0)));
		overlay.add_ghost_node(&mut nodes, None);
		let ghost = nodes.get(&NodeId::Ghost).unwrap();
		assert_eq!(ghost.position, Some(Position::new(1.0, 1.0)));
		assert_eq!(ghost.label.as_deref(), Some("+"));
		assert!(ghost.fixed);
		assert_eq!(ghost.renderer, Some(NodeRenderer::Ghost));
		assert!(!overlay.tick(&mut nodes));

		overlay.set_pointer(Some(Position::new(5.0, 6.0)));
		assert!(overlay.tick(&mut nodes));
		assert_eq!(
			nodes.get(&NodeId::Ghost).unwrap().position,
			Some(Position::new(5.0, 6.0))
		);
	}

	#[test]
	fn removing_the_ghost_clears_the_pending_connection() {
		let mut nodes = Collection::new();
		let mut overlay = Overlay::new(OverlayConfig::default());
		overlay.begin_connection(NodeId::Db(3), Position::new(0.0, 0.0));
		overlay.add_ghost_node(&mut nodes, Some(Position::new(9.0, 9.0)));

		let pending = overlay.remove_ghost_node(&mut nodes);
		assert_eq!(pending.map(|p| p.anchor), Some(NodeId::Db(3)));
		assert!(overlay.connection().is_none());
		assert!(nodes.is_empty());
	}
}
