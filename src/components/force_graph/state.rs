use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::types::GraphData;
use crate::graph::{NodeId, Position};

/// Radius of the circle new nodes are laid out on before the simulation
/// moves them.
const SPAWN_RADIUS: f64 = 250.0;

#[derive(Clone, Debug)]
pub struct NodeInfo {
	pub id: NodeId,
	pub label: Option<String>,
	pub fill: &'static str,
	pub border: &'static str,
	pub font: &'static str,
}

#[derive(Clone, Debug)]
pub struct LinkInfo {
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	pub label: String,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub links: Vec<LinkInfo>,
	index: HashMap<NodeId, DefaultNodeIdx>,
	data: GraphData,
}

fn simulation() -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 12000.0,
		force_spring: 0.05,
		force_max: 280.0,
		node_speed: 7000.0,
		damping_factor: 0.95,
	})
}

impl ForceGraphState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			graph: simulation(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 0.5,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			width,
			height,
			animation_running: true,
			links: Vec::new(),
			index: HashMap::new(),
			data: GraphData::default(),
		}
	}

	/// Rebuild the simulation from a store snapshot. Nodes already on the
	/// canvas keep their position and pinning; new ones start on a circle.
	pub fn sync(&mut self, data: &GraphData) {
		if *data == self.data {
			return;
		}
		let mut placed = HashMap::new();
		self.graph.visit_nodes(|node| {
			placed.insert(
				node.data.user_data.id,
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		let (mut graph, mut index) = (simulation(), HashMap::new());
		let count = data.nodes.len().max(1) as f64;
		for (i, node) in data.nodes.iter().enumerate() {
			let (x, y, is_anchor) = placed.get(&node.id).copied().unwrap_or_else(|| {
				let angle = (i as f64) * 2.0 * PI / count;
				(
					(SPAWN_RADIUS * angle.cos()) as f32,
					(SPAWN_RADIUS * angle.sin()) as f32,
					false,
				)
			});
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo {
					id: node.id,
					label: node.label.clone(),
					fill: node.fill,
					border: node.border,
					font: node.font,
				},
			});
			index.insert(node.id, idx);
		}

		let mut links = Vec::with_capacity(data.links.len());
		for link in &data.links {
			if let (Some(&source), Some(&target)) = (index.get(&link.source), index.get(&link.target)) {
				graph.add_edge(source, target, EdgeData::default());
				links.push(LinkInfo {
					source,
					target,
					label: link.label.clone(),
				});
			}
		}

		self.graph = graph;
		self.index = index;
		self.links = links;
		self.data = data.clone();
		// indices of the old simulation are gone
		self.drag = DragState::default();
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Node whose drawn circle contains the screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64, radius: f64) -> Option<(DefaultNodeIdx, NodeId)> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			if dx * dx + dy * dy <= radius * radius {
				found = Some((node.index(), node.data.user_data.id));
			}
		});
		found
	}

	/// First node for which `in_ring` holds at its centre.
	pub fn ring_node(&self, in_ring: impl Fn(f64, f64) -> bool) -> Option<(NodeId, Position)> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			if found.is_none() && in_ring(x, y) {
				found = Some((node.data.user_data.id, Position::new(x, y)));
			}
		});
		found
	}

	pub fn position_of(&self, id: NodeId) -> Option<Position> {
		let idx = *self.index.get(&id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(Position::new(node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	pub fn positions(&self) -> HashMap<DefaultNodeIdx, (f64, f64)> {
		let mut positions = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x() as f64, node.y() as f64));
		});
		positions
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}
