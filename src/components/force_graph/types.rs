use crate::graph::styles;
use crate::graph::{EntityStore, NodeId};

#[derive(Clone, Debug, PartialEq)]
pub struct CanvasNode {
	pub id: NodeId,
	pub label: Option<String>,
	pub fill: &'static str,
	pub border: &'static str,
	pub font: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CanvasLink {
	pub source: NodeId,
	pub target: NodeId,
	pub label: String,
}

/// Snapshot of the persisted part of the entity store, in store order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub nodes: Vec<CanvasNode>,
	pub links: Vec<CanvasLink>,
}

impl GraphData {
	pub fn from_store(store: &EntityStore) -> Self {
		let nodes = store
			.nodes
			.iter()
			.filter(|n| !n.is_transient())
			.map(|n| {
				let style = styles::style_for(n.group());
				CanvasNode {
					id: n.id,
					label: n.label.clone(),
					fill: style.background,
					border: style.border,
					font: style.font,
				}
			})
			.collect();
		let links = store
			.edges
			.iter()
			.map(|e| CanvasLink {
				source: e.from,
				target: e.to,
				label: e.label.clone(),
			})
			.collect();
		GraphData { nodes, links }
	}
}
