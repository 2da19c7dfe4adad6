use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::ForceGraphState;
use crate::graph::{GraphSync, NodeId, Position};

const EDGE_COLOR: &str = "#848484";
const RING_COLOR: &str = "rgba(0, 0, 0, 0.8)";
const GHOST_FILL: &str = "rgba(255, 255, 255, 0.85)";

pub fn render(state: &ForceGraphState, engine: &GraphSync, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#ffffff");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	let radius = engine.config().overlay.visible_radius;
	draw_edges(state, radius, ctx);
	draw_nodes(state, engine, radius, ctx);
	draw_ghost(state, engine, radius, ctx);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, radius: f64, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, arrow_size) = (1.5 / k.max(0.5), 12.0);
	let positions = state.positions();

	ctx.set_stroke_style_str(EDGE_COLOR);
	ctx.set_fill_style_str(EDGE_COLOR);
	ctx.set_line_width(line_width);
	ctx.set_font("12px sans-serif");
	ctx.set_text_align("center");

	for link in &state.links {
		let (Some(&(x1, y1)), Some(&(x2, y2))) = (positions.get(&link.source), positions.get(&link.target)) else {
			continue;
		};
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 2.0 * radius {
			continue;
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * radius, y1 + uy * radius);
		ctx.line_to(x2 - ux * (radius + arrow_size), y2 - uy * (radius + arrow_size));
		ctx.stroke();

		let (tip_x, tip_y) = (x2 - ux * radius, y2 - uy * radius);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if !link.label.is_empty() {
			let _ = ctx.fill_text(&link.label, (x1 + x2) / 2.0, (y1 + y2) / 2.0 - 4.0);
		}
	}
}

fn draw_nodes(state: &ForceGraphState, engine: &GraphSync, radius: f64, ctx: &CanvasRenderingContext2d) {
	let hover_radius = engine.config().overlay.hover_radius;
	let selected = engine.selected_node().map(|node| node.id);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	state.graph.visit_nodes(|node| {
		let (x, y) = (node.x() as f64, node.y() as f64);
		let info = &node.data.user_data;

		if engine.is_mouse_in_hover_area(x, y) {
			ctx.begin_path();
			let _ = ctx.arc(x, y, hover_radius, 0.0, 2.0 * PI);
			let _ = ctx.arc_with_anticlockwise(x, y, radius, 2.0 * PI, 0.0, true);
			ctx.set_fill_style_str(RING_COLOR);
			ctx.fill();
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(info.fill);
		ctx.fill();
		ctx.set_stroke_style_str(info.border);
		ctx.set_line_width(if selected == Some(info.id) { 4.0 } else { 2.0 });
		ctx.stroke();

		if let Some(label) = &info.label {
			ctx.set_fill_style_str(info.font);
			ctx.set_font("14px sans-serif");
			let _ = ctx.fill_text(&fit_label(label), x, y);
		}
	});
	ctx.set_text_baseline("alphabetic");
}

fn draw_ghost(state: &ForceGraphState, engine: &GraphSync, radius: f64, ctx: &CanvasRenderingContext2d) {
	let store = engine.store();
	let Some(ghost) = store.nodes.get(&NodeId::Ghost) else {
		return;
	};
	let Some(Position { x, y }) = ghost.position else {
		return;
	};
	let ghost_radius = ghost.size.unwrap_or(2.0 * radius) / 2.0;

	if let Some(connection) = engine.pending_connection() {
		let anchor = state.position_of(connection.anchor).unwrap_or(connection.position);
		let (dx, dy) = (anchor.x - x, anchor.y - y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist > radius + ghost_radius {
			let (ux, uy) = (dx / dist, dy / dist);
			ctx.begin_path();
			ctx.move_to(x + ux * ghost_radius, y + uy * ghost_radius);
			ctx.line_to(anchor.x - ux * radius, anchor.y - uy * radius);
			ctx.set_stroke_style_str(EDGE_COLOR);
			ctx.set_line_width(2.0);
			ctx.stroke();
		}
	}

	ctx.begin_path();
	let _ = ctx.arc(x, y, ghost_radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(GHOST_FILL);
	ctx.fill();
	ctx.set_stroke_style_str(EDGE_COLOR);
	ctx.set_line_width(1.0);
	ctx.stroke();

	if let Some(label) = &ghost.label {
		ctx.set_fill_style_str("black");
		ctx.set_font("32px sans-serif");
		ctx.set_text_align("center");
		ctx.set_text_baseline("middle");
		let _ = ctx.fill_text(label, x, y);
		ctx.set_text_baseline("alphabetic");
	}
}

/// Labels longer than a node is wide are cut with an ellipsis.
fn fit_label(label: &str) -> String {
	const MAX_CHARS: usize = 12;
	if label.chars().count() <= MAX_CHARS {
		return label.to_string();
	}
	let mut cut: String = label.chars().take(MAX_CHARS - 1).collect();
	cut.push('…');
	cut
}
