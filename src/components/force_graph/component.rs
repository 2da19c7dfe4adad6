use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use super::types::GraphData;
use crate::graph::{GraphSync, NewConnectedNode, NodeId, Position};

const NEW_EDGE_LABEL: &str = "RELATED_TO";
const NEW_NODE_NAME: &str = "New node";
const DEFAULT_GROUP: &str = "Node";

/// Longest simulation step taken after the tab was in the background.
const MAX_FRAME_SECS: f32 = 0.05;

fn window_size(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
	(dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0))
}

/// Canvas view of the engine's entity store. Redraws the simulation when
/// `revision` fires and turns pointer gestures into engine calls: a press in a
/// node's hover ring starts a new connected node, a press on a node selects
/// it, a double click expands its neighbourhood.
#[component]
pub fn ForceGraphCanvas(
	engine: Rc<GraphSync>,
	revision: Trigger,
	selection: RwSignal<Option<NodeId>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<ForceGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, engine_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), engine.clone());
	let radius = engine.config().overlay.visible_radius;

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				warn!("canvas has no 2d context");
				return;
			}
		};
		let mut initial = ForceGraphState::new(w, h);
		initial.sync(&GraphData::from_store(&engine_init.store()));
		*state_init.borrow_mut() = Some(initial);

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, engine_anim) =
			(state_init.clone(), animate_init.clone(), engine_init.clone());
		let last_frame = Cell::new(js_sys::Date::now());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let dt = (((now - last_frame.replace(now)) / 1000.0) as f32).min(MAX_FRAME_SECS);
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				if s.animation_running {
					s.tick(dt);
				}
				render::render(s, &engine_anim, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let (state_sync, engine_sync) = (state.clone(), engine.clone());
	Effect::new(move |_| {
		revision.track();
		let data = GraphData::from_store(&engine_sync.store());
		if let Some(ref mut s) = *state_sync.borrow_mut() {
			s.sync(&data);
		}
	});

	let canvas_point = move |ev: &MouseEvent| -> Option<(f64, f64)> {
		let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		))
	};

	let (state_md, engine_md) = (state.clone(), engine.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};
		let mut guard = state_md.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		let (gx, gy) = s.screen_to_graph(x, y);
		engine_md.set_pointer(Some(Position::new(gx, gy)));

		if let Some((anchor, position)) = s.ring_node(|nx, ny| engine_md.is_mouse_in_hover_area(nx, ny)) {
			engine_md.begin_connection(anchor, position);
			engine_md.add_ghost_node(None);
			return;
		}

		if let Some((idx, id)) = s.node_at_position(x, y, radius) {
			engine_md.select_node(Some(id));
			selection.set(Some(id));
			s.drag.active = true;
			s.drag.node_idx = Some(idx);
			s.drag.start_x = x;
			s.drag.start_y = y;
			s.graph.visit_nodes(|node| {
				if node.index() == idx {
					s.drag.node_start_x = node.x();
					s.drag.node_start_y = node.y();
				}
			});
		} else {
			engine_md.select_node(None);
			selection.set(None);
			s.pan.active = true;
			s.pan.start_x = x;
			s.pan.start_y = y;
			s.pan.transform_start_x = s.transform.x;
			s.pan.transform_start_y = s.transform.y;
		}
	};

	let (state_mm, engine_mm) = (state.clone(), engine.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};
		let mut guard = state_mm.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		let (gx, gy) = s.screen_to_graph(x, y);
		engine_mm.set_pointer(Some(Position::new(gx, gy)));

		if s.drag.active {
			if let Some(idx) = s.drag.node_idx {
				let (dx, dy) = (
					(x - s.drag.start_x) / s.transform.k,
					(y - s.drag.start_y) / s.transform.k,
				);
				let (nx, ny) = (
					s.drag.node_start_x + dx as f32,
					s.drag.node_start_y + dy as f32,
				);
				s.graph.visit_nodes_mut(|node| {
					if node.index() == idx {
						node.data.x = nx;
						node.data.y = ny;
						node.data.is_anchor = true;
					}
				});
			}
		} else if s.pan.active {
			s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
			s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
		}
	};

	let (state_mu, engine_mu) = (state.clone(), engine.clone());
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
		}

		let pointer = engine_mu.pointer();
		let Some(connection) = engine_mu.remove_ghost_node() else {
			return;
		};
		let hover_radius = engine_mu.config().overlay.hover_radius;
		let released_outside = pointer
			.is_some_and(|p| p.distance_squared(&connection.position) > hover_radius * hover_radius);
		let Some(anchor) = connection.anchor.as_db().filter(|_| released_outside) else {
			debug!("connection gesture cancelled");
			return;
		};

		let group = engine_mu
			.store()
			.nodes
			.get(&connection.anchor)
			.and_then(|node| node.labels().first().cloned())
			.unwrap_or_else(|| DEFAULT_GROUP.to_string());
		let request = NewConnectedNode {
			anchor,
			edge_label: NEW_EDGE_LABEL.into(),
			direction: "outgoing".into(),
			group,
			name: NEW_NODE_NAME.into(),
		};
		let engine = engine_mu.clone();
		spawn_local(async move {
			// failures are reported by the engine
			if let Ok(id) = engine.add_node_to_db(&request).await {
				engine.select_node(Some(NodeId::Db(id)));
				selection.set(Some(NodeId::Db(id)));
			}
		});
	};

	let on_dblclick = {
		let (state, engine) = (state.clone(), engine.clone());
		move |ev: MouseEvent| {
			let Some((x, y)) = canvas_point(&ev) else {
				return;
			};
			let hit = state
				.borrow()
				.as_ref()
				.and_then(|s| s.node_at_position(x, y, radius))
				.and_then(|(_, id)| id.as_db());
			let Some(id) = hit else {
				return;
			};
			let engine = engine.clone();
			spawn_local(async move {
				let _ = engine.load_additional_connections(id).await;
			});
		}
	};

	let (state_ml, engine_ml) = (state.clone(), engine.clone());
	let on_mouseleave = move |_: MouseEvent| {
		engine_ml.remove_ghost_node();
		engine_ml.set_pointer(None);
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:dblclick=on_dblclick
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
