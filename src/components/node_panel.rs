use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::graph::{GraphNode, GraphSync, NodeId, PropertyUpdate, PropertyValue};

/// Properties of the selected node with a single-property editor and a
/// delete button. Re-reads the node from the store whenever the store or the
/// selection changes; the engine's selection is authoritative and
/// `selection` is cleared once the node is gone.
#[component]
pub fn NodePanel(
	engine: Rc<GraphSync>,
	selection: RwSignal<Option<NodeId>>,
	revision: Trigger,
) -> impl IntoView {
	let details = RwSignal::new(None::<GraphNode>);
	let (key, value) = (RwSignal::new(String::new()), RwSignal::new(String::new()));

	let engine_watch = engine.clone();
	Effect::new(move |_| {
		revision.track();
		selection.track();
		let node = engine_watch.selected_node();
		if node.is_none() && selection.get_untracked().is_some() {
			selection.set(None);
		}
		details.set(node);
	});

	let engine_set = engine.clone();
	let on_set = move |_| {
		let Some(id) = engine_set.selected_node().and_then(|node| node.id.as_db()) else {
			return;
		};
		let (k, v) = (key.get_untracked(), value.get_untracked());
		let update = if v.is_empty() {
			PropertyUpdate::remove(k)
		} else {
			PropertyUpdate::set(k, PropertyValue::from_input(&v))
		};
		let engine = engine_set.clone();
		spawn_local(async move {
			if engine.update_node_property(id, &[update]).await.is_ok() {
				value.set(String::new());
			}
		});
	};

	let engine_delete = engine.clone();
	let on_delete = move |_| {
		let Some(id) = engine_delete.selected_node().and_then(|node| node.id.as_db()) else {
			return;
		};
		let engine = engine_delete.clone();
		spawn_local(async move {
			if engine.remove_node_from_db(id).await.is_ok() {
				selection.set(None);
			}
		});
	};

	view! {
		<aside class="node-panel" class:hidden=move || details.with(Option::is_none)>
			<h2>{move || details.with(|n| n.as_ref().and_then(|n| n.label.clone()).unwrap_or_default())}</h2>
			<p class="labels">{move || details.with(|n| n.as_ref().map(|n| n.labels().join(", ")).unwrap_or_default())}</p>
			<ul class="properties">
				{move || {
					details
						.get()
						.map(|node| {
							node.properties
								.into_iter()
								.map(|(k, v)| view! { <li><b>{k}</b>": "{v.to_string()}</li> })
								.collect_view()
						})
				}}
			</ul>
			<input type="text" placeholder="property" bind:value=key />
			<input type="text" placeholder="value (JSON or text, empty removes)" bind:value=value />
			<button on:click=on_set>"Set"</button>
			<button class="danger" on:click=on_delete>"Delete node"</button>
		</aside>
	}
}
