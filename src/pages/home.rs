use std::rc::Rc;

use leptos::leptos_dom::helpers::set_interval_with_handle;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::error;

use crate::components::force_graph::ForceGraphCanvas;
use crate::components::node_panel::NodePanel;
use crate::components::notifications::{Notifications, ToastNotifier};
use crate::components::settings_panel::SettingsPanel;
use crate::graph::neo4j_http::HttpConnector;
use crate::graph::{GraphSync, NodeId, Notifier, SyncConfig};
use crate::settings::{
	APP_SETTINGS_KEY, AppSettings, LocalStorage, SERVER_SETTINGS_KEY, ServerSettings, Setting,
	SettingsStore,
};

/// Moves the ghost node after the pointer for as long as the page is mounted.
fn start_overlay_refresh(engine: Rc<GraphSync>) {
	let interval = engine.config().overlay.refresh_interval;
	match set_interval_with_handle(
		move || {
			engine.tick_overlay();
		},
		interval,
	) {
		Ok(handle) => on_cleanup(move || handle.clear()),
		Err(err) => error!("overlay refresh not started: {err:?}"),
	}
}

/// Editor page
#[component]
pub fn Home() -> impl IntoView {
	let storage: Rc<dyn SettingsStore> = Rc::new(LocalStorage);
	let server = Rc::new(Setting::load(
		SERVER_SETTINGS_KEY,
		storage.clone(),
		ServerSettings::default,
	));
	let app = Rc::new(Setting::load(APP_SETTINGS_KEY, storage, AppSettings::default));

	let notices = RwSignal::new(Vec::new());
	let notifier = ToastNotifier::new(notices);
	let engine = Rc::new(GraphSync::new(
		Box::new(HttpConnector::default()),
		Box::new(notifier),
		SyncConfig::default(),
	));

	let revision = Trigger::new();
	let selection = RwSignal::new(None::<NodeId>);
	// the ghost moves every tick; only persisted nodes need a redraw
	engine.subscribe_nodes(move |event| {
		if event.ids.iter().any(|id| !id.is_transient()) {
			revision.notify();
		}
	});
	engine.subscribe_edges(move |_| revision.notify());

	start_overlay_refresh(engine.clone());

	let settings = server.get();
	if settings.is_complete() {
		let (engine, query) = (engine.clone(), app.get().initial_cypher);
		spawn_local(async move {
			let _ = engine.initialize(&settings.credentials(), &query).await;
		});
	} else {
		notifier.info("No graph database configured yet.");
	}

	let (canvas_engine, settings_engine) = (engine.clone(), engine.clone());
	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas
				engine=canvas_engine
				revision=revision
				selection=selection
				fullscreen=true
			/>
			<div class="graph-overlay">
				<SettingsPanel engine=settings_engine server=server app=app />
				<NodePanel engine=engine selection=selection revision=revision />
			</div>
			<Notifications notices=notices />
		</div>
	}
}
