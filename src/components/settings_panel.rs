use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;

use crate::graph::GraphSync;
use crate::settings::{AppSettings, ServerSettings, Setting};

/// Connection form and query bar.
#[component]
pub fn SettingsPanel(
	engine: Rc<GraphSync>,
	server: Rc<Setting<ServerSettings>>,
	app: Rc<Setting<AppSettings>>,
) -> impl IntoView {
	let current = server.get();
	let url = RwSignal::new(current.server);
	let user = RwSignal::new(current.user);
	let password = RwSignal::new(current.password);
	let query = RwSignal::new(app.get().initial_cypher);
	let clear = RwSignal::new(true);

	let (engine_connect, app_connect) = (engine.clone(), app.clone());
	let on_connect = move |_| {
		let settings = ServerSettings {
			server: url.get_untracked(),
			user: user.get_untracked(),
			password: password.get_untracked(),
		};
		if let Err(err) = server.set(settings.clone()) {
			warn!("server settings not saved: {err}");
		}
		let (engine, initial) = (engine_connect.clone(), app_connect.get().initial_cypher);
		spawn_local(async move {
			let _ = engine.initialize(&settings.credentials(), &initial).await;
		});
	};

	let on_run = move |_| {
		let (engine, text) = (engine.clone(), query.get_untracked());
		spawn_local(async move {
			let _ = engine.load_cypher(&text, clear.get_untracked()).await;
		});
	};

	let on_save_query = move |_| {
		let settings = AppSettings {
			initial_cypher: query.get_untracked(),
		};
		if let Err(err) = app.set(settings) {
			warn!("app settings not saved: {err}");
		}
	};

	view! {
		<form class="settings-panel" on:submit=|ev| ev.prevent_default()>
			<fieldset>
				<input type="text" placeholder="http://localhost:7474" bind:value=url />
				<input type="text" placeholder="user" bind:value=user />
				<input type="password" placeholder="password" bind:value=password />
				<button type="button" on:click=on_connect>"Connect"</button>
			</fieldset>
			<fieldset>
				<input type="text" class="cypher" bind:value=query />
				<label>
					<input type="checkbox" bind:checked=clear />
					"Clear"
				</label>
				<button type="button" on:click=on_run>"Run"</button>
				<button type="button" on:click=on_save_query>"Use on startup"</button>
			</fieldset>
		</form>
	}
}
