use leptos::prelude::*;

use crate::graph::{Notice, Notifier, Severity};

/// Notifier that queues notices for the [`Notifications`] list.
#[derive(Clone, Copy, Debug)]
pub struct ToastNotifier {
	notices: RwSignal<Vec<Notice>>,
}

impl ToastNotifier {
	pub fn new(notices: RwSignal<Vec<Notice>>) -> Self {
		Self { notices }
	}
}

impl Notifier for ToastNotifier {
	fn notify(&self, notice: Notice) {
		self.notices.update(|notices| notices.push(notice));
	}
}

/// Pending notices; clicking one dismisses it.
#[component]
pub fn Notifications(notices: RwSignal<Vec<Notice>>) -> impl IntoView {
	view! {
		<ul class="notifications">
			{move || {
				notices
					.get()
					.into_iter()
					.enumerate()
					.map(|(i, notice)| {
						let class = match notice.severity {
							Severity::Error => "toast toast-error",
							Severity::Info => "toast",
						};
						view! {
							<li
								class=class
								on:click=move |_| {
									notices
										.update(|notices| {
											if i < notices.len() {
												notices.remove(i);
											}
										})
								}
							>
								{notice.message}
							</li>
						}
					})
					.collect_view()
			}}
		</ul>
	}
}
