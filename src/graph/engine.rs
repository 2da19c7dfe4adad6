//! The synchronization engine: owns the session, the entity store and the
//! overlay, and keeps the store in step with the database.

use std::cell::{Cell, Ref, RefCell};

use log::{debug, error, info};

use super::error::{GraphError, Result};
use super::executor::{Connector, Credentials, Params, RecordSet, Session};
use super::mutation::{self, NEW_NODE_COLUMN, NewConnectedNode, PropertyUpdate, Statement};
use super::notify::Notifier;
use super::overlay::{Overlay, OverlayConfig, PendingConnection};
use super::parser::parse_record_set;
use super::reconcile::{ReconcilePolicy, ReconcileReport, reconcile};
use super::store::{ChangeEvent, EntityStore, ListenerId};
use super::types::{EdgeId, GraphNode, NodeId, Position};

/// Tuning of a [`GraphSync`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncConfig {
	/// Policy for refreshes that are not explicit full loads.
	pub refresh_policy: ReconcilePolicy,
	/// Geometry and cadence of the edge-creation overlay.
	pub overlay: OverlayConfig,
}

/// What happened to a load once its query returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
	/// The result was reconciled into the store.
	Applied(ReconcileReport),
	/// A newer load started while this one was in flight; its result was dropped.
	Superseded,
}

/// Keeps an [`EntityStore`] in step with a graph database and writes edits
/// back. Shared as `Rc<GraphSync>`; every operation takes `&self`.
pub struct GraphSync {
	session: Session,
	store: RefCell<EntityStore>,
	overlay: RefCell<Overlay>,
	current_query: RefCell<String>,
	generation: Cell<u64>,
	selected: Cell<Option<NodeId>>,
	notifier: Box<dyn Notifier>,
	config: SyncConfig,
}

impl GraphSync {
	/// An engine with no session. Call [`GraphSync::initialize`] or
	/// [`GraphSync::connect`] before loading.
	pub fn new(connector: Box<dyn Connector>, notifier: Box<dyn Notifier>, config: SyncConfig) -> Self {
		Self {
			session: Session::new(connector),
			store: RefCell::new(EntityStore::new()),
			overlay: RefCell::new(Overlay::new(config.overlay.clone())),
			current_query: RefCell::new(String::new()),
			generation: Cell::new(0),
			selected: Cell::new(None),
			notifier,
			config,
		}
	}

	/// Configuration the engine was built with.
	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	/// Read access to the mirrored collections. Do not hold across an await.
	pub fn store(&self) -> Ref<'_, EntityStore> {
		self.store.borrow()
	}

	/// Listen to node collection changes. Events arrive after the engine has
	/// released the store, so listeners may read it.
	pub fn subscribe_nodes(&self, listener: impl Fn(&ChangeEvent<NodeId>) + 'static) -> ListenerId {
		self.store.borrow_mut().nodes.subscribe(listener)
	}

	/// Listen to edge collection changes.
	pub fn subscribe_edges(&self, listener: impl Fn(&ChangeEvent<EdgeId>) + 'static) -> ListenerId {
		self.store.borrow_mut().edges.subscribe(listener)
	}

	/// Last successfully applied query.
	pub fn current_query(&self) -> String {
		self.current_query.borrow().clone()
	}

	/// Whether a session is open.
	pub fn is_connected(&self) -> bool {
		self.session.is_connected()
	}

	/// Connect, then fully load the initial query.
	pub async fn initialize(&self, credentials: &Credentials, initial_query: &str) -> Result<()> {
		self.connect(credentials).await?;
		self.load_cypher(initial_query, true).await?;
		Ok(())
	}

	/// Replace any existing session with a verified new one. Failing to close
	/// the old session is reported but does not stop the new connection.
	pub async fn connect(&self, credentials: &Credentials) -> Result<()> {
		if self.session.is_connected() {
			if let Err(err) = self.session.disconnect().await {
				self.report("Error disconnecting from the graph database.", &err);
			}
		}
		self.session.connect(credentials).await.map_err(|err| {
			self.fail(
				"Error connecting to the graph database. Make sure the settings are correct.",
				err,
			)
		})?;
		info!("connected to {}", credentials.server);
		Ok(())
	}

	/// Close the session. Safe to call when nothing is connected.
	pub async fn disconnect(&self) -> Result<()> {
		self.session
			.disconnect()
			.await
			.map_err(|err| self.fail("Error disconnecting from the graph database.", err))
	}

	/// Run `query` and reconcile the store with its result. `clear` selects a
	/// full replace instead of an incremental merge.
	pub async fn load_cypher(&self, query: &str, clear: bool) -> Result<LoadOutcome> {
		self.load(query, ReconcilePolicy::from_clear_flag(clear)).await
	}

	/// Load the neighbourhood of `node_id` under the refresh policy.
	pub async fn load_additional_connections(&self, node_id: i64) -> Result<LoadOutcome> {
		self.load(&mutation::neighborhood_query(node_id), self.config.refresh_policy)
			.await
	}

	/// Apply all `updates` to a node in one statement, then refresh the view.
	pub async fn update_node_property(&self, id: i64, updates: &[PropertyUpdate]) -> Result<()> {
		debug!("updating node {id} with {updates:?}");
		let statement = mutation::update_properties(id, updates)
			.map_err(|err| self.fail("Invalid property update.", err))?;
		self.execute(&statement, "Error updating node.").await?;
		self.refresh().await
	}

	/// Create a node connected to `request.anchor` and return its identity.
	pub async fn add_node_to_db(&self, request: &NewConnectedNode) -> Result<i64> {
		let statement = mutation::create_connected_node(request)
			.map_err(|err| self.fail("Invalid node request.", err))?;
		let records = self.execute(&statement, "Error adding new node.").await?;
		let new_id = records
			.first(NEW_NODE_COLUMN)
			.and_then(|field| field.as_int())
			.ok_or_else(|| {
				self.fail(
					"Error adding new node.",
					GraphError::Query(format!("create statement returned no `{NEW_NODE_COLUMN}`")),
				)
			})?;
		info!(
			"new node created with id {new_id}, group {} and name {}",
			request.group, request.name
		);
		self.load(
			&mutation::neighborhood_query(request.anchor),
			self.config.refresh_policy,
		)
		.await?;
		Ok(new_id)
	}

	/// Delete a node and its relationships, then replay the current query.
	pub async fn remove_node_from_db(&self, node_id: i64) -> Result<()> {
		self.execute(&mutation::delete_node(node_id), "Error removing node.")
			.await?;
		if self.selected.get() == Some(NodeId::Db(node_id)) {
			self.selected.set(None);
		}
		self.refresh().await
	}

	/// Select a node by id, or clear the selection.
	pub fn select_node(&self, id: Option<NodeId>) {
		self.selected.set(id);
	}

	/// The selected node as it is in the store right now.
	pub fn selected_node(&self) -> Option<GraphNode> {
		let id = self.selected.get()?;
		self.store.borrow().nodes.get(&id).cloned()
	}

	/// Pointer position in graph coordinates, `None` once it left the canvas.
	pub fn set_pointer(&self, pointer: Option<Position>) {
		self.overlay.borrow_mut().set_pointer(pointer);
	}

	/// Last pointer position.
	pub fn pointer(&self) -> Option<Position> {
		self.overlay.borrow().pointer()
	}

	/// Remember the node an edge-creation gesture started from.
	pub fn begin_connection(&self, anchor: NodeId, position: Position) {
		self.overlay.borrow_mut().begin_connection(anchor, position);
	}

	/// The edge-creation gesture in progress, if any.
	pub fn pending_connection(&self) -> Option<PendingConnection> {
		self.overlay.borrow().connection()
	}

	/// Show the ghost node at `position`, or at the pointer.
	pub fn add_ghost_node(&self, position: Option<Position>) {
		self.overlay
			.borrow()
			.add_ghost_node(&mut self.store.borrow_mut().nodes, position);
		self.publish();
	}

	/// Remove the ghost node and end the gesture, returning its anchor.
	pub fn remove_ghost_node(&self) -> Option<PendingConnection> {
		let pending = self
			.overlay
			.borrow_mut()
			.remove_ghost_node(&mut self.store.borrow_mut().nodes);
		self.publish();
		pending
	}

	/// Whether `(x, y)` lies in the hover ring around a node centred there.
	pub fn is_mouse_in_hover_area(&self, x: f64, y: f64) -> bool {
		self.overlay.borrow().is_mouse_in_hover_area(x, y)
	}

	/// One step of the ghost refresh loop. Skips the step instead of failing
	/// when the store is busy.
	pub fn tick_overlay(&self) -> bool {
		let moved = {
			let (Ok(overlay), Ok(mut store)) = (self.overlay.try_borrow(), self.store.try_borrow_mut())
			else {
				debug!("overlay tick skipped: state busy");
				return false;
			};
			overlay.tick(&mut store.nodes)
		};
		self.publish();
		moved
	}

	async fn load(&self, query: &str, policy: ReconcilePolicy) -> Result<LoadOutcome> {
		let ticket = self.generation.get() + 1;
		self.generation.set(ticket);

		let records = self
			.session
			.run(query, &Params::new())
			.await
			.map_err(|err| self.fail("Error loading cypher.", err))?;

		if self.generation.get() != ticket {
			debug!("discarding superseded result of `{query}`");
			return Ok(LoadOutcome::Superseded);
		}

		let parsed = parse_record_set(&records);
		let report = reconcile(&mut self.store.borrow_mut(), parsed, policy);
		*self.current_query.borrow_mut() = query.to_string();
		self.drop_missing_selection();
		self.publish();
		Ok(LoadOutcome::Applied(report))
	}

	/// Replay the current query with the refresh policy.
	async fn refresh(&self) -> Result<()> {
		let query = self.current_query();
		if query.is_empty() {
			debug!("nothing loaded yet, skipping refresh");
			return Ok(());
		}
		self.load(&query, self.config.refresh_policy).await?;
		Ok(())
	}

	async fn execute(&self, statement: &Statement, message: &str) -> Result<RecordSet> {
		self.session
			.run(&statement.text, &statement.params)
			.await
			.map_err(|err| self.fail(message, err))
	}

	/// Deliver queued store events with no borrow of the store or the overlay
	/// held, so listeners may read the engine. Events stay queued while
	/// someone else holds the store.
	fn publish(&self) {
		let Ok(mut store) = self.store.try_borrow_mut() else {
			return;
		};
		let events = store.take_events();
		drop(store);
		events.send();
	}

	fn drop_missing_selection(&self) {
		if let Some(id) = self.selected.get() {
			if !self.store.borrow().nodes.contains(&id) {
				self.selected.set(None);
			}
		}
	}

	fn report(&self, message: &str, err: &GraphError) {
		error!("{message} {err}");
		self.notifier.error(message);
	}

	fn fail(&self, message: &str, err: GraphError) -> GraphError {
		self.report(message, &err);
		err
	}
}
