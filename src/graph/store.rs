//! Keyed, order-preserving node and edge collections.
//!
//! Change notifications are advisory: listeners observe what happened but the
//! collections never depend on them. Events are queued while a collection is
//! being changed and delivered later through [`Dispatch::send`], so listeners
//! never run while the collection is borrowed.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use super::types::{EdgeId, GraphEdge, GraphNode, NodeId};

/// Something that lives in a [`Collection`] under a unique key.
pub trait Entity {
	/// Identity type.
	type Key: Copy + Eq + Hash + Debug;

	/// The entity's identity.
	fn key(&self) -> Self::Key;

	/// Fold a fresher version of the same entity into `self`.
	fn merge(&mut self, incoming: Self);
}

impl Entity for GraphNode {
	type Key = NodeId;

	fn key(&self) -> NodeId {
		self.id
	}

	fn merge(&mut self, incoming: Self) {
		GraphNode::merge(self, incoming);
	}
}

impl Entity for GraphEdge {
	type Key = EdgeId;

	fn key(&self) -> EdgeId {
		self.id
	}

	fn merge(&mut self, incoming: Self) {
		GraphEdge::merge(self, incoming);
	}
}

/// Kind of a collection change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
	/// New keys.
	Add,
	/// Existing keys whose entity was replaced.
	Update,
	/// Removed keys.
	Remove,
}

/// A batch of keys that changed the same way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent<K> {
	/// What happened.
	pub change: Change,
	/// Keys in the order they were touched.
	pub ids: Vec<K>,
}

/// Handle returned by `subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<K> = Rc<dyn Fn(&ChangeEvent<K>)>;

/// Queued events paired with the listeners subscribed when they were taken.
#[must_use = "events are only delivered by `send`"]
pub struct Dispatch<K> {
	events: Vec<ChangeEvent<K>>,
	listeners: Vec<Listener<K>>,
}

impl<K> Dispatch<K> {
	/// Whether there is nothing to deliver.
	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	/// Deliver every event, in order, to every listener.
	pub fn send(self) {
		for event in &self.events {
			for listener in &self.listeners {
				listener(event);
			}
		}
	}
}

/// Entities of one kind, in insertion order, with keyed lookup.
///
/// Changes queue [`ChangeEvent`]s for subscribers; nothing is delivered until
/// [`Collection::take_events`] or [`Collection::flush`].
pub struct Collection<T: Entity> {
	items: Vec<T>,
	index: HashMap<T::Key, usize>,
	listeners: Vec<(ListenerId, Listener<T::Key>)>,
	next_listener: u64,
	pending: Vec<ChangeEvent<T::Key>>,
}

impl<T: Entity> Default for Collection<T> {
	fn default() -> Self {
		Self {
			items: Vec::new(),
			index: HashMap::new(),
			listeners: Vec::new(),
			next_listener: 0,
			pending: Vec::new(),
		}
	}
}

impl<T: Entity> Collection<T> {
	/// An empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of entities.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Whether the collection holds nothing.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Whether `key` is present.
	pub fn contains(&self, key: &T::Key) -> bool {
		self.index.contains_key(key)
	}

	/// Entity stored under `key`.
	pub fn get(&self, key: &T::Key) -> Option<&T> {
		self.index.get(key).map(|&i| &self.items[i])
	}

	/// Items in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &T> {
		self.items.iter()
	}

	/// Keys in insertion order.
	pub fn ids(&self) -> Vec<T::Key> {
		self.items.iter().map(Entity::key).collect()
	}

	/// Insert a new item. Returns `false` and leaves the collection untouched
	/// if the key is already present.
	pub fn add(&mut self, item: T) -> bool {
		let key = item.key();
		if self.index.contains_key(&key) {
			return false;
		}
		self.insert(item);
		self.emit(Change::Add, vec![key]);
		true
	}

	/// Upsert one item.
	pub fn update(&mut self, item: T) {
		self.update_batch(std::iter::once(item));
	}

	/// Upsert a sequence of items as one logical unit: at most one `Add` and
	/// one `Update` event are emitted, after every item has been applied.
	/// Later items win over earlier ones with the same key.
	pub fn update_batch(&mut self, items: impl IntoIterator<Item = T>) {
		let (mut added, mut updated) = (Vec::new(), Vec::new());
		let mut seen = HashSet::new();
		for item in items {
			let key = item.key();
			let first = seen.insert(key);
			match self.index.get(&key) {
				Some(&i) => {
					self.items[i].merge(item);
					if first {
						updated.push(key);
					}
				}
				None => {
					self.insert(item);
					added.push(key);
				}
			}
		}
		if !added.is_empty() {
			self.emit(Change::Add, added);
		}
		if !updated.is_empty() {
			self.emit(Change::Update, updated);
		}
	}

	/// Remove one entity.
	pub fn remove(&mut self, key: &T::Key) -> Option<T> {
		let i = self.index.remove(key)?;
		let item = self.items.remove(i);
		self.reindex_from(i);
		self.emit(Change::Remove, vec![*key]);
		Some(item)
	}

	/// Remove every item matching `predicate` with a single event.
	pub fn remove_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Vec<T::Key> {
		let removed: Vec<T::Key> = self
			.items
			.iter()
			.filter(|item| predicate(item))
			.map(Entity::key)
			.collect();
		if removed.is_empty() {
			return removed;
		}
		let doomed: HashSet<T::Key> = removed.iter().copied().collect();
		self.items.retain(|item| !doomed.contains(&item.key()));
		self.reindex_from(0);
		self.emit(Change::Remove, removed.clone());
		removed
	}

	/// Remove everything, returning the removed keys.
	pub fn clear(&mut self) -> Vec<T::Key> {
		self.remove_where(|_| true)
	}

	/// Register a listener for queued change events.
	pub fn subscribe(&mut self, listener: impl Fn(&ChangeEvent<T::Key>) + 'static) -> ListenerId {
		let id = ListenerId(self.next_listener);
		self.next_listener += 1;
		self.listeners.push((id, Rc::new(listener)));
		id
	}

	/// Drop a listener. Returns whether it was registered.
	pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
		let before = self.listeners.len();
		self.listeners.retain(|(l, _)| *l != id);
		self.listeners.len() != before
	}

	/// Take the queued events for delivery once the collection is no longer
	/// borrowed.
	pub fn take_events(&mut self) -> Dispatch<T::Key> {
		Dispatch {
			events: std::mem::take(&mut self.pending),
			listeners: self.listeners.iter().map(|(_, l)| l.clone()).collect(),
		}
	}

	/// Deliver queued events right away.
	pub fn flush(&mut self) {
		self.take_events().send();
	}

	fn insert(&mut self, item: T) {
		self.index.insert(item.key(), self.items.len());
		self.items.push(item);
	}

	fn reindex_from(&mut self, start: usize) {
		if start == 0 {
			self.index.clear();
		}
		for (i, item) in self.items.iter().enumerate().skip(start) {
			self.index.insert(item.key(), i);
		}
	}

	fn emit(&mut self, change: Change, ids: Vec<T::Key>) {
		if !self.listeners.is_empty() {
			self.pending.push(ChangeEvent { change, ids });
		}
	}
}

/// The node and edge collections mirrored from the database.
#[derive(Default)]
pub struct EntityStore {
	/// Nodes, including the transient ghost.
	pub nodes: Collection<GraphNode>,
	/// Edges.
	pub edges: Collection<GraphEdge>,
}

impl EntityStore {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Take the queued events of both collections.
	pub fn take_events(&mut self) -> StoreEvents {
		StoreEvents {
			nodes: self.nodes.take_events(),
			edges: self.edges.take_events(),
		}
	}

	/// Edges whose endpoints are both present.
	pub fn is_consistent(&self) -> bool {
		self.edges
			.iter()
			.all(|e| self.nodes.contains(&e.from) && self.nodes.contains(&e.to))
	}
}

/// Pending events of an [`EntityStore`], nodes first.
#[must_use = "events are only delivered by `send`"]
pub struct StoreEvents {
	nodes: Dispatch<NodeId>,
	edges: Dispatch<EdgeId>,
}

impl StoreEvents {
	/// Deliver node events, then edge events.
	pub fn send(self) {
		self.nodes.send();
		self.edges.send();
	}
}
