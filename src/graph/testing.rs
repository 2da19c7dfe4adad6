//! Scripted in-memory executor and record builders for tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;

use super::error::{GraphError, Result};
use super::executor::{
	Connector, Credentials, FieldValue, Params, QueryExecutor, RawNode, RawRelationship, Record,
	RecordSet,
};
use super::notify::{Notice, Notifier};
use super::types::{Properties, PropertyValue};

enum Reply {
	Ready(Result<RecordSet>),
	Gated(oneshot::Receiver<Result<RecordSet>>),
}

/// Shared script: queued replies plus a log of every statement run.
#[derive(Default)]
pub struct Script {
	replies: RefCell<VecDeque<Reply>>,
	pub statements: RefCell<Vec<(String, Params)>>,
	pub fail_verify: Cell<bool>,
	pub fail_close: Cell<bool>,
	pub fail_open: Cell<bool>,
	pub opened: Cell<usize>,
	pub closed: Cell<usize>,
}

impl Script {
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub fn reply(&self, records: RecordSet) {
		self.replies.borrow_mut().push_back(Reply::Ready(Ok(records)));
	}

	pub fn fail(&self, err: GraphError) {
		self.replies.borrow_mut().push_back(Reply::Ready(Err(err)));
	}

	/// Queue a reply that resolves only once the returned sender fires.
	pub fn gate(&self) -> oneshot::Sender<Result<RecordSet>> {
		let (tx, rx) = oneshot::channel();
		self.replies.borrow_mut().push_back(Reply::Gated(rx));
		tx
	}

	pub fn queries(&self) -> Vec<String> {
		self.statements.borrow().iter().map(|(q, _)| q.clone()).collect()
	}
}

pub struct ScriptedExecutor {
	script: Rc<Script>,
}

#[async_trait(?Send)]
impl QueryExecutor for ScriptedExecutor {
	async fn run(&self, query: &str, params: &Params) -> Result<RecordSet> {
		self.script
			.statements
			.borrow_mut()
			.push((query.to_string(), params.clone()));
		let reply = self.script.replies.borrow_mut().pop_front();
		match reply {
			Some(Reply::Ready(result)) => result,
			Some(Reply::Gated(rx)) => rx
				.await
				.unwrap_or_else(|_| Err(GraphError::Query("gate dropped".into()))),
			None => Ok(RecordSet::default()),
		}
	}

	async fn verify(&self) -> Result<()> {
		if self.script.fail_verify.get() {
			return Err(GraphError::Connection("unauthorized".into()));
		}
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		self.script.closed.set(self.script.closed.get() + 1);
		if self.script.fail_close.get() {
			return Err(GraphError::Connection("close failed".into()));
		}
		Ok(())
	}
}

pub struct ScriptedConnector {
	script: Rc<Script>,
}

impl ScriptedConnector {
	pub fn new(script: Rc<Script>) -> Self {
		Self { script }
	}
}

#[async_trait(?Send)]
impl Connector for ScriptedConnector {
	async fn open(&self, _credentials: &Credentials) -> Result<Rc<dyn QueryExecutor>> {
		if self.script.fail_open.get() {
			return Err(GraphError::Connection("host unreachable".into()));
		}
		self.script.opened.set(self.script.opened.get() + 1);
		Ok(Rc::new(ScriptedExecutor {
			script: self.script.clone(),
		}))
	}
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
	pub notices: Rc<RefCell<Vec<Notice>>>,
}

impl Notifier for RecordingNotifier {
	fn notify(&self, notice: Notice) {
		self.notices.borrow_mut().push(notice);
	}
}

pub fn props(pairs: &[(&str, PropertyValue)]) -> Properties {
	pairs
		.iter()
		.map(|(k, v)| (k.to_string(), v.clone()))
		.collect()
}

pub fn node(id: i64, labels: &[&str], properties: Properties) -> FieldValue {
	FieldValue::Node(RawNode {
		identity: id,
		labels: labels.iter().map(|l| l.to_string()).collect(),
		properties,
	})
}

pub fn rel(id: i64, start: i64, end: i64, kind: &str) -> FieldValue {
	FieldValue::Relationship(RawRelationship {
		identity: id,
		start,
		end,
		kind: kind.to_string(),
		properties: Properties::new(),
	})
}

/// One `n, r, m` record.
pub fn triple(n: FieldValue, r: FieldValue, m: FieldValue) -> Record {
	Record::new(vec![("n".into(), n), ("r".into(), r), ("m".into(), m)])
}

pub fn named(id: i64, name: &str) -> FieldValue {
	node(id, &["Thing"], props(&[("name", name.into())]))
}
