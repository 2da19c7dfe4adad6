//! Query execution against the remote graph store over a single long-lived
//! session.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::{GraphError, Result};
use super::types::{Properties, PropertyValue};

/// Statement parameters, bound by name.
pub type Params = BTreeMap<String, PropertyValue>;

/// Where and as whom to connect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Server URI (`bolt://`, `neo4j://` or `http(s)://`).
	pub server: String,
	/// User name.
	pub user: String,
	/// Password.
	pub password: String,
}

/// A node as delivered by the store, before canonicalization.
#[derive(Clone, Debug, PartialEq)]
pub struct RawNode {
	/// Database identity.
	pub identity: i64,
	/// Labels in the order the server lists them.
	pub labels: Vec<String>,
	/// Node properties.
	pub properties: Properties,
}

/// A relationship as delivered by the store, before canonicalization.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRelationship {
	/// Relationship identity.
	pub identity: i64,
	/// Identity of the start node.
	pub start: i64,
	/// Identity of the end node.
	pub end: i64,
	/// Relationship type.
	pub kind: String,
	/// Relationship properties.
	pub properties: Properties,
}

/// A single typed field of a record.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
	/// A node.
	Node(RawNode),
	/// A relationship.
	Relationship(RawRelationship),
	/// A path; only its length is kept.
	Path { length: usize },
	/// Any non-graph value.
	Scalar(PropertyValue),
	/// A type the transport could not classify, by name.
	Other(String),
}

impl FieldValue {
	/// Short name of the field's type, for diagnostics.
	pub fn type_name(&self) -> &str {
		match self {
			FieldValue::Node(_) => "node",
			FieldValue::Relationship(_) => "relationship",
			FieldValue::Path { .. } => "path",
			FieldValue::Scalar(_) => "scalar",
			FieldValue::Other(kind) => kind,
		}
	}

	/// Integer view of a scalar field.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			FieldValue::Scalar(value) => value.as_int(),
			_ => None,
		}
	}
}

/// One result row as named fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
	fields: Vec<(String, FieldValue)>,
}

impl Record {
	/// A record with `fields` in column order.
	pub fn new(fields: Vec<(String, FieldValue)>) -> Self {
		Self { fields }
	}

	/// Field named `key`.
	pub fn get(&self, key: &str) -> Option<&FieldValue> {
		self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	/// Fields in column order.
	pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(k, v)| (k.as_str(), v))
	}
}

/// All rows of a result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
	/// Rows in result order.
	pub records: Vec<Record>,
}

impl RecordSet {
	/// A result set over `records`.
	pub fn new(records: Vec<Record>) -> Self {
		Self { records }
	}

	/// First value of `key` across the records.
	pub fn first(&self, key: &str) -> Option<&FieldValue> {
		self.records.iter().find_map(|r| r.get(key))
	}
}

/// An open connection able to run statements. Not reentrant: callers await
/// each call before issuing the next one.
#[async_trait(?Send)]
pub trait QueryExecutor {
	/// Run one statement in its own transaction.
	async fn run(&self, query: &str, params: &Params) -> Result<RecordSet>;

	/// Round-trip that proves the server is reachable and accepts the credentials.
	async fn verify(&self) -> Result<()>;

	/// Release the connection.
	async fn close(&self) -> Result<()>;
}

/// Opens executors for a set of credentials.
#[async_trait(?Send)]
pub trait Connector {
	/// Open an executor. The executor is not verified yet.
	async fn open(&self, credentials: &Credentials) -> Result<Rc<dyn QueryExecutor>>;
}

/// Holds at most one active executor and enforces the connect/disconnect
/// lifecycle around it.
pub struct Session {
	connector: Box<dyn Connector>,
	active: RefCell<Option<Rc<dyn QueryExecutor>>>,
}

impl Session {
	/// A session that is not connected yet.
	pub fn new(connector: Box<dyn Connector>) -> Self {
		Self {
			connector,
			active: RefCell::new(None),
		}
	}

	/// Whether an executor is active.
	pub fn is_connected(&self) -> bool {
		self.active.borrow().is_some()
	}

	/// Open and verify a new executor. State is only committed once the
	/// server answered; a previous session must be disconnected by the caller.
	pub async fn connect(&self, credentials: &Credentials) -> Result<()> {
		debug!("connecting to {}", credentials.server);
		let executor = self.connector.open(credentials).await?;
		if let Err(err) = executor.verify().await {
			if let Err(close_err) = executor.close().await {
				warn!("closing unverified connection failed: {close_err}");
			}
			return Err(err);
		}
		*self.active.borrow_mut() = Some(executor);
		debug!("session established with {}", credentials.server);
		Ok(())
	}

	/// Close the active executor. A no-op when nothing is connected.
	pub async fn disconnect(&self) -> Result<()> {
		let Some(executor) = self.active.borrow_mut().take() else {
			debug!("disconnect requested without an active session");
			return Ok(());
		};
		executor.close().await
	}

	/// Run a statement on the active executor, or fail with a connection error.
	pub async fn run(&self, query: &str, params: &Params) -> Result<RecordSet> {
		let executor = self.executor()?;
		debug!("run: {query}");
		executor.run(query, params).await
	}

	fn executor(&self) -> Result<Rc<dyn QueryExecutor>> {
		self.active.borrow().clone().ok_or_else(GraphError::not_connected)
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;

	use super::*;
	use crate::graph::testing::{Script, ScriptedConnector};

	#[test]
	fn run_without_session_is_a_connection_error() {
		let session = Session::new(Box::new(ScriptedConnector::new(Script::new())));
		let err = block_on(session.run("RETURN 1", &Params::new())).unwrap_err();
		assert!(matches!(err, GraphError::Connection(_)));
	}

	#[test]
	fn failed_verification_does_not_commit_the_session() {
		let script = Script::new();
		script.fail_verify.set(true);
		let session = Session::new(Box::new(ScriptedConnector::new(script.clone())));

		let err = block_on(session.connect(&Credentials::default())).unwrap_err();
		assert!(matches!(err, GraphError::Connection(_)));
		assert!(!session.is_connected());
		assert_eq!(script.closed.get(), 1);
	}

	#[test]
	fn disconnect_is_safe_without_a_session() {
		let script = Script::new();
		let session = Session::new(Box::new(ScriptedConnector::new(script.clone())));
		block_on(session.disconnect()).unwrap();

		block_on(session.connect(&Credentials::default())).unwrap();
		block_on(session.disconnect()).unwrap();
		block_on(session.disconnect()).unwrap();
		assert_eq!(script.closed.get(), 1);
		assert!(!session.is_connected());
	}

	#[test]
	fn record_lookup_by_key() {
		let record = Record::new(vec![
			("a".into(), FieldValue::Scalar(PropertyValue::Int(7))),
			("b".into(), FieldValue::Path { length: 2 }),
		]);
		assert_eq!(record.get("a").and_then(FieldValue::as_int), Some(7));
		assert_eq!(record.get("b").map(FieldValue::type_name), Some("path"));
		assert!(record.get("c").is_none());
	}
}
