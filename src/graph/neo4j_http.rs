//! Executor over the Neo4j HTTP transactional endpoint.
//!
//! Every statement is sent to `/db/{database}/tx/commit` with both the `row`
//! and `graph` result formats. The per-column `meta` entries tell nodes,
//! relationships and paths apart; the `graph` section carries labels,
//! relationship types and endpoints.

use std::rc::Rc;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{GraphError, Result};
use super::executor::{
	Connector, Credentials, FieldValue, Params, QueryExecutor, RawNode, RawRelationship, Record,
	RecordSet,
};
use super::types::{Properties, PropertyValue};

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "neo4j";

/// Opens [`HttpExecutor`]s for one database.
#[derive(Clone, Debug)]
pub struct HttpConnector {
	database: String,
}

impl HttpConnector {
	/// A connector for `database`.
	pub fn new(database: impl Into<String>) -> Self {
		Self {
			database: database.into(),
		}
	}
}

impl Default for HttpConnector {
	fn default() -> Self {
		Self::new(DEFAULT_DATABASE)
	}
}

#[async_trait(?Send)]
impl Connector for HttpConnector {
	async fn open(&self, credentials: &Credentials) -> Result<Rc<dyn QueryExecutor>> {
		let endpoint = commit_endpoint(&credentials.server, &self.database)?;
		Ok(Rc::new(HttpExecutor {
			client: Client::new(),
			endpoint,
			user: credentials.user.clone(),
			password: credentials.password.clone(),
		}))
	}
}

/// Runs statements over HTTP with basic auth. Each statement commits on its own.
pub struct HttpExecutor {
	client: Client,
	endpoint: String,
	user: String,
	password: String,
}

impl HttpExecutor {
	async fn post(&self, body: &TxRequest<'_>) -> Result<TxResponse> {
		let response = self
			.client
			.post(&self.endpoint)
			.basic_auth(&self.user, Some(&self.password))
			.header("Accept", "application/json;charset=UTF-8")
			.json(body)
			.send()
			.await
			.map_err(|err| GraphError::Connection(err.to_string()))?;

		check_status(response.status())?;
		let decoded: TxResponse = response
			.json()
			.await
			.map_err(|err| GraphError::Query(format!("undecodable response: {err}")))?;
		check_errors(decoded)
	}
}

#[async_trait(?Send)]
impl QueryExecutor for HttpExecutor {
	async fn run(&self, query: &str, params: &Params) -> Result<RecordSet> {
		let request = TxRequest {
			statements: vec![TxStatement {
				statement: query,
				parameters: params,
				result_data_contents: ["row", "graph"],
			}],
		};
		let response = self.post(&request).await?;
		let result = response.results.into_iter().next().unwrap_or_default();
		decode_result(result)
	}

	async fn verify(&self) -> Result<()> {
		self.post(&TxRequest { statements: Vec::new() }).await.map(|_| ())
	}

	async fn close(&self) -> Result<()> {
		// auto-commit requests hold no server-side state
		debug!("closing HTTP session for {}", self.endpoint);
		Ok(())
	}
}

/// Build the commit URL. Bolt-style URIs are mapped onto the HTTP connector
/// of the same host (`7474`, or `7473` for the encrypted schemes).
pub fn commit_endpoint(server: &str, database: &str) -> Result<String> {
	let server = server.trim().trim_end_matches('/');
	if server.is_empty() {
		return Err(GraphError::Connection("no server configured".into()));
	}
	let (scheme, rest) = server
		.split_once("://")
		.ok_or_else(|| GraphError::Connection(format!("server `{server}` has no scheme")))?;
	let base = match scheme {
		"http" | "https" => server.to_string(),
		"bolt" | "neo4j" => format!("http://{}:7474", host_of(rest)),
		"bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => format!("https://{}:7473", host_of(rest)),
		other => {
			return Err(GraphError::Connection(format!("unsupported scheme `{other}`")));
		}
	};
	Ok(format!("{base}/db/{database}/tx/commit"))
}

fn host_of(authority: &str) -> &str {
	let authority = authority.split('/').next().unwrap_or(authority);
	match authority.rsplit_once(':') {
		Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
		_ => authority,
	}
}

#[derive(Serialize)]
struct TxRequest<'a> {
	statements: Vec<TxStatement<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TxStatement<'a> {
	statement: &'a str,
	parameters: &'a Params,
	result_data_contents: [&'static str; 2],
}

#[derive(Debug, Default, Deserialize)]
struct TxResponse {
	#[serde(default)]
	results: Vec<TxResult>,
	#[serde(default)]
	errors: Vec<TxError>,
}

#[derive(Debug, Default, Deserialize)]
struct TxResult {
	#[serde(default)]
	columns: Vec<String>,
	#[serde(default)]
	data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
	#[serde(default)]
	row: Vec<Value>,
	#[serde(default)]
	meta: Vec<Value>,
	#[serde(default)]
	graph: TxGraph,
}

#[derive(Debug, Default, Deserialize)]
struct TxGraph {
	#[serde(default)]
	nodes: Vec<TxNode>,
	#[serde(default)]
	relationships: Vec<TxRelationship>,
}

#[derive(Debug, Deserialize)]
struct TxNode {
	id: Value,
	#[serde(default)]
	labels: Vec<String>,
	#[serde(default)]
	properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxRelationship {
	id: Value,
	#[serde(rename = "type")]
	kind: String,
	start_node: Value,
	end_node: Value,
	#[serde(default)]
	properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
	code: String,
	message: String,
}

/// Rejected credentials are a connection problem; any other failure status
/// belongs to the statement.
fn check_status(status: StatusCode) -> Result<()> {
	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GraphError::Connection(format!(
			"server rejected credentials ({status})"
		))),
		status if !status.is_success() => {
			Err(GraphError::Query(format!("unexpected HTTP status {status}")))
		}
		_ => Ok(()),
	}
}

/// The server reports statement failures in the body of a `200` response.
fn check_errors(response: TxResponse) -> Result<TxResponse> {
	match response.errors.first() {
		Some(error) => Err(GraphError::Query(format!("{}: {}", error.code, error.message))),
		None => Ok(response),
	}
}

fn decode_result(result: TxResult) -> Result<RecordSet> {
	let TxResult { columns, data } = result;
	let mut records = Vec::with_capacity(data.len());
	for row in data {
		let mut fields = Vec::with_capacity(columns.len());
		for (i, column) in columns.iter().enumerate() {
			let value = row.row.get(i).cloned().unwrap_or(Value::Null);
			let meta = row.meta.get(i).unwrap_or(&Value::Null);
			fields.push((column.clone(), classify(value, meta, &row.graph)?));
		}
		records.push(Record::new(fields));
	}
	Ok(RecordSet::new(records))
}

fn classify(value: Value, meta: &Value, graph: &TxGraph) -> Result<FieldValue> {
	match meta {
		Value::Object(entry) => {
			let id = entry.get("id").map(parse_id).transpose()?;
			match (entry.get("type").and_then(Value::as_str), id) {
				(Some("node"), Some(id)) => node_field(id, value, graph),
				(Some("relationship"), Some(id)) => relationship_field(id, graph),
				(Some(kind), _) => Ok(FieldValue::Other(kind.to_string())),
				(None, _) => Ok(FieldValue::Scalar(value.into())),
			}
		}
		Value::Array(entries) => {
			let is_path = entries.len() % 2 == 1
				&& entries.iter().enumerate().all(|(i, e)| {
					let expected = if i % 2 == 0 { "node" } else { "relationship" };
					e.get("type").and_then(Value::as_str) == Some(expected)
				});
			if is_path {
				Ok(FieldValue::Path {
					length: entries.len() / 2,
				})
			} else {
				Ok(FieldValue::Other("list".into()))
			}
		}
		_ => Ok(FieldValue::Scalar(value.into())),
	}
}

fn node_field(id: i64, row_value: Value, graph: &TxGraph) -> Result<FieldValue> {
	for node in &graph.nodes {
		if parse_id(&node.id)? == id {
			return Ok(FieldValue::Node(RawNode {
				identity: id,
				labels: node.labels.clone(),
				properties: properties(node.properties.clone()),
			}));
		}
	}
	// graph section missing: the row still carries the property map
	let properties = match row_value {
		Value::Object(map) => properties(map),
		_ => Properties::new(),
	};
	Ok(FieldValue::Node(RawNode {
		identity: id,
		labels: Vec::new(),
		properties,
	}))
}

fn relationship_field(id: i64, graph: &TxGraph) -> Result<FieldValue> {
	for rel in &graph.relationships {
		if parse_id(&rel.id)? == id {
			return Ok(FieldValue::Relationship(RawRelationship {
				identity: id,
				start: parse_id(&rel.start_node)?,
				end: parse_id(&rel.end_node)?,
				kind: rel.kind.clone(),
				properties: properties(rel.properties.clone()),
			}));
		}
	}
	Err(GraphError::Query(format!(
		"relationship {id} missing from graph section"
	)))
}

fn parse_id(value: &Value) -> Result<i64> {
	match value {
		Value::Number(n) => n.as_i64(),
		Value::String(s) => s.parse().ok(),
		_ => None,
	}
	.ok_or_else(|| GraphError::Query(format!("invalid entity id {value}")))
}

fn properties(map: Map<String, Value>) -> Properties {
	map.into_iter()
		.map(|(k, v)| (k, PropertyValue::from(v)))
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn endpoints_from_server_settings() {
		assert_eq!(
			commit_endpoint("http://localhost:7474/", "neo4j").unwrap(),
			"http://localhost:7474/db/neo4j/tx/commit"
		);
		assert_eq!(
			commit_endpoint("neo4j://db.example:7687", "movies").unwrap(),
			"http://db.example:7474/db/movies/tx/commit"
		);
		assert_eq!(
			commit_endpoint("bolt+s://db.example", "neo4j").unwrap(),
			"https://db.example:7473/db/neo4j/tx/commit"
		);
		assert!(commit_endpoint("", "neo4j").is_err());
		assert!(commit_endpoint("localhost:7474", "neo4j").is_err());
		assert!(commit_endpoint("ftp://x", "neo4j").is_err());
	}

	#[test]
	fn http_failures_map_onto_the_error_taxonomy() {
		assert!(check_status(StatusCode::OK).is_ok());
		assert!(matches!(
			check_status(StatusCode::UNAUTHORIZED),
			Err(GraphError::Connection(_))
		));
		assert!(matches!(
			check_status(StatusCode::FORBIDDEN),
			Err(GraphError::Connection(_))
		));
		assert!(matches!(
			check_status(StatusCode::INTERNAL_SERVER_ERROR),
			Err(GraphError::Query(_))
		));
		assert!(matches!(check_status(StatusCode::NOT_FOUND), Err(GraphError::Query(_))));
	}

	#[test]
	fn statement_errors_in_the_body_are_query_errors() {
		let failed: TxResponse = serde_json::from_value(json!({
			"results": [],
			"errors": [{
				"code": "Neo.ClientError.Statement.SyntaxError",
				"message": "Invalid input 'X'"
			}]
		}))
		.unwrap();
		match check_errors(failed) {
			Err(GraphError::Query(message)) => {
				assert_eq!(message, "Neo.ClientError.Statement.SyntaxError: Invalid input 'X'")
			}
			other => panic!("expected a query error, got {other:?}"),
		}

		let ok: TxResponse = serde_json::from_value(json!({ "results": [], "errors": [] })).unwrap();
		assert!(check_errors(ok).is_ok());
	}

	#[test]
	fn decodes_nodes_relationships_and_paths() {
		let response: TxResponse = serde_json::from_value(json!({
			"results": [{
				"columns": ["n", "r", "m", "p", "count"],
				"data": [{
					"row": [{"name": "a"}, {}, {"title": "b"}, [], 3],
					"meta": [
						{"id": 1, "type": "node", "deleted": false},
						{"id": 10, "type": "relationship", "deleted": false},
						{"id": 2, "type": "node", "deleted": false},
						[
							{"id": 1, "type": "node"},
							{"id": 10, "type": "relationship"},
							{"id": 2, "type": "node"}
						],
						null
					],
					"graph": {
						"nodes": [
							{"id": "1", "labels": ["Problem"], "properties": {"name": "a"}},
							{"id": "2", "labels": [], "properties": {"title": "b"}}
						],
						"relationships": [
							{"id": "10", "type": "CAUSES", "startNode": "1", "endNode": "2", "properties": {}}
						]
					}
				}]
			}],
			"errors": []
		}))
		.unwrap();

		let set = decode_result(response.results.into_iter().next().unwrap()).unwrap();
		let record = &set.records[0];

		let Some(FieldValue::Node(n)) = record.get("n") else {
			panic!("n is not a node");
		};
		assert_eq!((n.identity, n.labels.as_slice()), (1, &["Problem".to_string()][..]));

		let Some(FieldValue::Relationship(r)) = record.get("r") else {
			panic!("r is not a relationship");
		};
		assert_eq!((r.identity, r.start, r.end, r.kind.as_str()), (10, 1, 2, "CAUSES"));

		assert_eq!(record.get("p"), Some(&FieldValue::Path { length: 1 }));
		assert_eq!(record.get("count").and_then(FieldValue::as_int), Some(3));
	}
}
