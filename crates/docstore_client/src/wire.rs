//! JSON wire format of the v1 REST API.
//!
//! Envelopes are plain serde structs. Property values go through
//! [`encode_value`] / [`decode_value`] because the API tags them by field
//! name (`{"integerValue": "42"}`) and may add sibling fields such as
//! `excludeFromIndexes`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use docstore_core::{Entity, Filter, IdOrName, Key, Mutation, PathElement, PropertyOp, Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;

/// Result of decoding a response fragment; the error is a human message.
pub type WireResult<T> = Result<T, String>;

/// `moreResults` value asking for another page.
pub const NOT_FINISHED: &str = "NOT_FINISHED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionId {
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePathElement {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    #[serde(default)]
    pub path: Vec<WirePathElement>,
}

impl WireKey {
    pub fn encode(key: &Key, project_id: &str) -> Self {
        let path = key
            .path()
            .iter()
            .map(|e| WirePathElement {
                kind: e.kind.clone(),
                id: match &e.id {
                    Some(IdOrName::Id(id)) => Some(id.to_string()),
                    _ => None,
                },
                name: match &e.id {
                    Some(IdOrName::Name(name)) => Some(name.clone()),
                    _ => None,
                },
            })
            .collect();
        Self {
            partition_id: Some(PartitionId {
                project_id: project_id.to_string(),
            }),
            path,
        }
    }

    pub fn decode(&self) -> WireResult<Key> {
        let path = self
            .path
            .iter()
            .map(|e| {
                let id = match (&e.id, &e.name) {
                    (Some(id), _) => Some(IdOrName::Id(
                        id.parse()
                            .map_err(|_| format!("invalid key id {id:?} for kind {}", e.kind))?,
                    )),
                    (None, Some(name)) => Some(IdOrName::Name(name.clone())),
                    (None, None) => None,
                };
                Ok(PathElement {
                    kind: e.kind.clone(),
                    id,
                })
            })
            .collect::<WireResult<Vec<_>>>()?;
        Ok(Key::from_path(path))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<WireKey>,
    #[serde(default)]
    pub properties: BTreeMap<String, Json>,
}

impl WireEntity {
    pub fn encode(entity: &Entity, project_id: &str) -> Self {
        Self {
            key: entity.key().map(|k| WireKey::encode(k, project_id)),
            properties: entity
                .properties()
                .iter()
                .map(|(name, value)| (name.clone(), encode_value(value, project_id)))
                .collect(),
        }
    }

    pub fn decode(&self) -> WireResult<Entity> {
        let mut entity = match &self.key {
            Some(key) => Entity::new(key.decode()?),
            None => Entity::unkeyed(),
        };
        for (name, value) in &self.properties {
            let value = decode_value(value).map_err(|e| format!("property {name}: {e}"))?;
            entity.set(name.clone(), value);
        }
        Ok(entity)
    }
}

/// Encodes a property value as a tagged JSON object.
pub fn encode_value(value: &Value, project_id: &str) -> Json {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Boolean(b) => json!({ "booleanValue": b }),
        Value::Integer(i) => json!({ "integerValue": i.to_string() }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Blob(bytes) => json!({ "blobValue": BASE64.encode(bytes) }),
        Value::Key(key) => json!({ "keyValue": WireKey::encode(key, project_id) }),
        Value::Array(values) => {
            let values: Vec<Json> = values.iter().map(|v| encode_value(v, project_id)).collect();
            json!({ "arrayValue": { "values": values } })
        }
    }
}

/// Decodes a tagged JSON property value.
pub fn decode_value(json: &Json) -> WireResult<Value> {
    let object = json
        .as_object()
        .ok_or_else(|| format!("expected a value object, got {json}"))?;

    if object.contains_key("nullValue") {
        return Ok(Value::Null);
    }
    if let Some(b) = object.get("booleanValue") {
        return b
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| format!("invalid booleanValue {b}"));
    }
    if let Some(i) = object.get("integerValue") {
        // Integers travel as decimal strings; accept bare numbers too.
        let parsed = match i {
            Json::String(s) => s.parse().ok(),
            Json::Number(n) => n.as_i64(),
            _ => None,
        };
        return parsed
            .map(Value::Integer)
            .ok_or_else(|| format!("invalid integerValue {i}"));
    }
    if let Some(s) = object.get("stringValue") {
        return s
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| format!("invalid stringValue {s}"));
    }
    if let Some(b) = object.get("blobValue") {
        let encoded = b
            .as_str()
            .ok_or_else(|| format!("invalid blobValue {b}"))?;
        return BASE64
            .decode(encoded)
            .map(Value::Blob)
            .map_err(|e| format!("invalid base64 in blobValue: {e}"));
    }
    if let Some(k) = object.get("keyValue") {
        let key: WireKey =
            serde_json::from_value(k.clone()).map_err(|e| format!("invalid keyValue: {e}"))?;
        return key.decode().map(Value::Key);
    }
    if let Some(a) = object.get("arrayValue") {
        let values = match a.get("values") {
            None => Vec::new(),
            Some(Json::Array(values)) => values
                .iter()
                .map(decode_value)
                .collect::<WireResult<_>>()?,
            Some(other) => return Err(format!("invalid arrayValue values {other}")),
        };
        return Ok(Value::Array(values));
    }

    let kind = object
        .keys()
        .find(|k| k.ends_with("Value"))
        .map_or("unknown", String::as_str);
    Err(format!("unsupported value type {kind}"))
}

fn op_name(op: PropertyOp) -> &'static str {
    match op {
        PropertyOp::Equal => "EQUAL",
        PropertyOp::LessThan => "LESS_THAN",
        PropertyOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        PropertyOp::GreaterThan => "GREATER_THAN",
        PropertyOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
    }
}

/// Encodes a filter as a `propertyFilter` or `compositeFilter`.
pub fn encode_filter(filter: &Filter, project_id: &str) -> Json {
    match filter {
        Filter::Property { name, op, value } => json!({
            "propertyFilter": {
                "property": { "name": name },
                "op": op_name(*op),
                "value": encode_value(value, project_id),
            }
        }),
        Filter::And(filters) => {
            let filters: Vec<Json> = filters.iter().map(|f| encode_filter(f, project_id)).collect();
            json!({ "compositeFilter": { "op": "AND", "filters": filters } })
        }
    }
}

/// Encodes a mutation as `{"insert": ...}`, `{"delete": key}` and so on.
pub fn encode_mutation(mutation: &Mutation, project_id: &str) -> WireResult<Json> {
    let mut object = Map::new();
    let body = match mutation {
        Mutation::Insert(e) | Mutation::Update(e) | Mutation::Upsert(e) => {
            serde_json::to_value(WireEntity::encode(e, project_id))
        }
        Mutation::Delete(key) => serde_json::to_value(WireKey::encode(key, project_id)),
    }
    .map_err(|e| e.to_string())?;
    object.insert(mutation.op_name().to_string(), body);
    Ok(Json::Object(object))
}

pub fn encode_transaction(token: &[u8]) -> String {
    BASE64.encode(token)
}

pub fn decode_transaction(encoded: &str) -> WireResult<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| format!("invalid transaction handle: {e}"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadOptionsBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BeginTransactionRequest {}

#[derive(Debug, Deserialize)]
pub struct BeginTransactionResponse {
    pub transaction: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_options: Option<ReadOptionsBody>,
    pub keys: Vec<WireKey>,
}

#[derive(Debug, Deserialize)]
pub struct EntityResult {
    pub entity: WireEntity,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub found: Vec<EntityResult>,
    #[serde(default)]
    pub missing: Vec<EntityResult>,
    #[serde(default)]
    pub deferred: Vec<WireKey>,
}

#[derive(Debug, Serialize)]
pub struct KindExpression {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody {
    pub kind: Vec<KindExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub partition_id: PartitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_options: Option<ReadOptionsBody>,
    pub query: QueryBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultBatch {
    #[serde(default)]
    pub entity_results: Vec<EntityResult>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub more_results: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunQueryResponse {
    pub batch: QueryResultBatch,
}

#[derive(Debug, Serialize)]
pub struct CommitRequest {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    pub mutations: Vec<Json>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MutationResult {
    #[serde(default)]
    pub key: Option<WireKey>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub mutation_results: Vec<MutationResult>,
}

#[derive(Debug, Serialize)]
pub struct RollbackRequest {
    pub transaction: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
