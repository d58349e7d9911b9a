//! The REST-backed [`Datastore`].

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::http::{HttpClient, HttpResponse, UreqClient};
use crate::wire::{
    self, BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse,
    ErrorBody, KindExpression, LookupRequest, LookupResponse, PartitionId, QueryBody,
    ReadOptionsBody, RollbackRequest, RunQueryRequest, RunQueryResponse, WireKey,
};
use docstore_core::{
    Code, CommitMode, CommitResult, Datastore, Entity, Key, LookupResult, Method, Mutation, Query,
    ReadOptions, StoreError, StoreResult, TransactionToken,
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// Longest response excerpt quoted in an error message.
const EXCERPT_LEN: usize = 200;

/// A [`Datastore`] that talks to the hosted REST API.
///
/// Each trait call is one `POST {endpoint}/v1/projects/{project}:{method}`,
/// except lookups with deferred keys and paginated queries, which repeat
/// the call until the answer is complete.
///
/// # Example
///
/// ```no_run
/// use docstore_client::RestDatastore;
/// use docstore_core::Trivia;
///
/// let store = RestDatastore::from_env("my-project").unwrap();
/// let trivia = Trivia::load_or_create(&store).unwrap();
/// println!("{}", trivia.question);
/// ```
pub struct RestDatastore<C: HttpClient = UreqClient> {
    config: ClientConfig,
    client: C,
}

impl RestDatastore<UreqClient> {
    /// Creates a store using a `ureq` client built from `config`.
    pub fn connect(config: ClientConfig) -> Self {
        let client = UreqClient::new(config.timeout, config.access_token.clone());
        Self::with_client(config, client)
    }

    /// Creates a store from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env(project_id: impl Into<String>) -> ClientResult<Self> {
        Ok(Self::connect(ClientConfig::from_env(project_id)?))
    }
}

impl<C: HttpClient> RestDatastore<C> {
    /// Creates a store over a custom HTTP client.
    pub fn with_client(config: ClientConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn project_id(&self) -> &str {
        &self.config.project_id
    }

    fn read_options(read: ReadOptions<'_>) -> Option<ReadOptionsBody> {
        match read {
            ReadOptions::Latest => None,
            ReadOptions::InTransaction(token) => Some(ReadOptionsBody {
                transaction: Some(wire::encode_transaction(token.as_bytes())),
            }),
        }
    }

    fn call<Req, Res>(&self, method: Method, request: &Req) -> StoreResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| {
            StoreError::new(method, Code::Internal, format!("failed to encode request: {e}"))
        })?;
        let url = self.config.method_url(method.as_str());
        trace!(%url, bytes = body.len(), "sending request");

        let response = self
            .client
            .post(&url, body)
            .map_err(|e| StoreError::new(method, Code::Unavailable, e))?;
        debug!(%method, status = response.status, "response received");

        if !response.is_success() {
            return Err(error_from_response(method, &response));
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            StoreError::new(
                method,
                Code::Internal,
                format!(
                    "failed to decode response: {e}: {}",
                    excerpt(&response.body)
                ),
            )
        })
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(EXCERPT_LEN).collect()
}

/// Maps an HTTP error response to a [`StoreError`] of `method`.
fn error_from_response(method: Method, response: &HttpResponse) -> StoreError {
    match serde_json::from_slice::<ErrorBody>(&response.body) {
        Ok(ErrorBody { error }) => {
            let code = error
                .status
                .as_deref()
                .and_then(|s| s.parse::<Code>().ok())
                .unwrap_or_else(|| Code::from_http_status(error.code.unwrap_or(response.status)));
            StoreError::new(method, code, error.message)
        }
        Err(_) => StoreError::new(
            method,
            Code::from_http_status(response.status),
            format!("HTTP {}: {}", response.status, excerpt(&response.body)),
        ),
    }
}

fn decode_entity(method: Method, entity: &wire::WireEntity) -> StoreResult<Entity> {
    entity
        .decode()
        .map_err(|e| StoreError::new(method, Code::Internal, e))
}

impl<C: HttpClient> Datastore for RestDatastore<C> {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        let response: BeginTransactionResponse =
            self.call(Method::BeginTransaction, &BeginTransactionRequest {})?;
        let token = wire::decode_transaction(&response.transaction)
            .map_err(|e| StoreError::begin_failed(Code::Internal, e))?;
        Ok(TransactionToken::new(token))
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        let mut result = LookupResult::default();
        let mut pending: Vec<WireKey> = keys
            .iter()
            .map(|k| WireKey::encode(k, self.project_id()))
            .collect();

        while !pending.is_empty() {
            let sent = pending.len();
            let request = LookupRequest {
                read_options: Self::read_options(read),
                keys: std::mem::take(&mut pending),
            };
            let response: LookupResponse = self.call(Method::Lookup, &request)?;

            let answered = response.found.len() + response.missing.len();
            if answered == 0 && response.deferred.len() >= sent {
                return Err(StoreError::lookup_failed(
                    Code::Internal,
                    format!("lookup made no progress on {sent} deferred keys"),
                ));
            }

            for found in &response.found {
                result.found.push(decode_entity(Method::Lookup, &found.entity)?);
            }
            for missing in &response.missing {
                let entity = decode_entity(Method::Lookup, &missing.entity)?;
                if let Some(key) = entity.key() {
                    result.missing.push(key.clone());
                }
            }
            if !response.deferred.is_empty() {
                debug!(deferred = response.deferred.len(), "retrying deferred keys");
            }
            pending = response.deferred;
        }

        // The service may answer out of order.
        let position = |key: Option<&Key>| {
            key.and_then(|k| keys.iter().position(|r| r == k))
                .unwrap_or(usize::MAX)
        };
        result.found.sort_by_key(|e| position(e.key()));
        result.missing.sort_by_key(|k| position(Some(k)));
        Ok(result)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        let mut results = Vec::new();
        let mut cursor = None;

        loop {
            let remaining = query.limit.map(|l| l.saturating_sub(results.len()));
            if remaining == Some(0) {
                break;
            }
            let request = RunQueryRequest {
                partition_id: PartitionId {
                    project_id: self.project_id().to_string(),
                },
                read_options: Self::read_options(read),
                query: QueryBody {
                    kind: vec![KindExpression {
                        name: query.kind.clone(),
                    }],
                    filter: query
                        .filter
                        .as_ref()
                        .map(|f| wire::encode_filter(f, self.project_id())),
                    start_cursor: cursor.take(),
                    limit: remaining.map(|l| i32::try_from(l).unwrap_or(i32::MAX)),
                },
            };
            let response: RunQueryResponse = self.call(Method::RunQuery, &request)?;
            let batch = response.batch;

            for result in &batch.entity_results {
                results.push(decode_entity(Method::RunQuery, &result.entity)?);
            }

            let more = batch.more_results.as_deref() == Some(wire::NOT_FINISHED);
            match batch.end_cursor {
                Some(end) if more && !batch.entity_results.is_empty() => cursor = Some(end),
                _ => break,
            }
        }

        debug!(kind = %query.kind, count = results.len(), "query finished");
        Ok(results)
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        let (mode_name, transaction) = match &mode {
            CommitMode::Transactional(token) => (
                "TRANSACTIONAL",
                Some(wire::encode_transaction(token.as_bytes())),
            ),
            CommitMode::NonTransactional => ("NON_TRANSACTIONAL", None),
        };
        let encoded = mutations
            .iter()
            .map(|m| wire::encode_mutation(m, self.project_id()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::commit_failed(Code::Internal, e))?;

        let request = CommitRequest {
            mode: mode_name,
            transaction,
            mutations: encoded,
        };
        let response: CommitResponse = self.call(Method::Commit, &request)?;

        let mut keys = Vec::with_capacity(mutations.len());
        for (i, mutation) in mutations.iter().enumerate() {
            let allocated = response
                .mutation_results
                .get(i)
                .and_then(|r| r.key.as_ref())
                .map(WireKey::decode)
                .transpose()
                .map_err(|e| StoreError::commit_failed(Code::Internal, e))?;
            match allocated.or_else(|| mutation.key().cloned()) {
                Some(key) => keys.push(key),
                None => warn!(op = mutation.op_name(), "mutation result carries no key"),
            }
        }
        Ok(CommitResult { keys })
    }

    fn rollback(&self, token: TransactionToken) -> StoreResult<()> {
        let request = RollbackRequest {
            transaction: wire::encode_transaction(token.as_bytes()),
        };
        let _: IgnoredAny = self.call(Method::Rollback, &request)?;
        Ok(())
    }
}
