//! The REST backend against a scripted HTTP peer.

use docstore_client::{ClientConfig, HttpClient, HttpResponse, RestDatastore};
use docstore_core::{
    get_or_create, Book, BookRepository, Code, CoreError, Datastore, Entity, Key, Query,
    ReadOptions, StoreError, Trivia,
};
use parking_lot::Mutex;
use serde_json::{json, Value as Json};
use std::collections::VecDeque;

/// Answers requests from a queue and records what was sent.
#[derive(Default)]
struct FakeHttp {
    responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<(String, Json)>>,
}

impl FakeHttp {
    fn reply(self, status: u16, body: Json) -> Self {
        self.responses.lock().push_back(Ok(HttpResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }));
        self
    }

    fn ok(self, body: Json) -> Self {
        self.reply(200, body)
    }

    fn raw(self, status: u16, body: &str) -> Self {
        self.responses.lock().push_back(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    fn unreachable(self) -> Self {
        self.responses
            .lock()
            .push_back(Err("connection refused".to_string()));
        self
    }

    fn requests(&self) -> Vec<(String, Json)> {
        self.requests.lock().clone()
    }

    fn methods(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|(url, _)| url.rsplit(':').next().unwrap().to_string())
            .collect()
    }
}

impl HttpClient for FakeHttp {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        let json = serde_json::from_slice(&body).expect("requests are JSON");
        self.requests.lock().push((url.to_string(), json));
        self.responses
            .lock()
            .pop_front()
            .expect("unexpected request")
    }
}

fn store(http: &FakeHttp) -> RestDatastore<&FakeHttp> {
    let config = ClientConfig::new("demo").with_endpoint("http://localhost:8081");
    RestDatastore::with_client(config, http)
}

fn trivia_key_json() -> Json {
    json!({ "partitionId": { "projectId": "demo" }, "path": [{ "kind": "Trivia", "name": "hgtg" }] })
}

fn default_trivia() -> Entity {
    Entity::unkeyed()
        .with_property("question", "Meaning of Life?")
        .with_property("answer", 42i64)
}

// "tx1" in base64.
const TX: &str = "dHgx";

#[test]
fn cold_start_speaks_the_wire_protocol() {
    let http = FakeHttp::default()
        .ok(json!({ "transaction": TX }))
        .ok(json!({ "missing": [{ "entity": { "key": trivia_key_json() }, "version": "1" }] }))
        .ok(json!({ "mutationResults": [{ "version": "2" }], "indexUpdates": 3 }));

    let entity =
        get_or_create(&store(&http), &Key::name("Trivia", "hgtg"), default_trivia).unwrap();
    assert_eq!(entity.integer("answer").unwrap(), 42);

    let requests = http.requests();
    assert_eq!(
        requests[0].0,
        "http://localhost:8081/v1/projects/demo:beginTransaction"
    );
    assert_eq!(requests[0].1, json!({}));

    assert_eq!(
        requests[1].1,
        json!({ "readOptions": { "transaction": TX }, "keys": [trivia_key_json()] })
    );

    let commit = &requests[2].1;
    assert_eq!(commit["mode"], "TRANSACTIONAL");
    assert_eq!(commit["transaction"], TX);
    let insert = &commit["mutations"][0]["insert"];
    assert_eq!(insert["key"], trivia_key_json());
    assert_eq!(insert["properties"]["answer"], json!({ "integerValue": "42" }));
    assert_eq!(
        insert["properties"]["question"],
        json!({ "stringValue": "Meaning of Life?" })
    );
}

#[test]
fn warm_start_commits_nothing() {
    let http = FakeHttp::default()
        .ok(json!({ "transaction": TX }))
        .ok(json!({ "found": [{ "entity": {
            "key": trivia_key_json(),
            "properties": {
                "question": { "stringValue": "Six by nine?", "excludeFromIndexes": true },
                "answer": { "integerValue": "42" }
            }
        } }] }))
        .ok(json!({}));

    let trivia = Trivia::load_or_create(&store(&http)).unwrap();

    assert_eq!(trivia.question, "Six by nine?");
    let requests = http.requests();
    assert_eq!(requests[2].1["mutations"], json!([]));
}

#[test]
fn lookup_failure_rolls_back() {
    let http = FakeHttp::default()
        .ok(json!({ "transaction": TX }))
        .reply(
            503,
            json!({ "error": { "code": 503, "message": "backend unavailable", "status": "UNAVAILABLE" } }),
        )
        .ok(json!({}));

    let err =
        get_or_create(&store(&http), &Key::name("Trivia", "hgtg"), default_trivia).unwrap_err();

    assert!(matches!(err, StoreError::LookupFailed { .. }));
    assert_eq!(err.code(), Code::Unavailable);
    assert_eq!(err.message(), "backend unavailable");
    assert_eq!(http.methods(), vec!["beginTransaction", "lookup", "rollback"]);
    assert_eq!(http.requests()[2].1, json!({ "transaction": TX }));
}

#[test]
fn contention_is_commit_failed_aborted() {
    let http = FakeHttp::default()
        .ok(json!({ "transaction": TX }))
        .ok(json!({ "missing": [{ "entity": { "key": trivia_key_json() } }] }))
        .reply(
            409,
            json!({ "error": { "code": 409, "message": "too much contention", "status": "ABORTED" } }),
        );

    let err =
        get_or_create(&store(&http), &Key::name("Trivia", "hgtg"), default_trivia).unwrap_err();

    assert!(matches!(err, StoreError::CommitFailed { .. }));
    assert_eq!(err.code(), Code::Aborted);
    assert_eq!(
        err.to_string(),
        "CommitFailed(too much contention): commit ABORTED"
    );
    assert_eq!(http.methods(), vec!["beginTransaction", "lookup", "commit"]);
}

#[test]
fn unreachable_host_is_unavailable() {
    let http = FakeHttp::default().unreachable();

    let err = store(&http).begin_transaction().unwrap_err();

    assert!(matches!(err, StoreError::BeginFailed { .. }));
    assert_eq!(err.code(), Code::Unavailable);
    assert!(err.message().contains("connection refused"));
}

#[test]
fn unauthenticated_without_error_body() {
    let http = FakeHttp::default().raw(401, "Unauthorized");

    let err = store(&http).begin_transaction().unwrap_err();

    assert_eq!(err.code(), Code::Unauthenticated);
}

#[test]
fn malformed_success_body_is_internal() {
    let http = FakeHttp::default().raw(200, "not json");

    let err = store(&http)
        .lookup(ReadOptions::Latest, &[Key::name("Trivia", "hgtg")])
        .unwrap_err();

    assert!(matches!(err, StoreError::LookupFailed { .. }));
    assert_eq!(err.code(), Code::Internal);
}

#[test]
fn unsupported_value_type_is_internal() {
    let http = FakeHttp::default().ok(json!({ "found": [{ "entity": {
        "key": trivia_key_json(),
        "properties": { "answer": { "doubleValue": 42.0 } }
    } }] }));

    let err = store(&http)
        .lookup(ReadOptions::Latest, &[Key::name("Trivia", "hgtg")])
        .unwrap_err();

    assert_eq!(err.code(), Code::Internal);
    assert!(err.message().contains("doubleValue"));
}

#[test]
fn deferred_keys_are_looked_up_again() {
    let other = json!({ "partitionId": { "projectId": "demo" }, "path": [{ "kind": "Trivia", "name": "other" }] });
    let http = FakeHttp::default()
        .ok(json!({ "found": [{ "entity": { "key": other.clone() } }], "deferred": [trivia_key_json()] }))
        .ok(json!({ "found": [{ "entity": { "key": trivia_key_json() } }] }));

    let keys = [Key::name("Trivia", "hgtg"), Key::name("Trivia", "other")];
    let result = store(&http).lookup(ReadOptions::Latest, &keys).unwrap();

    let found: Vec<_> = result.found.iter().map(|e| e.key().cloned().unwrap()).collect();
    assert_eq!(found, keys.to_vec());
    let requests = http.requests();
    assert!(requests[0].1.get("readOptions").is_none());
    assert_eq!(requests[1].1["keys"], json!([trivia_key_json()]));
}

#[test]
fn lookup_that_keeps_deferring_fails() {
    let http = FakeHttp::default().ok(json!({ "deferred": [trivia_key_json()] }));

    let err = store(&http)
        .lookup(ReadOptions::Latest, &[Key::name("Trivia", "hgtg")])
        .unwrap_err();

    assert!(matches!(err, StoreError::LookupFailed { .. }));
    assert_eq!(err.code(), Code::Internal);
    assert_eq!(http.methods(), vec!["lookup"]);
}

#[test]
fn query_follows_cursors() {
    let book = |id: &str, title: &str| {
        json!({ "entity": {
            "key": { "path": [{ "kind": "books", "id": id }] },
            "properties": {
                "title": { "stringValue": title },
                "author": { "stringValue": "Douglas Adams" },
                "year": { "integerValue": "1980" }
            }
        } })
    };
    let http = FakeHttp::default()
        .ok(json!({ "batch": {
            "entityResults": [book("1", "A")],
            "endCursor": "c1",
            "moreResults": "NOT_FINISHED"
        } }))
        .ok(json!({ "batch": {
            "entityResults": [book("2", "B")],
            "endCursor": "c2",
            "moreResults": "NO_MORE_RESULTS"
        } }));

    let store = store(&http);
    let books = BookRepository::new(&store).find_by_author("Douglas Adams").unwrap();

    assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    let requests = http.requests();
    assert_eq!(
        requests[0].1["query"],
        json!({
            "kind": [{ "name": "books" }],
            "filter": { "propertyFilter": {
                "property": { "name": "author" },
                "op": "EQUAL",
                "value": { "stringValue": "Douglas Adams" }
            } }
        })
    );
    assert_eq!(requests[0].1["partitionId"], json!({ "projectId": "demo" }));
    assert_eq!(requests[1].1["query"]["startCursor"], "c1");
}

#[test]
fn query_limit_spans_pages() {
    let http = FakeHttp::default()
        .ok(json!({ "batch": {
            "entityResults": [{ "entity": { "key": { "path": [{ "kind": "books", "id": "1" }] } } }],
            "endCursor": "c1",
            "moreResults": "NOT_FINISHED"
        } }))
        .ok(json!({ "batch": {
            "entityResults": [{ "entity": { "key": { "path": [{ "kind": "books", "id": "2" }] } } }],
            "moreResults": "MORE_RESULTS_AFTER_LIMIT"
        } }));

    let results = store(&http)
        .run_query(ReadOptions::Latest, &Query::kind("books").limit(2))
        .unwrap();

    assert_eq!(results.len(), 2);
    let requests = http.requests();
    assert_eq!(requests[0].1["query"]["limit"], 2);
    assert_eq!(requests[1].1["query"]["limit"], 1);
}

#[test]
fn save_book_reads_allocated_id() {
    let http = FakeHttp::default().ok(json!({ "mutationResults": [{
        "key": { "partitionId": { "projectId": "demo" }, "path": [{ "kind": "books", "id": "5629499534213120" }] },
        "version": "1"
    }] }));

    let store = store(&http);
    let saved = BookRepository::new(&store)
        .save(Book::new("Mostly Harmless", "Douglas Adams", 1992))
        .unwrap();

    assert_eq!(saved.id, Some(5_629_499_534_213_120));
    let commit = &http.requests()[0].1;
    assert_eq!(commit["mode"], "NON_TRANSACTIONAL");
    assert!(commit.get("transaction").is_none());
    assert_eq!(
        commit["mutations"][0]["upsert"]["key"]["path"],
        json!([{ "kind": "books" }])
    );
}

#[test]
fn failed_query_surfaces_through_repository() {
    let http = FakeHttp::default().reply(
        400,
        json!({ "error": { "code": 400, "message": "no matching index found", "status": "FAILED_PRECONDITION" } }),
    );

    let store = store(&http);
    let err = BookRepository::new(&store)
        .find_by_author_and_year("Douglas Adams", 1979)
        .unwrap_err();

    match err {
        CoreError::Store(e) => {
            assert_eq!(e.reason(), "QueryFailed");
            assert_eq!(e.code(), Code::FailedPrecondition);
        }
        other => panic!("expected store error, got {other:?}"),
    }
}
