//! HTTP collaborators against a mock server

use fhir_etl::adapters::discovery::{DiscoveryStore, MetadataDiscoveryStore};
use fhir_etl::adapters::elastic::{project_query, ElasticClient};
use fhir_etl::adapters::http::HttpClient;
use fhir_etl::adapters::identity::{ArboristIdentity, IdentityProvider};
use fhir_etl::adapters::object_store::{FenceObjectStore, ObjectStore};
use fhir_etl::adapters::search::{ElasticSearchIndex, SearchIndex};
use fhir_etl::config::{secret_string, ElasticConfig, RetryConfig};
use fhir_etl::domain::{EtlError, Manifest, ObjectId, ProjectId, StoreError, StoreKind};
use mockito::{Matcher, Server};
use serde_json::json;
use tempfile::TempDir;

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}

fn client(server: &Server, token: Option<&str>) -> HttpClient {
    HttpClient::new(
        server.url(),
        5,
        true,
        token.map(|t| secret_string(t.to_string())),
        fast_retry(),
    )
    .unwrap()
}

fn project() -> ProjectId {
    ProjectId::new("aced-Alzheimers").unwrap()
}

#[tokio::test]
async fn test_identity_reads_user_profile() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/user/user")
        .match_header("authorization", "Bearer user-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "username": "someone@example.org",
                "resources": ["/programs/aced", "/programs/aced/projects"],
                "authz": {
                    "/programs/aced/projects/Alzheimers": [
                        {"method": "create", "service": "*"}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let identity = ArboristIdentity::new(client(&server, None));
    let profile = identity
        .actor_profile(&secret_string("user-token".to_string()))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(profile.email.as_deref(), Some("someone@example.org"));
    assert_eq!(profile.resources.len(), 2);
    assert!(profile.authz["/programs/aced/projects/Alzheimers"][0].allows("create"));
}

#[tokio::test]
async fn test_identity_maps_rejected_token_to_authentication_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/user/user")
        .with_status(401)
        .with_body("token expired")
        .expect(1)
        .create_async()
        .await;

    let identity = ArboristIdentity::new(client(&server, None));
    let err = identity
        .actor_profile(&secret_string("stale".to_string()))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, EtlError::Authentication(ref m) if m.contains("token expired")));
}

#[tokio::test]
async fn test_object_store_follows_signed_url() {
    let mut server = Server::new_async().await;
    let signed = format!("{}/signed/obj-1", server.url());
    let resolve = server
        .mock("GET", "/user/data/download/obj-1")
        .match_header("authorization", "Bearer job-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "url": signed }).to_string())
        .create_async()
        .await;
    let fetch = server
        .mock("GET", "/signed/obj-1")
        .with_status(200)
        .with_body("archive-bytes")
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let destination = tmp.path().join("nested").join("commit.zip");
    let store = FenceObjectStore::new(client(&server, Some("job-token")));
    let path = store
        .download(&ObjectId::new("obj-1").unwrap(), &destination)
        .await
        .unwrap();

    resolve.assert_async().await;
    fetch.assert_async().await;
    assert_eq!(path, destination);
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "archive-bytes");
}

#[tokio::test]
async fn test_object_store_missing_object_is_download_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/user/data/download/gone")
        .with_status(404)
        .create_async()
        .await;

    let tmp = TempDir::new().unwrap();
    let store = FenceObjectStore::new(client(&server, Some("job-token")));
    let err = store
        .download(&ObjectId::new("gone").unwrap(), &tmp.path().join("x.zip"))
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Download(ref m) if m.starts_with("gone:")));
    assert!(!tmp.path().join("x.zip").exists());
}

#[tokio::test]
async fn test_elastic_count_and_missing_index() {
    let mut server = Server::new_async().await;
    let counted = server
        .mock("POST", "/prefix_patient_0/_count")
        .match_body(Matcher::PartialJson(json!({
            "query": { "term": { "project_id": "aced-Alzheimers" } }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"count": 42}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/prefix_file_0/_count")
        .with_status(404)
        .with_body(r#"{"error": {"type": "index_not_found_exception"}}"#)
        .create_async()
        .await;

    let elastic = ElasticClient::new(client(&server, None), StoreKind::Search);

    assert_eq!(
        elastic.count("prefix_patient_0", project_query(&project())).await.unwrap(),
        42
    );
    assert_eq!(
        elastic.count("prefix_file_0", project_query(&project())).await.unwrap(),
        0
    );
    counted.assert_async().await;
}

#[tokio::test]
async fn test_elastic_bulk_reports_item_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/_bulk")
        .match_header("content-type", "application/x-ndjson")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "errors": true,
                "items": [
                    {"index": {"_id": "p1", "status": 201}},
                    {"index": {"_id": "p2", "error": {"reason": "mapper_parsing_exception"}}}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let elastic = ElasticClient::new(client(&server, None), StoreKind::Search);
    let documents = vec![
        ("p1".to_string(), json!({"id": "p1"})),
        ("p2".to_string(), json!({"id": "p2"})),
    ];
    let err = elastic
        .bulk_index("prefix_patient_0", &documents)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EtlError::Store(StoreError::WriteFailed { ref message, .. })
            if message.contains("mapper_parsing_exception")
    ));
}

#[tokio::test]
async fn test_elastic_retries_server_errors() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/prefix_patient_0/_count")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let elastic = ElasticClient::new(client(&server, None), StoreKind::Search);
    let err = elastic
        .count("prefix_patient_0", project_query(&project()))
        .await
        .unwrap_err();

    failing.assert_async().await;
    assert!(matches!(
        err,
        EtlError::Store(StoreError::UnexpectedStatus { status: 503, .. })
    ));
}

/// Serves the project's patient index as two scroll pages: p1, p2 then p3
async fn serve_two_pages(server: &mut Server) -> Vec<mockito::Mock> {
    let first = server
        .mock("POST", "/prefix_patient_0/_search")
        .match_query(Matcher::UrlEncoded("scroll".into(), "1m".into()))
        .match_body(Matcher::PartialJson(json!({"size": 2})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "_scroll_id": "scroll-1",
                "hits": {"hits": [
                    {"_id": "aced-Alzheimers/p1"},
                    {"_id": "aced-Alzheimers/p2"}
                ]}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/_search/scroll")
        .match_body(Matcher::PartialJson(json!({"scroll_id": "scroll-1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "_scroll_id": "scroll-2",
                "hits": {"hits": [{"_id": "aced-Alzheimers/p3"}]}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let cleared = server
        .mock("DELETE", "/_search/scroll")
        .match_body(Matcher::PartialJson(json!({"scroll_id": "scroll-2"})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    vec![first, second, cleared]
}

#[tokio::test]
async fn test_elastic_search_reads_every_page() {
    let mut server = Server::new_async().await;
    let mocks = serve_two_pages(&mut server).await;

    let elastic = ElasticClient::new(client(&server, None), StoreKind::Search).with_page_size(2);
    let ids = elastic
        .search_ids("prefix_patient_0", &project())
        .await
        .unwrap();

    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_reset_deletes_records_beyond_first_page() {
    let mut server = Server::new_async().await;
    serve_two_pages(&mut server).await;
    let deleted = server
        .mock("POST", "/prefix_patient_0/_delete_by_query")
        .match_query(Matcher::Any)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("aced-Alzheimers/p2".into()),
            Matcher::Regex("aced-Alzheimers/p3".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"deleted": 2}"#)
        .expect(1)
        .create_async()
        .await;

    let config = ElasticConfig {
        url: server.url(),
        index_prefix: "prefix".to_string(),
        ..ElasticConfig::default()
    };
    let elastic = ElasticClient::new(client(&server, None), StoreKind::Search).with_page_size(2);
    let index = ElasticSearchIndex::new(elastic, config);

    let removed = index
        .delete_not_in_manifest(&project(), &Manifest::from_ids(["p1"]), Some("patient"))
        .await
        .unwrap();

    deleted.assert_async().await;
    assert_eq!(removed, 2);
}

#[tokio::test]
async fn test_discovery_get_absent_and_present() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/mds/metadata/aced-Alzheimers")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/mds/metadata/aced-Diabetes")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"gen3_discovery": {"_subjects_count": 3}}"#)
        .create_async()
        .await;

    let discovery = MetadataDiscoveryStore::new(client(&server, Some("job-token")));

    assert!(discovery.get(&project()).await.unwrap().is_none());
    let record = discovery
        .get(&ProjectId::new("aced-Diabetes").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["gen3_discovery"]["_subjects_count"], 3);
}
