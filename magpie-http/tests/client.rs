use std::borrow::Cow;

use magpie_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Item {
    id: u64,
    name: String,
}

#[tokio::test]
async fn get_json_decodes_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/item"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "seven"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let item: Item = client
        .get_json("v1/item", RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(item.id, 7);
    assert_eq!(item.name, "seven");
}

#[tokio::test]
async fn retries_a_500_then_succeeds() {
    let server = MockServer::start().await;
    // First attempt hits the transient failure, the retry lands on the 200.
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "ok"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let item: Item = client
        .get_json("flaky", RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(item.name, "ok");
}

#[tokio::test]
async fn honors_retry_after_on_429() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_json(json!({"errors": [{"detail": "slow down"}]})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "name": "later"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let item: Item = client
        .get_json("limited", RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(item.id, 2);
}

#[tokio::test]
async fn non_retryable_status_surfaces_extracted_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Record not found"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<Item>("missing", RequestOpts::default())
        .await
        .unwrap_err();
    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "Record not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_text_passes_error_statuses_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>gone</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let (status, body) = client.get_text("page", RequestOpts::default()).await.unwrap();
    assert_eq!(status.as_u16(), 404);
    assert!(body.contains("gone"));
}

#[tokio::test]
async fn query_auth_merges_with_caller_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "magpie"))
        .and(query_param("apikey", "demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "hit"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let opts = RequestOpts {
        query: Some(vec![("q", Cow::Borrowed("magpie"))]),
        auth: Some(Auth::Query {
            name: "apikey",
            value: Cow::Borrowed("demo"),
        }),
        ..Default::default()
    };
    let item: Item = client.get_json("search", opts).await.unwrap();
    assert_eq!(item.name, "hit");
}

#[tokio::test]
async fn post_json_opts_sends_exact_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/echo"))
        .and(body_json(json!({"q": "magpie", "limit": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9, "name": "echo"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let item: Item = client
        .post_json_opts(
            "v1/echo",
            &json!({"q": "magpie", "limit": 5}),
            RequestOpts::default(),
        )
        .await
        .unwrap();
    assert_eq!(item.id, 9);
}
