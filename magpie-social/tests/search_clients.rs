mod common;

use magpie_social::mastodon::MastodonApi;
use magpie_social::reddit::RedditApi;
use magpie_social::twitter::TwitterApi;
use magpie_social::{Platform, SearchWindow, SocialClient};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).expect("format timestamp")
}

#[tokio::test]
async fn twitter_pages_follow_next_token() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    let page_one = json!({
        "data": [{
            "id": "1", "text": "magpie one", "author_id": "42",
            "created_at": "2025-09-01T12:00:00Z", "lang": "en"
        }],
        "includes": { "users": [{ "id": "42", "username": "alice", "name": "Alice" }] },
        "meta": { "result_count": 1, "next_token": "tok2" }
    });
    let page_two = json!({
        "data": [{ "id": "2", "text": "magpie two" }],
        "meta": { "result_count": 1 }
    });

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("query", "magpie"))
        .and(query_param("next_token", "tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_two))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("query", "magpie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_one))
        .mount(&server)
        .await;

    let api = TwitterApi::new(&server.uri(), "test-token".into()).unwrap();
    let window = SearchWindow::trailing_days(7);

    let first = api.search_page("magpie", &window, 10, None).await.unwrap();
    assert_eq!(first.posts.len(), 1);
    assert_eq!(first.posts[0].platform, Platform::Twitter);
    assert_eq!(first.posts[0].author_handle.as_deref(), Some("alice"));
    assert_eq!(first.next.as_deref(), Some("tok2"));

    let second = api
        .search_page("magpie", &window, 10, first.next.as_deref())
        .await
        .unwrap();
    assert_eq!(second.posts.len(), 1);
    assert_eq!(second.posts[0].external_id, "2");
    assert!(second.next.is_none());
}

#[tokio::test]
async fn reddit_filters_to_window_and_stops_pagination() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    let now = OffsetDateTime::now_utc();
    let fresh = (now - Duration::days(1)).unix_timestamp();
    let stale = (now - Duration::days(30)).unix_timestamp();

    let listing = json!({
        "data": {
            "after": "t3_more",
            "children": [
                { "kind": "t3", "data": {
                    "id": "aaa", "name": "t3_aaa", "title": "price went up again",
                    "author": "val", "permalink": "/r/deals/comments/aaa/x/",
                    "created_utc": fresh, "score": 5, "num_comments": 2
                }},
                { "kind": "t1", "data": { "id": "comment", "created_utc": fresh }},
                { "kind": "t3", "data": {
                    "id": "old", "name": "t3_old", "title": "ancient complaint",
                    "created_utc": stale
                }}
            ]
        }
    });

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", "price"))
        .and(query_param("sort", "new"))
        .and(query_param("t", "week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(&server)
        .await;

    let api = RedditApi::new(&server.uri(), "magpie-tests/0.0".into()).unwrap();
    let window = SearchWindow::trailing_days(7);
    let page = api.search_page("price", &window, 25, None).await.unwrap();

    // The comment is skipped, the stale post is filtered, and its presence
    // ends pagination even though the listing offered an `after`.
    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.posts[0].external_id, "t3_aaa");
    assert_eq!(page.posts[0].keyword, "price");
    assert!(page.next.is_none());
}

#[tokio::test]
async fn mastodon_slugs_keyword_and_cursors_on_max_id() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    let now = OffsetDateTime::now_utc();
    let statuses = json!([
        {
            "id": "300", "content": "<p>wi-fi 6 drops constantly</p>",
            "created_at": rfc3339(now - Duration::hours(2)),
            "account": { "acct": "kay" }
        },
        {
            "id": "250", "content": "<p>still fine here</p>",
            "created_at": rfc3339(now - Duration::hours(5)),
            "account": { "acct": "lee" }
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/v1/timelines/tag/wifi6"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statuses))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let api = MastodonApi::new(&server.uri(), None).unwrap();
    let window = SearchWindow::trailing_days(7);
    let page = api.search_page("Wi-Fi 6", &window, 25, None).await.unwrap();

    assert_eq!(page.posts.len(), 2);
    assert_eq!(page.posts[0].text, "wi-fi 6 drops constantly");
    // Next cursor is the oldest id on the page.
    assert_eq!(page.next.as_deref(), Some("250"));

    // An empty follow-up page ends the walk.
    Mock::given(method("GET"))
        .and(path("/api/v1/timelines/tag/wifi6"))
        .and(query_param("max_id", "250"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let done = api
        .search_page("Wi-Fi 6", &window, 25, page.next.as_deref())
        .await
        .unwrap();
    assert!(done.posts.is_empty());
    assert!(done.next.is_none());
}
