//! Integration tests for the forum client against a mock Discourse instance:
//! login, topic pagination, post batches, category enrichment, and writes.
//!
//! Each test gets its own `MockServer`, cookie file, and cache directory.

use lurk::discourse::{normalize_base_url, ClientError, ClientOptions, DiscourseClient, NewTopic};
use lurk::session::{SessionError, SessionStore};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    server: MockServer,
    client: DiscourseClient,
    dir: TempDir,
}

async fn fixture() -> Fixture {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.txt"));
    let options = ClientOptions {
        timeout: Duration::from_secs(5),
        page_cooldown: Duration::from_millis(1),
    };
    let client =
        DiscourseClient::with_options(&server.uri(), store, dir.path().join("cache"), options)
            .unwrap();
    Fixture { server, client, dir }
}

fn topic(id: i64, category_id: Option<i64>) -> Value {
    json!({
        "id": id,
        "title": format!("Topic {}", id),
        "slug": format!("topic-{}", id),
        "category_id": category_id,
        "posts_count": 1,
        "views": 10,
    })
}

fn topic_list(topics: Vec<Value>, more: Option<&str>) -> Value {
    json!({
        "users": [],
        "topic_list": {
            "can_create_topic": true,
            "more_topics_url": more,
            "per_page": 30,
            "topics": topics,
        }
    })
}

fn post(id: i64, number: u32) -> Value {
    json!({
        "id": id,
        "username": "alice",
        "cooked": format!("<p>post {}</p>", number),
        "post_number": number,
        "topic_id": 7,
    })
}

async fn mount_categories(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/categories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category_list": {
                "categories": [
                    { "id": 1, "name": "General", "color": "0088CC" },
                    { "id": 2, "name": "Support", "color": "F1592A" }
                ]
            }
        })))
        .mount(server)
        .await;
}

async fn mount_csrf(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/session/csrf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "csrf": token })))
        .mount(server)
        .await;
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_bare_host_gets_https_scheme() {
    assert_eq!(normalize_base_url("forum.example.com").unwrap(), "https://forum.example.com");
    assert_eq!(
        normalize_base_url("  https://forum.example.com/ ").unwrap(),
        "https://forum.example.com"
    );
    assert!(matches!(normalize_base_url(""), Err(ClientError::Config(_))));
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_login_persists_cookies() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(header("X-CSRF-Token", "tok"))
        .and(body_string_contains("login=alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "_t=session-token; Path=/")
                .set_body_json(json!({ "user": { "id": 1, "username": "alice" } })),
        )
        .expect(1)
        .mount(&fx.server)
        .await;

    fx.client
        .login("alice", &SecretString::from("pw"))
        .await
        .unwrap();

    let saved = std::fs::read_to_string(fx.dir.path().join("cookies.txt")).unwrap();
    assert!(saved.contains("_t=session-token"));
}

#[tokio::test]
async fn test_rejected_login_persists_nothing() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&fx.server)
        .await;

    let err = fx
        .client
        .login("alice", &SecretString::from("bad"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Protocol { status: 403, .. }));
    assert!(!fx.dir.path().join("cookies.txt").exists());
}

#[tokio::test]
async fn test_login_error_payload_is_auth_failure() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "error": "Incorrect username, email or password" })),
        )
        .mount(&fx.server)
        .await;

    let err = fx
        .client
        .login("alice", &SecretString::from("bad"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Auth(ref reason) if reason.contains("Incorrect")));
    assert!(!fx.dir.path().join("cookies.txt").exists());
}

#[tokio::test]
async fn test_login_without_cookies_is_not_a_success() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&fx.server)
        .await;

    let err = fx
        .client
        .login("alice", &SecretString::from("pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Session(SessionError::NoCookies)));
}

#[tokio::test]
async fn test_empty_csrf_token_is_auth_error() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "").await;

    let err = fx.client.fetch_csrf_token().await.unwrap_err();
    assert!(matches!(err, ClientError::Auth(_)));
}

// ============================================================================
// Topic lists
// ============================================================================

#[tokio::test]
async fn test_more_topics_follows_relative_cursor() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(
            vec![topic(1, Some(1)), topic(2, Some(2))],
            Some("/latest.json?page=2"),
        )))
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(
            vec![topic(3, None), topic(4, Some(1)), topic(5, Some(2))],
            None,
        )))
        .mount(&fx.server)
        .await;

    let mut page = fx.client.latest_topics().await.unwrap();
    assert_eq!(page.more_cursor, "/latest.json?page=2");

    let next = fx.client.more_topics(&page.more_cursor).await.unwrap();
    assert_eq!(page.append(next), 3);

    let ids: Vec<i64> = page.topics.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert!(!page.has_more());
    assert_eq!(page.topics[4].category_name.as_deref(), Some("Support"));
}

#[tokio::test]
async fn test_more_topics_rejects_empty_cursor() {
    let fx = fixture().await;
    let err = fx.client.more_topics("  ").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn test_load_all_keeps_pages_before_a_failure() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(
            vec![topic(1, None), topic(2, None)],
            Some("/latest.json?page=2"),
        )))
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(
            vec![topic(2, None), topic(3, None)],
            Some("/latest.json?page=3"),
        )))
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&fx.server)
        .await;

    let all = fx.client.load_all_topics(10).await.unwrap();

    let ids: Vec<i64> = all.topics.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(all.more_cursor, "/latest.json?page=3");
}

#[tokio::test]
async fn test_load_all_respects_page_cap() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topic_list(vec![topic(1, None)], Some("/latest.json?page=2"))),
        )
        .expect(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topic_list(vec![topic(2, None)], Some("/latest.json?page=3"))),
        )
        .expect(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(vec![topic(3, None)], None)))
        .expect(0)
        .mount(&fx.server)
        .await;

    let all = fx.client.load_all_topics(2).await.unwrap();
    assert_eq!(all.topics.len(), 2);
    assert!(all.has_more());
}

#[tokio::test]
async fn test_load_all_stops_on_empty_page() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topic_list(vec![topic(1, None)], Some("/latest.json?page=2"))),
        )
        .expect(1)
        .mount(&fx.server)
        .await;
    // Empty page that still advertises a cursor.
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topic_list(vec![], Some("/latest.json?page=3"))),
        )
        .expect(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(vec![topic(3, None)], None)))
        .expect(0)
        .mount(&fx.server)
        .await;

    let all = fx.client.load_all_topics(10).await.unwrap();

    let ids: Vec<i64> = all.topics.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn test_load_all_zero_cap_means_ten_pages() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topic_list(vec![topic(1, None)], Some("/latest.json?page=2"))),
        )
        .expect(1)
        .mount(&fx.server)
        .await;
    for n in 2..=10 {
        let next = format!("/latest.json?page={}", n + 1);
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("page", n.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(topic_list(vec![topic(n, None)], Some(next.as_str()))),
            )
            .expect(1)
            .mount(&fx.server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("page", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(vec![topic(11, None)], None)))
        .expect(0)
        .mount(&fx.server)
        .await;

    let all = fx.client.load_all_topics(0).await.unwrap();

    let ids: Vec<i64> = all.topics.iter().map(|t| t.id).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
    assert_eq!(all.more_cursor, "/latest.json?page=11");
}

#[tokio::test]
async fn test_first_page_is_cached_and_served_from_cache() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(topic_list(vec![topic(9, Some(1))], None)),
        )
        .expect(1)
        .mount(&fx.server)
        .await;

    assert!(fx.client.cached_topics().await.is_none());
    fx.client.latest_topics().await.unwrap();

    let cached = fx.client.cached_topics().await.unwrap();
    assert_eq!(cached.topics[0].id, 9);
    assert_eq!(cached.topics[0].category_name.as_deref(), Some("General"));
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_unknown_category_stays_unenriched() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(
            vec![topic(1, Some(2)), topic(2, Some(99)), topic(3, None)],
            None,
        )))
        .mount(&fx.server)
        .await;

    let page = fx.client.latest_topics().await.unwrap();

    assert_eq!(page.topics[0].category_name.as_deref(), Some("Support"));
    assert_eq!(page.topics[0].category_color.as_deref(), Some("F1592A"));
    assert_eq!(page.topics[1].category_name, None);
    assert_eq!(page.topics[2].category_name, None);
}

#[tokio::test]
async fn test_enrichment_failure_still_delivers_topics() {
    let fx = fixture().await;
    Mock::given(method("GET"))
        .and(path("/categories.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topic_list(vec![topic(1, Some(1))], None)))
        .mount(&fx.server)
        .await;

    let page = fx.client.latest_topics().await.unwrap();
    assert_eq!(page.topics.len(), 1);
    assert_eq!(page.topics[0].category_name, None);
}

#[tokio::test]
async fn test_cached_categories_skip_the_network() {
    let fx = fixture().await;
    mount_categories(&fx.server).await;
    let first = fx.client.categories().await.unwrap();
    assert_eq!(first.categories.len(), 2);

    // A second client on the same instance and cache root.
    let client = DiscourseClient::with_options(
        &fx.server.uri(),
        SessionStore::new(fx.dir.path().join("cookies.txt")),
        fx.dir.path().join("cache"),
        ClientOptions::default(),
    )
    .unwrap();

    let again = client.categories().await.unwrap();
    assert_eq!(again, first);
    assert_eq!(
        fx.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/categories.json")
            .count(),
        1
    );
}

// ============================================================================
// Posts
// ============================================================================

#[tokio::test]
async fn test_topic_posts_batches_the_stream() {
    let fx = fixture().await;
    Mock::given(method("GET"))
        .and(path("/t/7.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "post_stream": { "posts": [post(70, 1)], "stream": [70, 71, 72] }
        })))
        .expect(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t/7/posts.json"))
        .and(query_param("include_suggested", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "post_stream": { "posts": [post(72, 3), post(70, 1), post(71, 2)] }
        })))
        .expect(1)
        .mount(&fx.server)
        .await;

    let page = fx.client.topic_posts(7).await.unwrap();

    let numbers: Vec<u32> = page.posts.iter().map(|p| p.post_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let requests = fx.server.received_requests().await.unwrap();
    let batch = requests
        .iter()
        .find(|r| r.url.path() == "/t/7/posts.json")
        .unwrap();
    let ids: Vec<String> = batch
        .url
        .query_pairs()
        .filter(|(k, _)| k == "post_ids[]")
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(ids, vec!["70", "71", "72"]);
}

#[tokio::test]
async fn test_empty_stream_needs_one_request() {
    let fx = fixture().await;
    Mock::given(method("GET"))
        .and(path("/t/7.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "post_stream": { "posts": [post(70, 1)], "stream": [] }
        })))
        .expect(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t/7/posts.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fx.server)
        .await;

    let page = fx.client.topic_posts(7).await.unwrap();
    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.topic_id, 7);
}

#[tokio::test]
async fn test_missing_topic_is_protocol_error() {
    let fx = fixture().await;
    Mock::given(method("GET"))
        .and(path("/t/404.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&fx.server)
        .await;

    let err = fx.client.topic_posts(404).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { status: 404, .. }));
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_create_topic_sends_csrf_and_json() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/posts.json"))
        .and(header("X-CSRF-Token", "tok"))
        .and(body_string_contains("\"title\":\"Hello\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 501, "topic_id": 88, "post_number": 1, "username": "alice"
        })))
        .expect(1)
        .mount(&fx.server)
        .await;

    let draft = NewTopic::new("Hello", "First post body").category(Some(2));
    let post = fx.client.create_topic(&draft).await.unwrap();

    assert_eq!(post.id, 501);
    assert_eq!(post.topic_id, 88);
}

#[tokio::test]
async fn test_create_topic_with_zero_id_is_rejected() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 0 })))
        .mount(&fx.server)
        .await;

    let err = fx
        .client
        .create_topic(&NewTopic::new("Hello", "body"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn test_like_post_returns_updated_actions() {
    let fx = fixture().await;
    mount_csrf(&fx.server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/post_actions"))
        .and(body_string_contains("post_action_type_id=2"))
        .and(body_string_contains("id=70"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 70,
            "post_number": 1,
            "username": "alice",
            "actions_summary": [{ "id": 2, "count": 4, "acted": true }]
        })))
        .expect(1)
        .mount(&fx.server)
        .await;

    let post = fx.client.like_post(70).await.unwrap();
    assert!(post.liked());
    assert_eq!(post.like_count(), 4);
}
