//! Integration tests exercising the full pipeline over a mocked HTTP
//! server: pagination → decoding → operators → follow.

use aem_index_client::{Error, Pipeline};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn envelope(total: u64, offset: u64, limit: u64, data: serde_json::Value) -> serde_json::Value {
    json!({ "total": total, "offset": offset, "limit": limit, "data": data })
}

// S1: single page.
#[tokio::test]
async fn single_page_collects_all_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            1,
            0,
            255,
            json!([{"path": "/a", "title": "A"}]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/index.json", server.uri());

    let all = Pipeline::open(&url).unwrap().all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get_string("path").as_deref(), Some("/a"));
    assert_eq!(all[0].get_string("title").as_deref(), Some("A"));

    let count = Pipeline::open(&url).unwrap().count().await.unwrap();
    assert_eq!(count, 1);

    let first = Pipeline::open(&url).unwrap().first().await.unwrap();
    assert_eq!(first.unwrap().get_string("path").as_deref(), Some("/a"));
}

// S2: three-page pagination, chunk_size = 100, total = 250 (100/100/50).
#[tokio::test]
async fn three_page_pagination_issues_exactly_three_sequential_requests() {
    let server = MockServer::start().await;

    let page = |offset: u64, n: usize| {
        let data: Vec<_> = (0..n)
            .map(|i| json!({"path": format!("/item-{}", offset as usize + i)}))
            .collect();
        envelope(250, offset, 100, json!(data))
    };

    for (offset, n) in [(0, 100), (100, 100), (200, 50)] {
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .and(query_param("offset", offset.to_string()))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(offset, n)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let url = format!("{}/index.json", server.uri());
    let count = Pipeline::open(&url).unwrap().chunks(100).count().await.unwrap();
    assert_eq!(count, 250);
}

// S3: filter + limit over 20 entries.
#[tokio::test]
async fn filter_then_limit_preserves_order_of_retained_entries() {
    let server = MockServer::start().await;
    let data: Vec<_> = (1..=20).map(|i| json!({"idx": i})).collect();
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(20, 0, 255, json!(data))))
        .mount(&server)
        .await;

    let url = format!("{}/index.json", server.uri());
    let entries = Pipeline::open(&url)
        .unwrap()
        .filter(|e| matches!(e.get("idx"), Some(aem_index_client::EntryValue::Integer(n)) if n % 2 == 0))
        .limit(3)
        .all()
        .await
        .unwrap();

    let indices: Vec<_> = entries
        .iter()
        .map(|e| match e.get("idx") {
            Some(aem_index_client::EntryValue::Integer(n)) => *n,
            _ => panic!("expected integer"),
        })
        .collect();
    assert_eq!(indices, vec![2, 4, 6]);
}

// S4: follow success + missing field.
#[tokio::test]
async fn follow_attaches_document_and_reports_missing_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            2,
            0,
            255,
            json!([
                {"path": "/a", "doc": format!("{}/a.html", server.uri())},
                {"path": "/b"},
            ]),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body><h1>Doc A</h1></body></html>"))
        .mount(&server)
        .await;

    let url = format!("{}/index.json", server.uri());
    let host = server.address().to_string();
    let entries = Pipeline::open(&url)
        .unwrap()
        .allow(host)
        .follow("doc")
        .all()
        .await
        .unwrap();

    assert!(entries[0].get("doc").and_then(|v| v.as_document()).is_some());
    assert!(entries[0].get_string("doc_error").is_none());
    assert_eq!(entries[1].get_string("doc_error").as_deref(), Some("Missing or invalid URL"));
}

// S5: follow host denial.
#[tokio::test]
async fn follow_denies_hosts_outside_the_allow_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            1,
            0,
            255,
            json!([{"doc": "https://evil.test/p"}]),
        )))
        .mount(&server)
        .await;

    let url = format!("{}/i.json", server.uri());
    let entries = Pipeline::open(&url).unwrap().follow("doc").all().await.unwrap();

    let err = entries[0].get_string("doc_error").unwrap();
    assert!(err.starts_with("Host 'evil.test' is not allowed for document following."));
    assert!(entries[0].get("doc").is_none());
}

// S6: invalid URL rejected at construction.
#[test]
fn invalid_urls_are_rejected_at_construction() {
    for s in ["not-a-url", "", "javascript:alert(1)", "://missing-scheme"] {
        assert!(matches!(Pipeline::open(s), Err(Error::InvalidUrl(_))), "{s:?} should be rejected");
    }
}

// Pipeline immutability / re-runnability.
#[tokio::test]
async fn pipeline_is_re_runnable_and_operators_do_not_mutate_the_receiver() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            2,
            0,
            255,
            json!([{"path": "/a"}, {"path": "/b"}]),
        )))
        .mount(&server)
        .await;

    let url = format!("{}/index.json", server.uri());
    let base = Pipeline::open(&url).unwrap();
    let first_run = Pipeline::open(&url).unwrap().all().await.unwrap();
    let second_run = base.all().await.unwrap();
    assert_eq!(first_run.len(), second_run.len());
}

// Cancellation: stopping consumption after exactly k entries issues no page
// request beyond what was needed to produce them.
#[tokio::test]
async fn stopping_after_k_entries_issues_no_further_page_requests() {
    let server = MockServer::start().await;

    for offset in [0u64, 1] {
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .and(query_param("offset", offset.to_string()))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                5,
                offset,
                1,
                json!([{"path": format!("/item-{offset}")}]),
            )))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(5, 2, 1, json!([{"path": "/item-2"}]))))
        .expect(0)
        .mount(&server)
        .await;

    let url = format!("{}/index.json", server.uri());
    let entries = Pipeline::open(&url).unwrap().chunks(1).limit(2).all().await.unwrap();

    assert_eq!(entries.len(), 2);
    server.verify().await;
}

// limit(0) / slice(a, a) are argument errors surfaced on the stream.
#[tokio::test]
async fn invalid_operator_arguments_fail_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(1, 0, 255, json!([{"path": "/a"}]))))
        .mount(&server)
        .await;

    let url = format!("{}/index.json", server.uri());
    let err = Pipeline::open(&url).unwrap().limit(0).all().await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));

    let err = Pipeline::open(&url).unwrap().slice(5, 5).all().await.unwrap_err();
    assert!(matches!(err, Error::OperationFailed(_)));
}
