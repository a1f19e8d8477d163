//! End-to-end transfers against a local mock server.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use horizon_relay_core::{ThreadPool, ThreadPoolConfig};
use horizon_relay_net::{
    EngineBuilder, FetchEngine, FetchRequest, HttpMethod, PostEngine, PostRequest, STATUS_NO_RESPONSE,
    STATUS_TIMED_OUT, TransferNotifier, TransferOutcome, TransferResult, TransportErrorKind,
};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetch_engine(notifier: TransferNotifier) -> FetchEngine {
    EngineBuilder::new()
        .dispatcher(ThreadPool::new(ThreadPoolConfig::with_threads(4)).unwrap())
        .notifier(notifier)
        .build_fetch()
        .expect("Failed to build fetch engine")
}

fn post_engine(notifier: TransferNotifier) -> PostEngine {
    EngineBuilder::new()
        .dispatcher(ThreadPool::new(ThreadPoolConfig::with_threads(4)).unwrap())
        .notifier(notifier)
        .build_post()
        .expect("Failed to build post engine")
}

/// Run a blocking engine call without stalling the mock server's runtime.
async fn blocking<F>(call: F) -> TransferResult
where
    F: FnOnce() -> TransferResult + Send + 'static,
{
    tokio::task::spawn_blocking(call).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello")
                .insert_header("Expires", "Thu, 01 Jan 2099 00:00:00 GMT"),
        )
        .mount(&server)
        .await;

    let engine = fetch_engine(TransferNotifier::new());
    let uri = format!("{}/resource", server.uri());
    let result = blocking(move || {
        engine
            .fetch(&FetchRequest::new(uri), Duration::from_millis(5000))
            .unwrap()
    })
    .await;

    assert_eq!(result.status_code(), 200);
    assert_eq!(result.body_text(), Some("hello"));
    assert!(result.error().is_none());
    assert_eq!(
        result.expiration().to_rfc3339(),
        "2099-01-01T00:00:00+00:00"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(5000)))
        .mount(&server)
        .await;

    let engine = fetch_engine(TransferNotifier::new());
    let uri = format!("{}/resource", server.uri());
    let start = Instant::now();
    let result = blocking(move || {
        engine
            .fetch(&FetchRequest::new(uri), Duration::from_millis(100))
            .unwrap()
    })
    .await;

    assert_eq!(result.status_code(), STATUS_TIMED_OUT);
    assert!(result.message().unwrap().contains("timed out"));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_file_name_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/exports/daily.csv"))
        .and(header("Accept", "text/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = fetch_engine(TransferNotifier::new());
    let uri = format!("{}/exports/", server.uri());
    let result = blocking(move || {
        let request = FetchRequest::new(uri)
            .file_name("daily.csv")
            .header("Accept", "text/csv");
        engine.fetch(&request, Duration::from_secs(5)).unwrap()
    })
    .await;

    assert!(result.is_success());
    assert_eq!(result.body_text(), Some("a,b\n1,2\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gzip_response_is_decompressed() {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"zipped payload").unwrap();
    let compressed = encoder.finish().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zipped"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Encoding", "gzip")
                .set_body_raw(compressed, "text/plain"),
        )
        .mount(&server)
        .await;

    let engine = fetch_engine(TransferNotifier::new());
    let uri = format!("{}/zipped", server.uri());
    let result = blocking(move || {
        engine
            .fetch(&FetchRequest::new(uri), Duration::from_secs(5))
            .unwrap()
    })
    .await;

    assert_eq!(result.body_text(), Some("zipped payload"));
    assert_eq!(result.body_bytes().unwrap().as_ref(), b"zipped payload");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_fetches_are_isolated() {
    let server = MockServer::start().await;
    for i in 0..8 {
        Mock::given(method("GET"))
            .and(path(format!("/item/{i}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("item {i}")))
            .mount(&server)
            .await;
    }

    let engine = Arc::new(fetch_engine(TransferNotifier::new()));
    let mut calls = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let uri = format!("{}/item/{i}", server.uri());
        calls.push(tokio::task::spawn_blocking(move || {
            let result = engine
                .fetch(&FetchRequest::new(uri.clone()), Duration::from_secs(5))
                .unwrap();
            (i, uri, result)
        }));
    }

    for call in calls {
        let (i, uri, result) = call.await.unwrap();
        assert_eq!(result.uri(), uri);
        assert_eq!(result.body_text(), Some(format!("item {i}").as_str()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_object_round_trip() {
    #[derive(serde::Serialize, Debug, Clone, PartialEq)]
    struct Order {
        id: u32,
        item: String,
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("Content-Type", "application/xml"))
        .and(body_string("<Order><id>42</id><item>widget</item></Order>"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let engine = post_engine(TransferNotifier::new());
    let uri = format!("{}/orders", server.uri());
    let order = Order {
        id: 42,
        item: "widget".into(),
    };
    let sent = order.clone();
    let result = blocking(move || {
        engine
            .post_object(&PostRequest::new(uri), sent, Duration::from_secs(5))
            .unwrap()
    })
    .await;

    assert_eq!(result.status_code(), 201);
    assert_eq!(result.correlated::<Order>(), Some(&order));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_string_default_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string("name=relay"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let engine = post_engine(TransferNotifier::new());
    let uri = format!("{}/form", server.uri());
    let result = blocking(move || {
        engine
            .post_string(&PostRequest::new(uri), "name=relay", Duration::from_secs(5))
            .unwrap()
    })
    .await;

    assert_eq!(result.outcome(), TransferOutcome::Completed);
    assert_eq!(result.status_code(), 204);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_is_published_as_abnormal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(401).set_body_string("login required"))
        .mount(&server)
        .await;

    let notifier = TransferNotifier::new();
    let expired = Arc::new(AtomicUsize::new(0));
    let counter = expired.clone();
    notifier.on_abnormal_response().connect(move |result| {
        if result.status_code() == 401 {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let engine = fetch_engine(notifier);
    let uri = format!("{}/private", server.uri());
    let result = blocking(move || {
        engine
            .fetch(&FetchRequest::new(uri), Duration::from_secs(5))
            .unwrap()
    })
    .await;

    assert_eq!(result.outcome(), TransferOutcome::ProtocolFailed);
    assert_eq!(result.status_code(), 401);
    assert_eq!(result.body_text(), Some("login required"));

    // Observers run once the caller has been released.
    let deadline = Instant::now() + Duration::from_secs(2);
    while expired.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(expired.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_caller_content_type_header_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = post_engine(TransferNotifier::new());
    let uri = format!("{}/profile", server.uri());
    let result = blocking(move || {
        let request = PostRequest::new(uri)
            .verb(HttpMethod::Patch)
            .header("Content-Type", "application/json");
        engine
            .post_string(&request, r#"{"name":"relay"}"#, Duration::from_secs(5))
            .unwrap()
    })
    .await;
    assert!(result.is_success());

    let received = server.received_requests().await.unwrap();
    let content_types: Vec<_> = received[0]
        .headers
        .get_all("content-type")
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    assert_eq!(content_types, vec!["application/json".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refused_connection_is_send_failure() {
    // Bind then drop to find a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let engine = post_engine(TransferNotifier::new());
    let result = blocking(move || {
        engine
            .post_bytes(
                &PostRequest::new(format!("http://127.0.0.1:{port}/upload")),
                vec![1u8, 2, 3],
                Duration::from_secs(5),
            )
            .unwrap()
    })
    .await;

    assert_eq!(result.status_code(), STATUS_NO_RESPONSE);
    assert_eq!(result.outcome(), TransferOutcome::TransportFailed);
    assert_eq!(result.transport_error_kind(), TransportErrorKind::ConnectFailure);
    assert!(result.message().unwrap().starts_with("[send]"));
}
