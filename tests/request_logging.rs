mod common;

use bytes::Bytes;
use http::{Method, StatusCode};
use reqlog::middleware::annotation::DEFAULT_SUPPRESS_MESSAGE;
use reqlog::middleware::body::{BINARY_PLACEHOLDER, STREAM_PLACEHOLDER};
use reqlog::{Annotation, ContentType, Request, Response, Router, Settings, View, ViewSet};
use tokio::sync::mpsc;
use tracing::Level;

use common::{plain, recording, request};

async fn echo(req: Request) -> Response {
    Response::json(req.body().clone())
}

async fn login(_: Request) -> Response {
    Response::json(r#"{"token":"abc"}"#)
}

async fn quiet(_: Request) -> Response {
    Response::text("shh")
}

async fn not_found(_: Request) -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn bad_request(_: Request) -> Response {
    Response::builder().status(StatusCode::BAD_REQUEST).json(r#"{"error":"missing name"}"#)
}

async fn broken(_: Request) -> Response {
    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn panics(_: Request) -> Response {
    panic!("handler blew up")
}

async fn streams(_: Request) -> Response {
    let (tx, rx) = mpsc::channel(4);
    tx.send(Bytes::from_static(b"STREAMED CHUNK")).await.unwrap();
    Response::stream(ContentType::Json, rx)
}

// ── Request phase ────────────────────────────────────────────────────────────

#[tokio::test]
async fn logs_both_phases_in_order() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::POST, "/users", echo);

    let req = request(
        Method::POST,
        "/users?dry_run=1",
        &[("content-type", "application/json"), ("user-agent", "ua")],
        r#"{"name":"alice"}"#,
    );
    let resp = logging.dispatch(&router, req).await;
    assert_eq!(resp.status_code(), StatusCode::OK);

    assert_eq!(
        sink.lines(),
        [
            "POST /users?dry_run=1",
            "Content-Type: application/json",
            "User-Agent: ua",
            r#"{"name":"alice"}"#,
            "POST /users?dry_run=1 - 200",
            "Content-Type: application/json",
            r#"{"name":"alice"}"#,
        ]
    );

    let levels: Vec<_> = sink.records().iter().map(|r| r.level).collect();
    assert_eq!(
        levels,
        [Level::INFO, Level::DEBUG, Level::DEBUG, Level::DEBUG, Level::INFO, Level::DEBUG, Level::DEBUG]
    );
}

#[tokio::test]
async fn sensitive_headers_are_masked() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::GET, "/me", quiet);

    let req = request(
        Method::GET,
        "/me",
        &[("authorization", "Bearer tok123"), ("proxy-authorization", "Basic xyz"), ("user-agent", "ua")],
        "",
    );
    logging.dispatch(&router, req).await;

    assert!(sink.find("Authorization: *****").is_some());
    assert!(sink.find("Proxy-Authorization: *****").is_some());
    assert!(sink.find("User-Agent: ua").is_some());
    assert!(!sink.text().contains("tok123"));
    assert!(!sink.text().contains("xyz"));
}

#[tokio::test]
async fn configured_sensitive_headers_replace_defaults() {
    let (logging, sink) = recording(Settings { sensitive_headers: vec!["X-Api-Key".into()], ..plain() });
    let router = Router::new().on(Method::GET, "/me", quiet);

    let req = request(Method::GET, "/me", &[("x-api-key", "k1"), ("authorization", "Bearer tok")], "");
    logging.dispatch(&router, req).await;

    assert!(sink.find("X-Api-Key: *****").is_some());
    assert!(sink.find("Authorization: Bearer tok").is_some());
}

#[tokio::test]
async fn body_is_cut_at_max_length() {
    let (logging, sink) = recording(Settings { max_body_length: 150, ..plain() });
    let router = Router::new().on(Method::POST, "/echo", echo);
    let at_limit = "0".repeat(150);

    let req = request(Method::POST, "/echo", &[("content-type", "text/plain")], &at_limit);
    logging.dispatch(&router, req).await;
    assert_eq!(sink.records().iter().filter(|r| r.line == at_limit).count(), 2);

    let (logging, sink) = logging_with_notice(150);
    let over = format!("{at_limit}1");
    let req = request(Method::POST, "/echo", &[("content-type", "text/plain")], &over);
    let resp = logging.dispatch(&router, req).await;

    // Only the log is cut; the handler and the client see everything.
    assert_eq!(resp.body().map(|b| b.len()), Some(151));
    assert!(!sink.text().contains(&over));
    assert_eq!(sink.records().iter().filter(|r| r.line == at_limit).count(), 2);
    assert_eq!(sink.records().iter().filter(|r| r.line == "(truncated)").count(), 2);
}

fn logging_with_notice(max: usize) -> (reqlog::RequestLogging, std::sync::Arc<common::MemorySink>) {
    recording(Settings { max_body_length: max, truncation_notice: true, ..plain() })
}

#[tokio::test]
async fn multipart_upload_hides_binary_payload() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::POST, "/upload", quiet);

    let body = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"title\"\r\n\r\n\
        holiday\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\n\
        Content-Type: image/jpeg\r\n\r\n\
        RAWJPEGPAYLOAD\r\n\
        --XyZ--\r\n";
    let req = request(Method::POST, "/upload", &[("content-type", "multipart/form-data; boundary=XyZ")], body);
    logging.dispatch(&router, req).await;

    assert!(sink.find(BINARY_PLACEHOLDER).is_some(), "{}", sink.text());
    assert!(sink.find("holiday").is_some());
    assert!(!sink.text().contains("RAWJPEGPAYLOAD"));
}

#[tokio::test]
async fn application_text_bodies_are_decoded() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::POST, "/config", quiet);

    let req = request(Method::POST, "/config", &[("content-type", "application/yaml")], "name: alice\nrole: admin");
    logging.dispatch(&router, req).await;

    assert!(sink.find("name: alice").is_some(), "{}", sink.text());
    assert!(sink.find("role: admin").is_some());
    assert!(sink.find(BINARY_PLACEHOLDER).is_none());
}

// ── Response phase ───────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_level_follows_status() {
    let (logging, sink) = recording(plain());
    let router = Router::new()
        .on(Method::GET, "/ok", quiet)
        .on(Method::GET, "/missing", not_found)
        .on(Method::GET, "/broken", broken);

    for path in ["/ok", "/missing", "/broken"] {
        logging.dispatch(&router, request(Method::GET, path, &[], "")).await;
    }

    assert_eq!(sink.find("GET /ok - 200").unwrap().level, Level::INFO);
    assert_eq!(sink.find("GET /missing - 404").unwrap().level, Level::ERROR);
    assert_eq!(sink.find("GET /broken - 500").unwrap().level, Level::ERROR);
}

#[tokio::test]
async fn configured_4xx_level_keeps_summary_at_info() {
    let (logging, sink) = recording(Settings { http_4xx_log_level: "warn".into(), ..plain() });
    let router = Router::new().on(Method::POST, "/users", bad_request);

    logging.dispatch(&router, request(Method::POST, "/users", &[], "")).await;

    assert_eq!(sink.find("POST /users - 400").unwrap().level, Level::INFO);
    assert_eq!(sink.find(r#"{"error":"missing name"}"#).unwrap().level, Level::WARN);
}

#[tokio::test]
async fn streaming_response_is_not_consumed() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::GET, "/events", streams);

    let resp = logging.dispatch(&router, request(Method::GET, "/events", &[], "")).await;

    assert!(resp.is_streaming());
    assert!(sink.find(STREAM_PLACEHOLDER).is_some());
    assert!(!sink.text().contains("STREAMED CHUNK"));
    let summary = sink.find("GET /events - 200").unwrap();
    assert!(summary.ctx.response.unwrap().streaming);
}

#[tokio::test]
async fn unmatched_path_is_logged_as_404() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::GET, "/ok", quiet);

    let resp = logging.dispatch(&router, request(Method::POST, "/nowhere", &[], "payload")).await;

    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    assert!(sink.find("POST /nowhere").is_some());
    assert!(sink.find("payload").is_some());
    assert_eq!(sink.find("POST /nowhere - 404").unwrap().level, Level::ERROR);
}

#[tokio::test]
async fn wrong_verb_is_logged_as_405() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::GET, "/ok", quiet);

    let resp = logging.dispatch(&router, request(Method::DELETE, "/ok", &[], "")).await;

    assert_eq!(resp.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(sink.find("DELETE /ok - 405").is_some());
}

#[tokio::test]
async fn panicking_handler_logs_no_response() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on(Method::POST, "/explode", panics);

    let resp = logging.dispatch(&router, request(Method::POST, "/explode", &[], "before the crash")).await;

    assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(sink.find("before the crash").is_some());
    let record = sink.find("POST /explode - (no response)").unwrap();
    assert_eq!(record.level, Level::ERROR);
    assert!(record.ctx.response.is_none());
}

// ── Annotations ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn suppressed_route_announces_reason_only() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(
        Method::POST,
        "/login",
        login,
        Annotation::no_logging_because("credentials"),
    );

    let req = request(Method::POST, "/login", &[("user-agent", "ua")], r#"{"password":"hunter2"}"#);
    let resp = logging.dispatch(&router, req).await;
    assert_eq!(resp.status_code(), StatusCode::OK);

    assert_eq!(sink.lines(), ["POST /login (not logged because 'credentials')", "POST /login - 200"]);
    for record in sink.records() {
        assert_eq!(record.ctx.no_logging.as_deref(), Some("credentials"));
    }
    assert!(!sink.text().contains("hunter2"));
    assert!(!sink.text().contains("token"));
}

#[tokio::test]
async fn suppression_covers_every_verb_on_the_path() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(
        Method::POST,
        "/login",
        login,
        Annotation::no_logging_because("credentials"),
    );

    let req = request(Method::PUT, "/login", &[("authorization", "Bearer tok")], "password=hunter2");
    let resp = logging.dispatch(&router, req).await;

    assert_eq!(resp.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(sink.lines(), ["PUT /login (not logged because 'credentials')", "PUT /login - 405"]);
    assert!(!sink.text().contains("hunter2"));
}

#[tokio::test]
async fn suppressed_panic_keeps_the_notice() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(
        Method::POST,
        "/explode",
        panics,
        Annotation::no_logging_because("secrets"),
    );

    let resp = logging.dispatch(&router, request(Method::POST, "/explode", &[], "pin=1234")).await;

    assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.lines(), ["POST /explode (not logged because 'secrets')", "POST /explode - (no response)"]);
    assert!(sink.records().iter().all(|r| r.ctx.no_logging.as_deref() == Some("secrets")));
}

#[tokio::test]
async fn silent_panic_logs_nothing() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(Method::POST, "/explode", panics, Annotation::silent());

    logging.dispatch(&router, request(Method::POST, "/explode", &[], "")).await;

    assert!(sink.is_empty(), "{}", sink.text());
}

#[tokio::test]
async fn blank_reason_uses_default_message() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(Method::POST, "/login", login, Annotation::no_logging_because(""));

    logging.dispatch(&router, request(Method::POST, "/login", &[], "")).await;

    let expected = format!("POST /login (not logged because '{DEFAULT_SUPPRESS_MESSAGE}')");
    assert!(sink.find(&expected).is_some(), "{}", sink.text());
}

#[tokio::test]
async fn suppression_without_reason_uses_default_message() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(Method::POST, "/login", login, Annotation::no_logging());

    logging.dispatch(&router, request(Method::POST, "/login", &[], "secret")).await;

    let expected = format!("POST /login (not logged because '{DEFAULT_SUPPRESS_MESSAGE}')");
    assert!(sink.find(&expected).is_some(), "{}", sink.text());
    assert!(!sink.text().contains("secret"));
}

#[tokio::test]
async fn custom_reason_replaces_default_message() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(
        Method::POST,
        "/login",
        login,
        Annotation::no_logging_because("Custom message"),
    );

    logging.dispatch(&router, request(Method::POST, "/login", &[], "")).await;

    assert!(sink.text().contains("Custom message"));
    assert!(!sink.text().contains(DEFAULT_SUPPRESS_MESSAGE));
}

#[tokio::test]
async fn silent_route_logs_nothing() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(Method::GET, "/health", quiet, Annotation::silent());

    let resp = logging.dispatch(&router, request(Method::GET, "/health", &[], "")).await;

    assert_eq!(resp.status_code(), StatusCode::OK);
    assert!(sink.is_empty(), "{}", sink.text());
}

#[tokio::test]
async fn dropped_concerns_leave_notes() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(
        Method::POST,
        "/upload",
        echo,
        Annotation::log().no_headers_because("cookies").no_body_because("large files"),
    );

    let req = request(Method::POST, "/upload", &[("cookie", "session=1")], "file contents");
    logging.dispatch(&router, req).await;

    assert_eq!(
        sink.lines(),
        [
            "POST /upload",
            "(headers not logged because 'cookies')",
            "(body not logged because 'large files')",
            "POST /upload - 200",
            "(headers not logged because 'cookies')",
            "(body not logged because 'large files')",
        ]
    );
}

#[tokio::test]
async fn dropped_response_keeps_the_summary() {
    let (logging, sink) = recording(plain());
    let router = Router::new().on_annotated(Method::POST, "/login", login, Annotation::log().log_response(false));

    logging.dispatch(&router, request(Method::POST, "/login", &[], "name=alice")).await;

    assert!(sink.find("name=alice").is_some());
    assert!(sink.find("POST /login - 200").is_some());
    assert!(!sink.text().contains("token"));
}

#[tokio::test]
async fn view_method_annotation_beats_class_annotation() {
    let (logging, sink) = recording(plain());
    let router = Router::new().view(
        "/accounts",
        View::new("AccountView")
            .method(Method::GET, "get", quiet)
            .method(Method::POST, "post", echo)
            .annotate(Annotation::no_logging_because("account data"))
            .annotate_method(Method::POST, Annotation::log().no_body_because("passwords")),
    );

    logging.dispatch(&router, request(Method::GET, "/accounts", &[], "")).await;
    assert!(sink.find("GET /accounts (not logged because 'account data')").is_some());

    logging.dispatch(&router, request(Method::POST, "/accounts", &[], "pw")).await;
    assert!(sink.find("POST /accounts").is_some());
    assert!(sink.find("(body not logged because 'passwords')").is_some());
    assert!(sink.find("pw").is_none());
}

#[tokio::test]
async fn viewset_action_annotation_applies_to_routed_verb() {
    let (logging, sink) = recording(plain());
    let router = Router::new().viewset(
        "/widgets",
        ViewSet::new("WidgetViewSet")
            .action("list", quiet)
            .action("create", echo)
            .route(Method::GET, "list")
            .route(Method::POST, "create")
            .annotate_action("create", Annotation::silent()),
    );

    logging.dispatch(&router, request(Method::POST, "/widgets", &[], "w1")).await;
    assert!(sink.is_empty());

    logging.dispatch(&router, request(Method::GET, "/widgets", &[], "")).await;
    assert!(sink.find("GET /widgets - 200").is_some());
    assert!(sink.find("shh").is_some());
}

// ── Context and colour ───────────────────────────────────────────────────────

#[tokio::test]
async fn context_reaches_every_record() {
    let (logging, sink) = recording(plain());
    let logging = logging.with_context(|req, resp| {
        let mut extra = vec![("route".to_owned(), req.full_path.clone())];
        if let Some(resp) = resp {
            extra.push(("status".to_owned(), resp.status.as_u16().to_string()));
        }
        extra
    });
    let router = Router::new().on(Method::POST, "/users", echo);

    logging.dispatch(&router, request(Method::POST, "/users", &[], "x")).await;

    let records = sink.records();
    assert!(records.iter().all(|r| r.ctx.extra[0] == ("route".to_owned(), "/users".to_owned())));
    assert!(records.iter().all(|r| r.ctx.request.method == Method::POST));
    assert!(records.iter().all(|r| r.ctx.no_logging.is_none()));

    let request_phase = sink.find("POST /users").unwrap();
    assert!(request_phase.ctx.response.is_none());
    assert_eq!(request_phase.ctx.extra.len(), 1);

    let response_phase = sink.find("POST /users - 200").unwrap();
    assert_eq!(response_phase.ctx.response.unwrap().status, StatusCode::OK);
    assert_eq!(response_phase.ctx.extra[1], ("status".to_owned(), "200".to_owned()));
}

#[tokio::test]
async fn colour_wraps_each_line() {
    let (logging, sink) = recording(Settings { colorize: true, ..Settings::default() });
    let router = Router::new()
        .on(Method::GET, "/ok", quiet)
        .on(Method::GET, "/broken", broken);

    logging.dispatch(&router, request(Method::GET, "/ok", &[], "")).await;
    logging.dispatch(&router, request(Method::GET, "/broken", &[], "")).await;

    let records = sink.records();
    assert!(records.iter().all(|r| r.line.ends_with("\u{1b}[0m")));
    let ok = records.iter().find(|r| r.line.contains("GET /ok - 200")).unwrap();
    assert!(ok.line.starts_with("\u{1b}[36m"));
    let broken = records.iter().find(|r| r.line.contains("GET /broken - 500")).unwrap();
    assert!(broken.line.starts_with("\u{1b}[35m"));
}
