//! Minimal reqlog example: JSON endpoints, a view, a view set and a stream,
//! all logged.
//!
//! Run with:
//!   RUST_LOG=http.request=debug,info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -H 'authorization: Bearer secret' \
//!        -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/login -d 'user=alice&password=hunter2'
//!   curl http://localhost:3000/accounts
//!   curl http://localhost:3000/widgets
//!   curl http://localhost:3000/events

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use reqlog::{
    Annotation, ContentType, LoggingConfig, Request, RequestLogging, Response, Router, Server, View, ViewSet,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
max_body_length = 2048
http_4xx_log_level = "warn"
sensitive_headers = ["Authorization", "Cookie"]
"#;

#[tokio::main]
async fn main() -> Result<(), reqlog::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let logging = RequestLogging::new(LoggingConfig::from_toml_str(CONFIG)?)
        .with_context(|_req, _resp| vec![("service".to_owned(), "demo".to_owned())]);

    let app = Router::new()
        .on(Method::GET, "/users/{id}", get_user)
        .on(Method::POST, "/users", create_user)
        .on(Method::DELETE, "/users/{id}", delete_user)
        .on_annotated(Method::POST, "/login", login, Annotation::no_logging_because("credentials"))
        .on_annotated(Method::GET, "/healthz", healthz, Annotation::silent())
        .on(Method::GET, "/events", events)
        .view(
            "/accounts",
            View::new("AccountView")
                .method(Method::GET, "get", list_accounts)
                .method(Method::PUT, "put", update_account)
                .annotate(Annotation::log().no_headers_because("session cookies"))
                .annotate_method(Method::PUT, Annotation::no_logging_because("account data")),
        )
        .viewset(
            "/widgets",
            ViewSet::new("WidgetViewSet")
                .action("list", list_widgets)
                .action("create", create_user)
                .route(Method::GET, "list")
                .route(Method::POST, "create")
                .annotate_action("list", Annotation::log().no_response_because("large listing")),
        );

    Server::bind("0.0.0.0:3000")?
        .with_logging(logging)
        .serve(app)
        .await
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users: an empty body is a client error, logged at the 4xx level.
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .json(r#"{"error":"empty body"}"#);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn login(_req: Request) -> Response {
    Response::json(r#"{"token":"very-secret"}"#)
}

async fn healthz(_req: Request) -> &'static str {
    "ok"
}

async fn list_accounts(_req: Request) -> Response {
    Response::json(r#"[{"id":1},{"id":2}]"#)
}

async fn update_account(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn list_widgets(_req: Request) -> Response {
    Response::json(format!("[{}]", vec![r#"{"w":1}"#; 64].join(",")))
}

// Server-sent events. The body is never read by the logger.
async fn events(_req: Request) -> Response {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        for i in 0..5 {
            if tx.send(Bytes::from(format!("data: tick {i}\n\n"))).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });
    Response::stream(ContentType::EventStream, rx)
}
