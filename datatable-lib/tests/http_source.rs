//! HTTP source against a local server.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use datatable_lib::DataSourceError;
use datatable_lib::DataSourceQuery;
use datatable_lib::export::ExportFormat;
use datatable_lib::query::QueryFilter;
use datatable_lib::retry::RetryPolicy;
use datatable_lib::source::AuthScheme;
use datatable_lib::source::BaseDataSource;
use datatable_lib::source::BaseDataSourceConfig;
use datatable_lib::source::DataSource;
use datatable_lib::source::HttpDataSource;
use datatable_lib::source::HttpSourceConfig;
use http_body_util::Full;
use hyper::Request;
use hyper::Response;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

/// Request line and auth headers seen by the server.
#[derive(Debug, Clone)]
struct Seen {
    uri: String,
    authorization: Option<String>,
    api_key: Option<String>,
}

#[derive(Default)]
struct Server {
    seen: Mutex<Vec<Seen>>,
    flaky_hits: AtomicU32,
}

impl Server {
    fn last(&self) -> Seen {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn respond(req: Request<Incoming>, server: &Server) -> Response<Full<Bytes>> {
    let (seen, path, query) = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let seen = Seen {
            uri: req.uri().to_string(),
            authorization: header("authorization"),
            api_key: header("x-api-key"),
        };
        (
            seen,
            req.uri().path().to_string(),
            req.uri().query().unwrap_or_default().to_string(),
        )
    };
    drop(req);
    server.seen.lock().unwrap().push(seen);

    let users = json!([{"id": 1, "name": "Ada"}, {"id": 2, "name": "Grace"}]);
    match path.as_str() {
        "/users" => json_response(StatusCode::OK, json!({"data": users, "total": 42})),
        "/items" => json_response(StatusCode::OK, json!({"items": users, "count": 7})),
        "/bare" => json_response(StatusCode::OK, users),
        "/paged" => {
            let param = |name: &str| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(k, _)| k == name)
                    .and_then(|(_, v)| v.parse::<usize>().ok())
            };
            let all = [(1, "Ada"), (2, "Grace"), (3, "Barbara")];
            let offset = param("offset").unwrap_or(0);
            let limit = param("limit").unwrap_or(all.len());
            let page: Vec<_> = all
                .iter()
                .skip(offset)
                .take(limit)
                .map(|(id, name)| json!({"id": id, "name": name}))
                .collect();
            json_response(StatusCode::OK, json!(page))
        }
        "/broken" => json_response(StatusCode::OK, json!({"rows": []})),
        "/forbidden" => json_response(StatusCode::FORBIDDEN, json!({"message": "no access", "code": "E_AUTH"})),
        "/flaky" => {
            if server.flaky_hits.fetch_add(1, Ordering::SeqCst) < 2 {
                json_response(StatusCode::SERVICE_UNAVAILABLE, json!({"message": "warming up"}))
            } else {
                json_response(StatusCode::OK, json!({"data": users, "total": 2}))
            }
        }
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            json_response(StatusCode::OK, json!({"data": [], "total": 0}))
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({"error": "not_found"})),
    }
}

/// Starts a server on a random port, returning its base URL.
async fn serve() -> (String, Arc<Server>) {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(Server::default());

    let state = server.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = state.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(respond(req, &state).await) }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://{}", addr), server)
}

#[tokio::test]
async fn test_fetch_page_with_bearer() {
    let (base, server) = serve().await;
    let source: HttpDataSource<User> = HttpDataSource::new(
        HttpSourceConfig::new(format!("{}/users", base)).auth(AuthScheme::Bearer("s3cret".to_string())),
    );
    let query = DataSourceQuery::new()
        .page(1, 2)
        .sort_desc("name")
        .search("a")
        .filter(QueryFilter::eq("team", "core"));

    let response = source.fetch(&query).await.unwrap();
    assert_eq!(response.data[1], User { id: 2, name: "Grace".to_string() });
    assert_eq!(response.total, 42);
    assert_eq!(response.page_count, Some(21));
    assert_eq!(response.has_prev_page, Some(true));

    let seen = server.last();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer s3cret"));
    assert!(seen.uri.starts_with("/users?limit=2&offset=2&sort=name%3Adesc&search=a&filters="));
}

#[tokio::test]
async fn test_api_key_and_custom_keys() {
    let (base, server) = serve().await;
    let config = HttpSourceConfig::new(format!("{}/items", base))
        .auth(AuthScheme::ApiKey {
            header: "X-Api-Key".to_string(),
            key: "k-123".to_string(),
        })
        .data_key("items")
        .total_key("count");
    let source: HttpDataSource<User> = HttpDataSource::new(config);

    let response = source.fetch(&DataSourceQuery::new()).await.unwrap();
    assert_eq!(response.len(), 2);
    assert_eq!(response.total, 7);
    assert_eq!(server.last().api_key.as_deref(), Some("k-123"));
    assert_eq!(server.last().uri, "/items");
}

#[tokio::test]
async fn test_basic_auth_and_bare_array() {
    let (base, server) = serve().await;
    let config = HttpSourceConfig::new(format!("{}/bare", base)).auth(AuthScheme::Basic {
        username: "ada".to_string(),
        password: "lovelace".to_string(),
    });
    let source: HttpDataSource<User> = HttpDataSource::new(config);

    let response = source.fetch(&DataSourceQuery::new()).await.unwrap();
    assert_eq!(response.total, 2);
    // base64("ada:lovelace")
    assert_eq!(server.last().authorization.as_deref(), Some("Basic YWRhOmxvdmVsYWNl"));
}

#[tokio::test]
async fn test_error_status_maps_to_backend_error() {
    let (base, _server) = serve().await;
    let source: HttpDataSource<User> = HttpDataSource::new(HttpSourceConfig::new(format!("{}/forbidden", base)));

    let err = source.fetch(&DataSourceQuery::new()).await.unwrap_err();
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(err.error_code(), Some("E_AUTH"));
    assert_eq!(err.to_string(), "Backend error: no access");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_missing_data_key_is_parse_error() {
    let (base, _server) = serve().await;
    let source: HttpDataSource<User> = HttpDataSource::new(HttpSourceConfig::new(format!("{}/broken", base)));

    let err = source.fetch(&DataSourceQuery::new()).await.unwrap_err();
    assert!(matches!(err, DataSourceError::Parse { body: Some(_), .. }));
}

#[tokio::test]
async fn test_timeout() {
    let (base, _server) = serve().await;
    let source: HttpDataSource<User> = HttpDataSource::new(
        HttpSourceConfig::new(format!("{}/slow", base)).timeout(Duration::from_millis(50)),
    );

    let err = source.fetch(&DataSourceQuery::new()).await.unwrap_err();
    assert!(matches!(err, DataSourceError::Timeout(t) if t == Duration::from_millis(50)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_retry_recovers_from_unavailable() {
    let (base, server) = serve().await;
    let source = BaseDataSource::new(
        HttpDataSource::<User>::new(HttpSourceConfig::new(format!("{}/flaky", base))),
        BaseDataSourceConfig::default()
            .retry(RetryPolicy::default().delay(Duration::from_millis(5)))
            .should_retry(DataSourceError::is_retryable),
    );

    let response = source.fetch(&DataSourceQuery::new()).await.unwrap();
    assert_eq!(response.total, 2);
    assert_eq!(server.flaky_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_bare_array_pages_without_total() {
    let (base, _server) = serve().await;
    let source: HttpDataSource<User> = HttpDataSource::new(HttpSourceConfig::new(format!("{}/paged", base)));

    let first = source.fetch(&DataSourceQuery::new().page(0, 2)).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first.page_count, None);
    assert_eq!(first.has_next_page, Some(true));
    assert_eq!(first.has_prev_page, Some(false));

    let last = source.fetch(&DataSourceQuery::new().page(1, 2)).await.unwrap();
    assert_eq!(last.data, vec![User { id: 3, name: "Barbara".to_string() }]);
    assert_eq!(last.total, 3);
    assert_eq!(last.has_next_page, Some(false));
    assert_eq!(last.has_prev_page, Some(true));
}

#[tokio::test]
async fn test_export_walks_pages_without_total() {
    let (base, server) = serve().await;
    let source = BaseDataSource::new(
        HttpDataSource::<User>::new(HttpSourceConfig::new(format!("{}/paged", base))),
        BaseDataSourceConfig::default().export_batch_size(2),
    );

    let output = source.export(&DataSourceQuery::new(), ExportFormat::Json).await.unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.bytes).unwrap();
    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "name": "Ada"}),
            json!({"id": 2, "name": "Grace"}),
            json!({"id": 3, "name": "Barbara"}),
        ]
    );

    let requested: Vec<String> = server.seen.lock().unwrap().iter().map(|s| s.uri.clone()).collect();
    assert_eq!(requested, vec!["/paged?limit=2&offset=0", "/paged?limit=2&offset=2"]);
}
