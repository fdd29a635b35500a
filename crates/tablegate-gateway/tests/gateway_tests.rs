use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tablegate_gateway::{build_application, AppState, BackendKind, GatewayConfig};
use tablegate_query::{
    ColumnDescriptor, ColumnRef, DataRow, DataSource, FilterClause, NativeType, Operand,
    Operator, OrderBy, QueryError, QueryExecutor, QueryOutput, QueryPlan, Result, SchemaProbe,
    Selection, SortDirection, TableSchema,
};
use tower::ServiceExt;

const KEY: &str = "test-secret";

#[derive(Default)]
struct FakeSource {
    probe_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    last_plan: Mutex<Option<QueryPlan>>,
    fail_execute: bool,
    fail_ping: bool,
    panic_execute: bool,
    execute_delay: Option<Duration>,
}

impl FakeSource {
    fn backend_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst) + self.execute_calls.load(Ordering::SeqCst)
    }

    fn last_plan(&self) -> Option<QueryPlan> {
        self.last_plan.lock().unwrap().clone()
    }
}

fn orders_schema() -> TableSchema {
    TableSchema::new(
        "orders",
        vec![
            ColumnDescriptor::new("id", "bigint", false)
                .with_native_type(NativeType::new(Some("pg_catalog".into()), "int8")),
            ColumnDescriptor::new("status", "text", true)
                .with_native_type(NativeType::new(Some("pg_catalog".into()), "text")),
            ColumnDescriptor::new("created_at", "timestamp with time zone", false)
                .with_native_type(NativeType::new(Some("pg_catalog".into()), "timestamptz")),
        ],
    )
}

fn row(id: i64, status: &str) -> DataRow {
    let mut row = DataRow::new();
    row.insert("id".into(), json!(id));
    row.insert("status".into(), json!(status));
    row
}

#[async_trait]
impl DataSource for FakeSource {
    fn source_type(&self) -> &'static str {
        "fake"
    }

    async fn ping(&self) -> Result<()> {
        if self.fail_ping {
            Err(QueryError::ConnectionFailed("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SchemaProbe for FakeSource {
    async fn probe_schema(&self, table: &str) -> Result<TableSchema> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match table {
            "orders" => Ok(orders_schema()),
            _ => Ok(TableSchema::empty(table)),
        }
    }
}

#[async_trait]
impl QueryExecutor for FakeSource {
    async fn execute(&self, plan: &QueryPlan) -> Result<QueryOutput> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_plan.lock().unwrap() = Some(plan.clone());

        if let Some(delay) = self.execute_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_execute {
            panic!("row decoder state corrupted at 0xdead");
        }
        if self.fail_execute {
            return Err(QueryError::QueryFailed(
                "password authentication failed for user \"reader\"".into(),
            ));
        }

        let total = plan.want_count.then_some(2);
        Ok(QueryOutput::new(
            vec![row(1, "DA_GIAO"), row(2, "DA_GIAO")],
            total,
        ))
    }
}

fn config() -> GatewayConfig {
    let mut config = GatewayConfig::new(
        KEY,
        vec!["orders".into(), "customers".into()],
        BackendKind::Postgres,
    );
    config.database_url = Some("postgres://localhost/app".into());
    config
}

fn app_with(source: Arc<FakeSource>, config: GatewayConfig) -> Router {
    let state = Arc::new(AppState::new(&config, source));
    build_application(state, &config)
}

fn app(source: Arc<FakeSource>) -> Router {
    app_with(source, config())
}

fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, key)
}

fn request(method: Method, uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_missing_or_wrong_key_is_rejected_before_backend() {
    let source = Arc::new(FakeSource::default());

    for key in [None, Some("wrong"), Some(""), Some("test-secret ")] {
        for uri in [
            "/api/orders?status=A",
            "/api/secrets",
            "/api/meta/tables",
            "/api/meta/schema/orders",
        ] {
            let (status, body) = send(app(source.clone()), get(uri, key)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} with {:?}", uri, key);
            assert_eq!(body["error_code"], "UNAUTHORIZED");
        }
    }

    let (status, _) = send(
        app(source.clone()),
        request(Method::DELETE, "/api/meta/schema/orders", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(source.backend_calls(), 0);
}

#[tokio::test]
async fn test_unlisted_tables_are_not_found_whatever_the_parameters() {
    let source = Arc::new(FakeSource::default());

    for uri in [
        "/api/secrets",
        "/api/secrets?foo=bar",
        "/api/secrets?limit=abc&between__x=1",
        "/api/Orders",
        "/api/pg_user?select=*",
        "/api/meta/schema/secrets",
    ] {
        let (status, body) = send(app(source.clone()), get(uri, Some(KEY))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error_code"], "NOT_FOUND");
    }

    let (status, _) = send(
        app(source.clone()),
        request(Method::DELETE, "/api/meta/schema/secrets", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(source.backend_calls(), 0);
}

#[tokio::test]
async fn test_orders_query_compiles_expected_plan() {
    let source = Arc::new(FakeSource::default());

    let (status, body) = send(
        app(source.clone()),
        get(
            "/api/orders?status=DA_GIAO&gt__created_at=2025-01-01&order=created_at&desc=true&limit=10",
            Some(KEY),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table"], "orders");
    assert_eq!(body["returned"], 2);
    assert_eq!(body["count"], Value::Null);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["data"][0]["status"], "DA_GIAO");

    let plan = source.last_plan().unwrap();
    let schema = orders_schema();
    let column = |name: &str| ColumnRef {
        name: name.to_string(),
        native_type: schema.column(name).unwrap().native_type.clone(),
    };

    assert_eq!(plan.selection, Selection::All);
    assert_eq!(
        plan.filters,
        vec![
            FilterClause {
                column: column("status"),
                operator: Operator::Eq,
                operand: Operand::Value("DA_GIAO".into()),
            },
            FilterClause {
                column: column("created_at"),
                operator: Operator::Gt,
                operand: Operand::Value("2025-01-01".into()),
            },
        ]
    );
    assert_eq!(
        plan.order_by,
        Some(OrderBy {
            column: column("created_at"),
            direction: SortDirection::Desc,
        })
    );
    assert_eq!(plan.limit, 10);
    assert_eq!(plan.offset, 0);
}

#[tokio::test]
async fn test_unknown_column_is_a_validation_error() {
    let source = Arc::new(FakeSource::default());

    let (status, body) = send(app(source.clone()), get("/api/orders?foo=bar", Some(KEY))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert_eq!(body["columns"], json!(["foo"]));
    assert!(body["detail"].as_str().unwrap().contains("foo"));
    assert_eq!(source.execute_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_select_lists_columns() {
    let source = Arc::new(FakeSource::default());
    let (status, body) = send(
        app(source),
        get("/api/orders?select=id,nope,gone", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["columns"], json!(["nope", "gone"]));
}

#[tokio::test]
async fn test_bad_operator_and_literal_rejected() {
    let source = Arc::new(FakeSource::default());

    let (status, _) = send(
        app(source.clone()),
        get("/api/orders?between__id=1", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app(source.clone()),
        get("/api/orders?is__status=banana", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["columns"], json!(["status"]));

    assert_eq!(source.execute_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_limit_is_clamped_and_count_reported() {
    let source = Arc::new(FakeSource::default());

    let (status, body) = send(
        app(source.clone()),
        get("/api/orders?limit=5000&offset=-4&count=exact", Some(KEY)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 1000);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_in_list_trailing_comma() {
    let source = Arc::new(FakeSource::default());

    let (status, _) = send(
        app(source.clone()),
        get("/api/orders?in__status=A,B,", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let plan = source.last_plan().unwrap();
    assert_eq!(
        plan.filters[0].operand,
        Operand::List(vec!["A".into(), "B".into()])
    );
}

#[tokio::test]
async fn test_percent_encoded_values_are_decoded() {
    let source = Arc::new(FakeSource::default());

    let (status, _) = send(
        app(source.clone()),
        get("/api/orders?ilike__status=%25giao%25", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        source.last_plan().unwrap().filters[0].operand,
        Operand::Value("%giao%".into())
    );
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway_without_driver_text() {
    let source = Arc::new(FakeSource {
        fail_execute: true,
        ..FakeSource::default()
    });

    let (status, body) = send(app(source), get("/api/orders", Some(KEY))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error_code"], "BACKEND_ERROR");
    assert_eq!(body["table"], "orders");
    assert!(!body["detail"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_backend_failure_detail_exposed_when_configured() {
    let source = Arc::new(FakeSource {
        fail_execute: true,
        ..FakeSource::default()
    });
    let mut config = config();
    config.expose_backend_errors = true;

    let (status, body) = send(app_with(source, config), get("/api/orders", Some(KEY))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_empty_schema_fails_open_by_default() {
    let source = Arc::new(FakeSource::default());

    let (status, _) = send(
        app(source.clone()),
        get("/api/customers?name=Ann", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        source.last_plan().unwrap().filters[0].column,
        ColumnRef::new("name")
    );
}

#[tokio::test]
async fn test_empty_schema_fails_closed_when_strict() {
    let source = Arc::new(FakeSource::default());
    let mut config = config();
    config.strict_schema = true;

    let (status, body) = send(
        app_with(source.clone(), config),
        get("/api/customers?name=Ann", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["columns"], json!(["name"]));
    assert_eq!(source.execute_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_meta_tables_lists_allow_list() {
    let source = Arc::new(FakeSource::default());

    let (status, body) = send(app(source.clone()), get("/api/meta/tables", Some(KEY))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"allowed_tables": ["orders", "customers"], "total": 2})
    );
    assert_eq!(source.backend_calls(), 0);
}

#[tokio::test]
async fn test_meta_schema_matches_probe_and_is_cached() {
    let source = Arc::new(FakeSource::default());
    let state = Arc::new(AppState::new(&config(), source.clone()));
    let app = build_application(state, &config());

    let (status, body) = send(app.clone(), get("/api/meta/schema/orders", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "table": "orders",
            "columns": [
                {"name": "id", "type": "bigint", "nullable": false},
                {"name": "status", "type": "text", "nullable": true},
                {"name": "created_at", "type": "timestamp with time zone", "nullable": false}
            ]
        })
    );

    send(app.clone(), get("/api/orders?status=A", Some(KEY))).await;
    send(app.clone(), get("/api/meta/schema/orders", Some(KEY))).await;
    assert_eq!(source.probe_calls.load(Ordering::SeqCst), 1);

    let (status, body) = send(
        app.clone(),
        request(Method::DELETE, "/api/meta/schema/orders", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"table": "orders", "invalidated": true}));

    send(app.clone(), get("/api/meta/schema/orders", Some(KEY))).await;
    assert_eq!(source.probe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalidate_without_cached_entry() {
    let source = Arc::new(FakeSource::default());
    let (status, body) = send(
        app(source),
        request(Method::DELETE, "/api/meta/schema/customers", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invalidated"], false);
}

#[tokio::test]
async fn test_health_reports_backend_state_without_auth() {
    let (status, body) = send(app(Arc::new(FakeSource::default())), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"ok": true, "database": "connected", "backend": "fake"})
    );

    let failing = Arc::new(FakeSource {
        fail_ping: true,
        ..FakeSource::default()
    });
    let (status, body) = send(app(failing), get("/health", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
    assert_eq!(body["database"], "unreachable");
}

#[tokio::test]
async fn test_root_banner_and_openapi_document() {
    let source = Arc::new(FakeSource::default());

    let (status, body) = send(app(source.clone()), get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "tablegate");

    let (status, body) = send(app(source), get("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/{table}"].is_object());
    assert!(body["components"]["securitySchemes"]["api_key"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_problem_json() {
    let response = app(Arc::new(FakeSource::default()))
        .oneshot(get("/nothing/here", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/orders")
        .header(header::ORIGIN, "https://dashboard.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = app(Arc::new(FakeSource::default()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_unmatched_api_paths_require_key() {
    let source = Arc::new(FakeSource::default());

    for uri in ["/api/meta/schema", "/api/meta/tables/extra", "/api/orders/1"] {
        let (status, body) = send(app(source.clone()), get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error_code"], "UNAUTHORIZED");
    }

    let (status, body) = send(app(source.clone()), get("/api/meta/schema", Some(KEY))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "NOT_FOUND");
    assert!(body["detail"].as_str().unwrap().contains("/api/meta/schema"));

    assert_eq!(source.backend_calls(), 0);
}

#[tokio::test]
async fn test_slow_backend_times_out_as_problem_json() {
    let source = Arc::new(FakeSource {
        execute_delay: Some(Duration::from_secs(10)),
        ..Default::default()
    });
    let mut config = config();
    config.request_timeout_secs = 1;

    let response = app_with(source, config)
        .oneshot(get("/api/orders", Some(KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error_code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_handler_panic_is_internal_problem_without_message() {
    let source = Arc::new(FakeSource {
        panic_execute: true,
        ..Default::default()
    });

    let (status, body) = send(app(source), get("/api/orders", Some(KEY))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"], "INTERNAL_ERROR");
    assert!(!body.to_string().contains("0xdead"));
}
