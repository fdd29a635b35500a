use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use serde_json::Value;
use tablegate_core::{
    bad_gateway, bad_request, internal_server_error, not_found, service_unavailable,
    unauthorized, ErrorBuilder, ErrorCode,
};

#[test]
fn test_builder_sets_standard_fields() {
    let problem = ErrorBuilder::new(ErrorCode::Validation)
        .detail("Column 'foo' does not exist")
        .instance("/api/orders")
        .value("column", "foo")
        .build();

    assert_eq!(problem.status_code, StatusCode::BAD_REQUEST);
    assert_eq!(problem.type_uri(), Some("/probs/bad-request"));
    assert_eq!(problem.title(), Some("Bad Request"));
    assert_eq!(problem.detail(), Some("Column 'foo' does not exist"));
    assert_eq!(problem.instance(), Some("/api/orders"));
    assert_eq!(problem.extension("column").unwrap(), &Value::from("foo"));
    assert_eq!(problem.extension("error_code").unwrap(), &Value::from("VALIDATION_ERROR"));
    assert!(problem.extension("timestamp").is_some());
}

#[test]
fn test_instance_and_detail_omitted_when_not_set() {
    let problem = not_found().build();
    assert!(problem.instance().is_none());
    assert!(problem.detail().is_none());
    assert_eq!(problem.extension("error_code").unwrap(), &Value::from("NOT_FOUND"));
}

#[test]
fn test_detail_overrides_default() {
    let problem = unauthorized().build();
    assert!(problem.detail().unwrap().contains("X-API-Key"));

    let problem = bad_gateway().detail("connection refused").build();
    assert_eq!(problem.detail(), Some("connection refused"));
}

#[test]
fn test_common_builders_status_codes() {
    let cases = [
        (unauthorized(), StatusCode::UNAUTHORIZED),
        (not_found(), StatusCode::NOT_FOUND),
        (bad_request(), StatusCode::BAD_REQUEST),
        (bad_gateway(), StatusCode::BAD_GATEWAY),
        (service_unavailable(), StatusCode::SERVICE_UNAVAILABLE),
        (internal_server_error(), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (builder, status) in cases {
        assert_eq!(builder.code().status(), status);
        assert_eq!(builder.build().status_code, status);
    }
}

#[test]
fn test_value_accepts_serializable_collections() {
    let problem = bad_request().value("columns", vec!["foo", "bar"]).build();
    assert_eq!(problem.extension("columns").unwrap(), &serde_json::json!(["foo", "bar"]));
}

#[tokio::test]
async fn test_problem_serializes_to_json_body() {
    let response = bad_gateway()
        .detail("Query against table 'orders' failed")
        .build()
        .into_response();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.headers()["content-type"],
        tablegate_core::problemdetails::PROBLEM_CONTENT_TYPE
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["title"], "Bad Gateway");
    assert_eq!(body["error_code"], "BACKEND_ERROR");
}
