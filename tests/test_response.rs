use lantern::http::response::{Response, ResponseBuilder, StatusCode};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::NotImplemented.reason_phrase(), "Not Implemented");
}

#[test]
fn test_status_code_server_error() {
    assert!(StatusCode::InternalServerError.is_server_error());
    assert!(StatusCode::NotImplemented.is_server_error());
    assert!(!StatusCode::NotFound.is_server_error());
}

#[test]
fn test_response_builder_basic() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(b"Hello, World!".to_vec())
        .build();

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"Hello, World!".to_vec());
}

#[test]
fn test_response_builder_with_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .header("X-Custom", "value")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.header("Content-Type"), Some("text/plain"));
    assert_eq!(response.header("x-custom"), Some("value"));
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    assert_eq!(response.header("Content-Length"), Some("16"));
}

#[test]
fn test_response_builder_overrides_wrong_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.header("Content-Length"), Some("4"));
    assert_eq!(
        response
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .count(),
        1
    );
}

#[test]
fn test_response_builder_default_content_type() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(vec![0, 1, 2])
        .build();

    assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
}

#[test]
fn test_response_builder_empty_body() {
    let response = ResponseBuilder::new(StatusCode::Ok).build();

    assert_eq!(response.body.len(), 0);
    assert_eq!(response.header("Content-Length"), Some("0"));
    assert_eq!(response.header("Content-Type"), None);
}

#[test]
fn test_response_builder_keeps_insertion_order() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Header1", "value1")
        .header("Header2", "value2")
        .header("Header3", "value3")
        .header("header1", "replaced")
        .body(b"body".to_vec())
        .build();

    let names: Vec<&str> = response.headers.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        names,
        vec!["Header1", "Header2", "Header3", "Content-Type", "Content-Length"]
    );
    assert_eq!(response.header("Header1"), Some("replaced"));
}

#[test]
fn test_response_set_header_cannot_touch_content_length() {
    let mut response = Response::ok("abc", "text/plain");
    response.set_header("content-length", "100");
    response.set_header("Server", "test");

    assert_eq!(response.header("Content-Length"), Some("3"));
    assert_eq!(response.header("Server"), Some("test"));
}

#[test]
fn test_response_ok_helper() {
    let response = Response::ok(b"test content".to_vec(), "text/html; charset=utf-8");

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"test content".to_vec());
    assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
}

#[test]
fn test_response_error_helpers() {
    let cases = vec![
        (Response::bad_request(), StatusCode::BadRequest, "400 Bad Request"),
        (Response::not_found(), StatusCode::NotFound, "404 Not Found"),
        (
            Response::internal_error(),
            StatusCode::InternalServerError,
            "500 Internal Server Error",
        ),
        (Response::not_implemented(), StatusCode::NotImplemented, "501 Not Implemented"),
    ];

    for (response, status, body) in cases {
        assert_eq!(response.status, status);
        assert_eq!(response.body, body.as_bytes());
        assert_eq!(response.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(response.header("Content-Length"), Some(body.len().to_string().as_str()));
    }
}
