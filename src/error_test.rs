use super::*;

#[test]
fn string_detail_is_surfaced_verbatim() {
    let err = ApiError::from_response(400, r#"{"detail":"Email already registered"}"#);
    assert!(matches!(err, ApiError::Server { status: 400, .. }));
    assert_eq!(err.to_string(), "Email already registered");
}

#[test]
fn validation_list_detail_joins_items() {
    let body = r#"{"detail":[
        {"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"},
        {"loc":["body","password"],"msg":"field required","type":"missing"}
    ]}"#;
    let err = ApiError::from_response(422, body);
    assert_eq!(
        err.to_string(),
        "email: value is not a valid email address; password: field required"
    );
}

#[test]
fn nested_object_detail_prefers_message_field() {
    let err = ApiError::from_response(403, r#"{"detail":{"code":"NoAuthoriztion","message":"protected post"}}"#);
    assert_eq!(err.to_string(), "protected post");

    let err = ApiError::from_response(403, r#"{"detail":{"code":"NoAuthoriztion"}}"#);
    assert_eq!(err.to_string(), r#"{"code":"NoAuthoriztion"}"#);
}

#[test]
fn body_without_detail_uses_status_text() {
    let err = ApiError::from_response(400, r#"{"message":"title too long"}"#);
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    assert_eq!(err.to_string(), "API request failed: 400 Bad Request");

    let err = ApiError::from_response(409, r#"{"error":"conflict"}"#);
    assert_eq!(err.to_string(), "API request failed: 409 Conflict");
}

#[test]
fn missing_or_empty_detail_falls_back_to_status_text() {
    for body in ["", "not json", "{}", r#"{"detail":""}"#, r#"{"detail":null}"#, "[1,2]"] {
        let err = ApiError::from_response(500, body);
        assert!(matches!(err, ApiError::Status { status: 500, .. }), "body {body:?}");
        assert_eq!(err.to_string(), "API request failed: 500 Internal Server Error");
    }
}

#[test]
fn unknown_status_code_has_placeholder_reason() {
    let err = ApiError::from_response(599, "");
    assert_eq!(err.to_string(), "API request failed: 599 Unknown Status");
}

#[test]
fn session_expired_message_matches_constant() {
    assert_eq!(ApiError::SessionExpired.to_string(), SESSION_EXPIRED_MESSAGE);
    assert!(ApiError::SessionExpired.is_session_expired());
    assert_eq!(ApiError::SessionExpired.status(), Some(401));
}

#[test]
fn retryable_covers_transport_and_server_side_failures() {
    assert!(ApiError::Transport("connection reset".into()).retryable());
    assert!(ApiError::from_response(503, "").retryable());
    assert!(ApiError::from_response(429, r#"{"detail":"slow down"}"#).retryable());
    assert!(!ApiError::from_response(404, "").retryable());
    assert!(!ApiError::SessionExpired.retryable());
    assert!(!ApiError::Decode("eof".into()).retryable());
}
