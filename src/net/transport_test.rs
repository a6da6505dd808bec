use super::*;

#[test]
fn join_url_uses_exactly_one_slash() {
    assert_eq!(join_url("https://api.example/api/", "users/me"), "https://api.example/api/users/me");
    assert_eq!(join_url("https://api.example/api", "/users/me"), "https://api.example/api/users/me");
    assert_eq!(join_url("https://api.example/api//", "blogs/"), "https://api.example/api/blogs/");
}

#[test]
fn response_classification() {
    let ok = ApiResponse { status: 200, body: "{}".into() };
    assert!(ok.is_success());
    assert!(!ok.is_unauthorized());
    assert!(!ok.is_empty());

    let no_content = ApiResponse { status: 204, body: String::new() };
    assert!(no_content.is_success());
    assert!(no_content.is_empty());

    let blank = ApiResponse { status: 200, body: "  \n".into() };
    assert!(blank.is_empty());

    let unauthorized = ApiResponse { status: 401, body: "{}".into() };
    assert!(!unauthorized.is_success());
    assert!(unauthorized.is_unauthorized());
}

#[test]
fn reqwest_transport_takes_base_url_from_config() {
    let config = ClientConfig { api_url: "http://127.0.0.1:9/api/".into(), ..ClientConfig::default() };
    let transport = ReqwestTransport::new(&config).unwrap();
    assert_eq!(transport.base_url(), "http://127.0.0.1:9/api/");
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Port 9 (discard) is closed on loopback in test environments.
    let config = ClientConfig { api_url: "http://127.0.0.1:9/api/".into(), ..ClientConfig::default() };
    let transport = ReqwestTransport::new(&config).unwrap();
    let request = ApiRequest {
        method: Method::GET,
        path: "users/me".into(),
        query: Vec::new(),
        body: None,
        upload: None,
        bearer: None,
    };

    let err = transport.send(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[test]
fn upload_guesses_mime_from_extension() {
    assert_eq!(FileUpload::new("cover.PNG", vec![1]).mime, "image/png");
    assert_eq!(FileUpload::new("a.b.jpeg", vec![1]).mime, "image/jpeg");
    assert_eq!(FileUpload::new("notes", vec![1]).mime, "application/octet-stream");
    assert_eq!(FileUpload::new("cover.png", vec![1]).field, "file");
}

#[test]
fn upload_debug_omits_contents() {
    let rendered = format!("{:?}", FileUpload::new("cover.png", vec![7; 64]));
    assert!(rendered.contains("len: 64"));
    assert!(!rendered.contains("7, 7"));
}
