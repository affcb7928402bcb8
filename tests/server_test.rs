//! 服务器版本检查与验证码

mod common;

use common::MockServer;
use notify_forwarders::api::{APP_NAME, SERVER_VERSION_REQUIRED};
use notify_forwarders::{DispatchClient, DispatchError};

#[tokio::test]
async fn test_check_server_version() {
    let server = MockServer::start().await;
    let client = DispatchClient::new().unwrap();

    let version = client.check_server_version(&server.addr).await.unwrap();
    assert_eq!(version, SERVER_VERSION_REQUIRED);

    let requests = server.requests_to("/api/version");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
}

#[tokio::test]
async fn test_version_check_without_server() {
    let client = DispatchClient::new().unwrap();
    let err = client.check_server_version("  ").await.unwrap_err();
    assert_eq!(err, DispatchError::NotConfigured);
}

#[tokio::test]
async fn test_verification_code_notification() {
    let server = MockServer::start().await;
    let client = DispatchClient::new().unwrap();

    let code = client.send_verification_code(&server.addr, "desk").await.unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let requests = server.requests_to("/api/notify");
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert_eq!(body["appname"], APP_NAME);
    assert_eq!(body["devicename"], "desk");
    assert!(body["description"].as_str().unwrap().contains(&code));
}

#[tokio::test]
async fn test_status_error_keeps_body() {
    let server = MockServer::start().await;
    server.respond_with(404, "not here");
    let client = DispatchClient::new().unwrap();

    let err = client.check_server_version(&server.addr).await.unwrap_err();
    assert_eq!(
        err,
        DispatchError::Status {
            status: 404,
            body: "not here".to_string(),
        }
    );
    assert!(!err.is_transient());
}
