use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use programmes::error::AppError;
use programmes::vle::{VleClient, VleConfig, VleHttpClient};

fn client_for(server: &MockServer, enrolments: bool) -> VleHttpClient {
    let config = VleConfig {
        vle_root: server.uri(),
        sync_path: "/local/programmes/sync.php".to_string(),
        enrolments_url: enrolments.then(|| format!("{}/local/programmes/enrolments.php", server.uri())),
    };
    VleHttpClient::new(config).expect("Failed to build client")
}

#[tokio::test]
async fn test_fetch_snapshot_parses_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/local/programmes/sync.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "vle_course_id": "001",
            "fullname": "How to make a lantern",
            "credits": "20",
            "scheduled": [{
                "vle_course_id": "001/01",
                "fullname": "How to gather wood",
                "startdate": "2015-02-01",
                "groups": [{"vle_group_id": "A", "name": "Group A"}]
            }]
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server, false).fetch_snapshot().await.expect("Fetch failed");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].vle_course_id, "001");
    assert_eq!(items[0].credits, Some(20));
    let scheduled = items[0].scheduled.as_ref().expect("scheduled list");
    assert_eq!(scheduled[0].groups.as_ref().map(|g| g.len()), Some(1));
}

#[tokio::test]
async fn test_fetch_snapshot_surfaces_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/local/programmes/sync.php"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errorMessage": "Invalid token"})),
        )
        .mount(&server)
        .await;

    let result = client_for(&server, false).fetch_snapshot().await;

    match result {
        Err(AppError::Upstream(message)) => assert_eq!(message, "Invalid token"),
        other => panic!("Expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_snapshot_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/local/programmes/sync.php"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server, false).fetch_snapshot().await;

    match result {
        Err(AppError::Upstream(message)) => assert!(message.contains("500"), "{}", message),
        other => panic!("Expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_snapshot_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/local/programmes/sync.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
        .mount(&server)
        .await;

    let result = client_for(&server, false).fetch_snapshot().await;
    assert!(matches!(result, Err(AppError::Upstream(_))));
}

#[tokio::test]
async fn test_fetch_enrolments_sends_username_and_role() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/local/programmes/enrolments.php"))
        .and(query_param("username", "student.1"))
        .and(query_param("role", "student"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "courses": [{"masteridnumber": "it001", "idnumber": "it001/2026", "fullname": "IT"}],
            "module_completions": {"it001": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = client_for(&server, true)
        .fetch_enrolments("student.1", "student")
        .await
        .expect("Fetch failed");

    assert_eq!(snapshot.courses.len(), 1);
    assert_eq!(snapshot.courses[0].masteridnumber, "it001");
    assert_eq!(snapshot.courses[0].extra.get("fullname"), Some(&json!("IT")));
    assert_eq!(snapshot.module_completions.get("it001"), Some(&json!(true)));
}

#[tokio::test]
async fn test_fetch_enrolments_refusal_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/local/programmes/enrolments.php"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let snapshot = client_for(&server, true)
        .fetch_enrolments("nobody", "student")
        .await
        .expect("Fetch failed");

    assert!(snapshot.courses.is_empty());
    assert!(snapshot.module_completions.is_empty());
}

#[tokio::test]
async fn test_fetch_enrolments_without_url_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let snapshot = client_for(&server, false)
        .fetch_enrolments("student.1", "student")
        .await
        .expect("Fetch failed");

    assert!(snapshot.courses.is_empty());
}
