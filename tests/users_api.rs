use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use user_management::infrastructure::{config::HttpConfig, memory::MemoryUserStore};

fn server_with(base_path: &str, timestamps: bool) -> TestServer {
    let http = HttpConfig {
        base_path: base_path.to_string(),
        ..HttpConfig::default()
    };
    let store = Arc::new(MemoryUserStore::new(timestamps));
    TestServer::new(user_management::router(store, &http)).unwrap()
}

fn test_server() -> TestServer {
    server_with("/api/users", false)
}

async fn create_ada(server: &TestServer) -> Value {
    let response = server
        .post("/api/users")
        .json(&json!({"name": "Ada", "email": "ada@x.com", "age": 30}))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["newUser"].clone()
}

async fn list(server: &TestServer) -> Vec<Value> {
    let response = server.get("/api/users").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "All users successfully fetched!");
    body["allUsers"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_create_then_list() {
    let server = test_server();

    let response = server
        .post("/api/users")
        .json(&json!({"name": "Ada", "email": "ada@x.com", "age": 30}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["message"], "User added successfully!");
    let user = &body["newUser"];
    assert_eq!(user["_id"].as_str().unwrap().len(), 24);
    assert_eq!(user["name"], "Ada");
    assert_eq!(user["email"], "ada@x.com");
    assert_eq!(user["age"], 30);

    let users = list(&server).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["_id"], user["_id"]);
}

#[tokio::test]
async fn test_list_empty() {
    let server = test_server();
    assert!(list(&server).await.is_empty());
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let server = test_server();
    create_ada(&server).await;

    let response = server
        .post("/api/users")
        .json(&json!({"name": "Other Ada", "email": "ada@x.com", "age": 25}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "CONFLICT");
    assert_eq!(body["code"], 409);

    assert_eq!(list(&server).await.len(), 1);
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let server = test_server();

    let response = server
        .post("/api/users")
        .json(&json!({"name": "Ada", "age": 30}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("email is required"));

    assert!(list(&server).await.is_empty());
}

#[tokio::test]
async fn test_create_coerces_age_and_ignores_extra_fields() {
    let server = test_server();

    let response = server
        .post("/api/users")
        .json(&json!({"name": "Ada", "email": "ada@x.com", "age": "30", "admin": true}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user = &response.json::<Value>()["newUser"];
    assert_eq!(user["age"], 30);
    assert!(user.get("admin").is_none());
}

#[tokio::test]
async fn test_update_changes_only_given_fields() {
    let server = test_server();
    let user = create_ada(&server).await;
    let id = user["_id"].as_str().unwrap();

    let response = server
        .put(&format!("/api/users/{}", id))
        .json(&json!({"age": 31}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "User updated successfully!");
    let updated = &body["updatedUser"];
    assert_eq!(updated["age"], 31);
    assert_eq!(updated["name"], "Ada");
    assert_eq!(updated["email"], "ada@x.com");
    assert_eq!(updated["_id"], user["_id"]);

    let users = list(&server).await;
    assert_eq!(users[0]["age"], 31);
}

#[tokio::test]
async fn test_update_missing_user_returns_404() {
    let server = test_server();

    let response = server
        .put("/api/users/0123456789abcdef01234567")
        .json(&json!({"name": "Ghost", "email": "ghost@x.com", "age": 1}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], "User not found");

    assert!(list(&server).await.is_empty());
}

#[tokio::test]
async fn test_update_to_taken_email_conflicts() {
    let server = test_server();
    create_ada(&server).await;
    let grace = server
        .post("/api/users")
        .json(&json!({"name": "Grace", "email": "grace@x.com", "age": 40}))
        .await
        .json::<Value>()["newUser"]
        .clone();

    let response = server
        .put(&format!("/api/users/{}", grace["_id"].as_str().unwrap()))
        .json(&json!({"email": "ada@x.com"}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_then_repeat() {
    let server = test_server();
    let user = create_ada(&server).await;
    let path = format!("/api/users/{}", user["_id"].as_str().unwrap());

    let response = server.delete(&path).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "User deleted successfully!");
    assert_eq!(body["deletesdUser"]["email"], "ada@x.com");
    assert_eq!(body["deletesdUser"]["age"], 30);

    assert!(list(&server).await.is_empty());

    let response = server.delete(&path).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], "User Not Found!");
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let server = test_server();

    let response = server.delete("/api/users/not-an-id").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "BAD_REQUEST");

    let response = server
        .put("/api/users/not-an-id")
        .json(&json!({"age": 2}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_root_base_path() {
    let server = server_with("/", false);

    let response = server
        .post("/")
        .json(&json!({"name": "Ada", "email": "ada@x.com", "age": 30}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["newUser"]["_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["allUsers"].as_array().unwrap().len(), 1);

    server.delete(&format!("/{}", id)).await.assert_status_ok();
}

#[tokio::test]
async fn test_timestamps_only_when_enabled() {
    let server = server_with("/api/users", true);
    let user = create_ada(&server).await;
    assert!(user["createdAt"].is_string());
    assert!(user["updatedAt"].is_string());

    let server = test_server();
    let user = create_ada(&server).await;
    assert!(user.get("createdAt").is_none());
    assert!(user.get("updatedAt").is_none());
}

#[tokio::test]
async fn test_update_missing_user_with_taken_email_returns_404() {
    let server = test_server();
    create_ada(&server).await;

    let response = server
        .put("/api/users/0123456789abcdef01234567")
        .json(&json!({"email": "ada@x.com"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], "User not found");
    assert_eq!(list(&server).await.len(), 1);
}

#[tokio::test]
async fn test_empty_update_keeps_updated_at() {
    let server = server_with("/api/users", true);
    let user = create_ada(&server).await;
    let path = format!("/api/users/{}", user["_id"].as_str().unwrap());

    for body in [json!({}), json!({"_id": user["_id"].clone(), "nickname": "A"})] {
        let response = server.put(&path).json(&body).await;
        response.assert_status_ok();
        let updated = &response.json::<Value>()["updatedUser"];
        assert_eq!(updated["updatedAt"], user["updatedAt"]);
        assert_eq!(updated["name"], "Ada");
    }
}

#[tokio::test]
async fn test_unparseable_bodies_get_structured_errors() {
    let server = test_server();

    let response = server.post("/api/users").text("name=Ada").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "BAD_REQUEST");
    assert_eq!(body["code"], 400);
    assert!(body["request_id"].is_string());

    let user = create_ada(&server).await;
    let response = server
        .put(&format!("/api/users/{}", user["_id"].as_str().unwrap()))
        .json(&json!([1, 2]))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_boolean_age_is_cast_to_number() {
    let server = test_server();

    let response = server
        .post("/api/users")
        .json(&json!({"name": "Ada", "email": "ada@x.com", "age": true}))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["newUser"]["age"], 1);
}

mod unavailable {
    use super::*;
    use async_trait::async_trait;
    use mongodb::bson::oid::ObjectId;
    use user_management::app::users::{
        model::{NewUser, User, UserPatch},
        store::{StoreError, UserStore},
    };

    /// 始终不可达的存储
    struct DownStore;

    fn down() -> StoreError {
        StoreError::Unavailable("server selection timeout".to_string())
    }

    #[async_trait]
    impl UserStore for DownStore {
        async fn find_all(&self) -> Result<Vec<User>, StoreError> {
            Err(down())
        }
        async fn insert(&self, _user: NewUser) -> Result<User, StoreError> {
            Err(down())
        }
        async fn update(&self, _id: ObjectId, _patch: UserPatch) -> Result<Option<User>, StoreError> {
            Err(down())
        }
        async fn delete(&self, _id: ObjectId) -> Result<Option<User>, StoreError> {
            Err(down())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(down())
        }
        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_store_failures_always_get_a_response() {
        let server =
            TestServer::new(user_management::router(Arc::new(DownStore), &HttpConfig::default()))
                .unwrap();

        let response = server.get("/api/users").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("server selection timeout"));

        let response = server
            .post("/api/users")
            .json(&json!({"name": "Ada", "email": "ada@x.com", "age": 30}))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let response = server
            .delete("/api/users/0123456789abcdef01234567")
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
