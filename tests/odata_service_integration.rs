use odata_demo_rust::config::AppConfig;
use odata_demo_rust::handlers::AppState;
use odata_demo_rust::routes::create_router;
use odata_demo_rust::{build_app, build_state};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

// Test client wrapper for making API calls. Keeps cookies so every request
// after the first one stays in the same session.
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::builder().cookie_store(true).build().unwrap(),
            base_url,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn patch(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .patch(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .put(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self.get(path).await.expect("request failed");
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

/// Serves the app on an ephemeral port and returns its base URL.
async fn spawn_server() -> String {
    let app = build_app(&AppConfig::default()).expect("failed to build app");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", address)
}

/// Like `spawn_server`, but also hands back the shared state for inspection.
async fn spawn_server_with_state() -> (String, AppState) {
    let state = build_state(&AppConfig::default()).expect("failed to build state");
    let app = create_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", address), state)
}

fn names(body: &Value) -> Vec<String> {
    body["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["Name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_and_service_document() {
    let client = TestClient::new(spawn_server().await);

    let (status, body) = client.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = client.get("/odata").await.unwrap();
    assert!(response.headers().get("set-cookie").is_some());
    let body: Value = response.json().await.unwrap();
    let sets: Vec<&str> = body["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(sets, vec!["Products", "Categories", "Suppliers"]);
}

#[tokio::test]
async fn test_read_paths() {
    let client = TestClient::new(spawn_server().await);

    let (status, body) = client.get_json("/odata/Products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["@odata.context"], "$metadata#Products");
    assert_eq!(body["value"].as_array().unwrap().len(), 6);

    let (status, body) = client.get_json("/odata/Products(1)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["@odata.context"], "$metadata#Products/$entity");
    assert_eq!(body["@odata.id"], "Products(1)");
    assert_eq!(body["Name"], "Notebook Basic 15");

    let (_, body) = client.get_json("/odata/Categories(1)/Products").await;
    assert_eq!(names(&body), vec!["Notebook Basic 15", "Notebook Professional 17"]);

    let (_, body) = client.get_json("/odata/Products(3)/Category").await;
    assert_eq!(body["Name"], "Organizers");

    let (_, body) = client.get_json("/odata/Suppliers(SupplierID=6)/Address").await;
    assert_eq!(body["@odata.context"], "$metadata#Suppliers(6)/Address");
    assert_eq!(body["value"], json!({"City": "Zürich", "Country": "Switzerland"}));

    let (_, body) = client.get_json("/odata/Products(1)/Suppliers").await;
    let ids: Vec<&str> = body["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["@odata.id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["Suppliers(1)", "Suppliers(2)"]);

    let response = client.get("/odata/Suppliers(1)/Fax").await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_error_mapping() {
    let client = TestClient::new(spawn_server().await);

    let (status, body) = client.get_json("/odata/Products(999)").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NotFound");

    let (status, body) = client.get_json("/odata/Products(1)/Category/Products").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], "UnsupportedPath");

    let (status, _) = client.get_json("/odata/Products(ID=)").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client.get_json("/odata/Widgets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_write_workflow_stays_in_session() {
    let base_url = spawn_server().await;
    let client = TestClient::new(base_url.clone());

    let response = client
        .post(
            "/odata/Products",
            json!({"Name": "Desk Lamp", "Description": "LED", "CategoryID": 3}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/odata/Products(7)"
    );
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["ID"], 7);

    let response = client
        .patch("/odata/Products(7)", json!({"Name": "Floor Lamp"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (_, body) = client.get_json("/odata/Products(7)").await;
    assert_eq!(body["Name"], "Floor Lamp");
    assert_eq!(body["Description"], "LED");

    let response = client
        .put("/odata/Products(7)", json!({"Name": "Lamp"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (_, body) = client.get_json("/odata/Products(7)").await;
    assert_eq!(body["Description"], Value::Null);

    // Replace cleared CategoryID, so the lamp no longer shows up under Monitors
    let (_, body) = client.get_json("/odata/Categories(3)/Products").await;
    assert_eq!(names(&body), vec!["Ergo Screen", "Flat Basic"]);

    let response = client.delete("/odata/Products(7)").await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (status, _) = client.get_json("/odata/Products(7)").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Another client gets its own untouched copy of the data
    let stranger = TestClient::new(base_url);
    let response = stranger.delete("/odata/Products(1)").await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (status, _) = client.get_json("/odata/Products(1)").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_payload_is_rejected() {
    let client = TestClient::new(spawn_server().await);
    let response = client
        .post("/odata/Products", json!({"Name": 42}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "InvalidRequest");
}

#[tokio::test]
async fn test_failed_first_request_still_binds_session() {
    let (base_url, state) = spawn_server_with_state().await;
    let client = TestClient::new(base_url);

    let response = client.get("/odata/Products(999)").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let cookie = response.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("ODATA_SESSION="));

    for _ in 0..2 {
        let response = client.get("/odata/Products(999)").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("set-cookie").is_none());
    }
    assert_eq!(state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_malformed_json_body_gets_error_envelope() {
    let (base_url, state) = spawn_server_with_state().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/odata/Products", base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("set-cookie").is_some());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "InvalidRequest");

    let response = client
        .patch(format!("{}/odata/Products(1)", base_url))
        .body("Name=Lamp")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "InvalidRequest");

    assert_eq!(state.sessions.len().await, 2);
}
