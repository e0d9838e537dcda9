//! Shared fixtures for pitchdata behavioral tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use pitchdata_core::{HttpClient, HttpError, HttpRequest, HttpResponse};
use pitchdata_warehouse::{Warehouse, WarehouseConfig};

/// In-memory stand-in for the upstream API: URL-keyed canned responses plus a
/// record of every request made.
pub struct FakeUpstream {
    routes: Mutex<HashMap<String, Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub const BASE_URL: &'static str = "https://upstream.test";

    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn stub(&self, path_and_query: &str, response: Result<HttpResponse, HttpError>) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{}/{path_and_query}", Self::BASE_URL), response);
    }

    pub fn stub_json(&self, path_and_query: &str, body: serde_json::Value) {
        self.stub(path_and_query, Ok(HttpResponse::ok_json(body.to_string())));
    }

    pub fn stub_status(&self, path_and_query: &str, status: u16) {
        self.stub(
            path_and_query,
            Ok(HttpResponse {
                status,
                body: String::new(),
            }),
        );
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for FakeUpstream {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().unwrap().push(request.url.clone());
        let response = self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            // Unstubbed endpoints behave like an upstream 404.
            .unwrap_or(Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }));
        Box::pin(async move { response })
    }
}

pub fn temp_warehouse(dir: &tempfile::TempDir) -> Warehouse {
    let home = dir.path().join("pitchdata-home");
    let db_path = home.join("warehouse.duckdb");
    Warehouse::open(WarehouseConfig {
        home,
        db_path,
        max_pool_size: 2,
    })
    .expect("warehouse open")
}
