#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use simplesheet::auth::{AccessToken, Authenticator, Scope};
use simplesheet::transport::{HttpRequest, HttpResponse, Method, Transport};
use simplesheet::{ClientConfig, Result, SheetsClient};

pub const SPREADSHEET_ID: &str = "doc-1";

// =============================================================================
// Mock Transport
// =============================================================================

/// A fake spreadsheet service.
///
/// Loads answer from an in-memory sheet list (400 for unknown titles, like
/// the real service), batch updates apply `addSheet` / `deleteSheet` to that
/// list, and every request is recorded. Batch updates can be held behind a
/// gate to observe what happens while one is in flight.
pub struct MockTransport {
    requests: Mutex<Vec<HttpRequest>>,
    sheets: Mutex<Vec<Value>>,
    next_sheet_id: AtomicI64,
    gate: watch::Sender<bool>,
    fail_batches: AtomicBool,
    batches_in_flight: AtomicUsize,
    max_batches_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let (gate, _) = watch::channel(true);
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            sheets: Mutex::new(Vec::new()),
            next_sheet_id: AtomicI64::new(1000),
            gate,
            fail_batches: AtomicBool::new(false),
            batches_in_flight: AtomicUsize::new(0),
            max_batches_in_flight: AtomicUsize::new(0),
        })
    }

    /// Adds an existing sheet with the given grid size and rows.
    pub fn with_sheet(
        self: Arc<Self>,
        title: &str,
        sheet_id: i64,
        columns: usize,
        rows: usize,
        data: &[&[&str]],
    ) -> Arc<Self> {
        let row_data: Vec<Value> = data
            .iter()
            .map(|row| {
                json!({ "values": row.iter().map(|c| json!({ "userEnteredValue": { "stringValue": c } })).collect::<Vec<_>>() })
            })
            .collect();
        self.sheets.lock().unwrap().push(json!({
            "properties": {
                "title": title,
                "sheetId": sheet_id,
                "index": 0,
                "sheetType": "GRID",
                "gridProperties": { "rowCount": rows, "columnCount": columns }
            },
            "data": [{ "rowData": row_data }]
        }));
        self
    }

    /// Holds batch updates until [`open_gate`](Self::open_gate).
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Bodies of every batch-update call, in order.
    pub fn batch_bodies(&self) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(":batchUpdate"))
            .filter_map(|r| r.body)
            .collect()
    }

    /// Request type names of each batch-update call.
    pub fn batch_names(&self) -> Vec<Vec<String>> {
        self.batch_bodies()
            .iter()
            .map(|body| {
                body["requests"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.as_object()?.keys().next().cloned())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn batches_in_flight(&self) -> usize {
        self.batches_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_batches_in_flight(&self) -> usize {
        self.max_batches_in_flight.load(Ordering::SeqCst)
    }

    pub fn sheet_titles(&self) -> Vec<String> {
        self.sheets
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| s["properties"]["title"].as_str().map(str::to_string))
            .collect()
    }

    fn load(&self, request: &HttpRequest) -> HttpResponse {
        let wanted = request
            .query_value("ranges")
            .map(|r| {
                r.strip_prefix('\'')
                    .and_then(|r| r.strip_suffix('\''))
                    .map(|r| r.replace("''", "'"))
                    .unwrap_or_else(|| r.to_string())
            })
            .unwrap_or_default();
        let sheets = self.sheets.lock().unwrap();
        match sheets.iter().find(|s| s["properties"]["title"] == wanted.as_str()) {
            Some(sheet) => HttpResponse::json(200, &json!({ "sheets": [sheet] })),
            None => HttpResponse::json(
                400,
                &json!({ "error": { "code": 400, "message": format!("Unable to parse range: {wanted}"), "status": "INVALID_ARGUMENT" } }),
            ),
        }
    }

    fn spreadsheet(&self) -> HttpResponse {
        let sheets: Vec<Value> = self
            .sheets
            .lock()
            .unwrap()
            .iter()
            .map(|s| json!({ "properties": s["properties"] }))
            .collect();
        HttpResponse::json(
            200,
            &json!({
                "spreadsheetId": SPREADSHEET_ID,
                "properties": { "title": "Budget", "locale": "en_US", "timeZone": "Europe/Berlin" },
                "spreadsheetUrl": format!("https://docs.example/{SPREADSHEET_ID}"),
                "sheets": sheets
            }),
        )
    }

    fn apply_batch(&self, body: &Value) -> HttpResponse {
        let mut replies = Vec::new();
        let mut sheets = self.sheets.lock().unwrap();
        for item in body["requests"].as_array().into_iter().flatten() {
            if let Some(add) = item.get("addSheet") {
                let id = self.next_sheet_id.fetch_add(1, Ordering::SeqCst);
                let mut properties = add["properties"].clone();
                properties["sheetId"] = json!(id);
                if properties.get("gridProperties").is_none() {
                    properties["gridProperties"] = json!({ "rowCount": 0, "columnCount": 0 });
                }
                sheets.push(json!({ "properties": properties.clone() }));
                replies.push(json!({ "addSheet": { "properties": properties } }));
            } else if let Some(delete) = item.get("deleteSheet") {
                let id = delete["sheetId"].clone();
                sheets.retain(|s| s["properties"]["sheetId"] != id);
                replies.push(json!({}));
            } else {
                replies.push(json!({}));
            }
        }
        HttpResponse::json(200, &json!({ "spreadsheetId": SPREADSHEET_ID, "replies": replies }))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if request.url.ends_with(":batchUpdate") {
            let now = self.batches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_batches_in_flight.fetch_max(now, Ordering::SeqCst);

            let mut gate = self.gate.subscribe();
            let _ = gate.wait_for(|open| *open).await;

            self.batches_in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_batches.load(Ordering::SeqCst) {
                return Ok(HttpResponse::json(
                    503,
                    &json!({ "error": { "code": 503, "message": "The service is currently unavailable.", "status": "UNAVAILABLE" } }),
                ));
            }
            let body = request.body.clone().unwrap_or(Value::Null);
            return Ok(self.apply_batch(&body));
        }

        if request.url.contains("/values/") {
            let range = request.url.rsplit("/values/").next().unwrap_or_default().to_string();
            return Ok(match request.method {
                Method::Put => HttpResponse::json(
                    200,
                    &json!({ "spreadsheetId": SPREADSHEET_ID, "updatedRange": range, "updatedRows": 1, "updatedColumns": 2, "updatedCells": 2 }),
                ),
                _ => HttpResponse::json(
                    200,
                    &json!({ "range": range, "majorDimension": "ROWS", "values": [["a", "b"], ["c"]] }),
                ),
            });
        }

        if request.query_value("fields").is_some() {
            return Ok(self.load(&request));
        }
        Ok(self.spreadsheet())
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// Hands out one fixed bearer token and counts the calls.
pub struct StaticAuthenticator {
    pub token: String,
    pub calls: AtomicUsize,
}

impl StaticAuthenticator {
    pub fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, scope: &Scope) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken {
            access_token: self.token.clone(),
            token_type: "Bearer".to_string(),
            scope: scope.clone(),
            refresh_token: None,
            expiry_date: chrono::Utc::now() + chrono::Duration::hours(1),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub fn client(transport: Arc<MockTransport>) -> Arc<SheetsClient> {
    Arc::new(SheetsClient::new(
        SPREADSHEET_ID,
        StaticAuthenticator::new("test-token"),
        transport,
        ClientConfig::default(),
    ))
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

pub async fn eventually<T>(
    timeout: Duration,
    interval: Duration,
    mut f: impl FnMut() -> Option<T>,
) -> T {
    let start = std::time::Instant::now();
    loop {
        if let Some(v) = f() {
            return v;
        }
        if start.elapsed() > timeout {
            panic!("condition not met within {:?}", timeout);
        }
        tokio::time::sleep(interval).await;
    }
}
