mod support;

use serde_json::json;
use sheetloc_config::{Credentials, SyncConfig};
use sheetloc_core::SyncError;
use sheetloc_sheets::{HttpSheetsClient, SheetsApi, TokenSource, ValueRender};
use std::time::Duration;
use support::StubServer;

const PRIVATE_KEY: &str = include_str!("fixtures/test_key.pem");

fn client(server: &StubServer) -> HttpSheetsClient {
    HttpSheetsClient::new(
        &server.base_url,
        "sheet-id",
        TokenSource::Static("tok".into()),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn ok(body: serde_json::Value) -> (u16, String) {
    (200, body.to_string())
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

#[test]
fn get_values_requests_the_render_option_and_decodes_cells() {
    let server = StubServer::start(vec![
        ok(json!({"range": "'s'!A1:ZZ2", "values": [["File", "Key"], ["a.json", 3, true]]})),
        ok(json!({"range": "'s'!A1:ZZ1000"})),
    ]);
    let c = client(&server);
    let rows = c.get_values("'s'!A:ZZ", ValueRender::Formula).unwrap();
    assert_eq!(rows, vec![row(&["File", "Key"]), row(&["a.json", "3", "TRUE"])]);
    assert!(c.get_values("'s'!A:ZZ", ValueRender::Formatted).unwrap().is_empty());

    let reqs = server.requests();
    assert_eq!(reqs[0].method, "GET");
    assert_eq!(reqs[0].path(), "/v4/spreadsheets/sheet-id/values/'s'!A:ZZ");
    assert_eq!(reqs[0].query(), "valueRenderOption=FORMULA");
    assert_eq!(reqs[0].header("authorization"), Some("Bearer tok"));
    assert_eq!(reqs[1].query(), "valueRenderOption=FORMATTED_VALUE");
}

#[test]
fn update_values_puts_rows_as_user_entered() {
    let server = StubServer::start(vec![ok(json!({"updatedRows": 2}))]);
    let rows = vec![
        row(&["File", "Key", "Tag", "EN", "ES"]),
        row(&["a.json", "hi", "default", "Hi", "=GOOGLETRANSLATE(D2, \"en\", \"es\")"]),
    ];
    client(&server).update_values("'s'!A1", &rows).unwrap();

    let req = &server.requests()[0];
    assert_eq!(req.method, "PUT");
    assert_eq!(req.path(), "/v4/spreadsheets/sheet-id/values/'s'!A1");
    assert_eq!(req.query(), "valueInputOption=USER_ENTERED");
    assert!(req
        .header("content-type")
        .is_some_and(|v| v.starts_with("application/json")));
    assert_eq!(
        req.json(),
        json!({
            "range": "'s'!A1",
            "majorDimension": "ROWS",
            "values": [
                ["File", "Key", "Tag", "EN", "ES"],
                ["a.json", "hi", "default", "Hi", "=GOOGLETRANSLATE(D2, \"en\", \"es\")"]
            ]
        })
    );
}

#[test]
fn clear_values_posts_to_the_clear_endpoint() {
    let server = StubServer::start(vec![ok(json!({"clearedRange": "'s'!A1:ZZ1000"}))]);
    client(&server).clear_values("'s'!A:ZZ").unwrap();

    let req = &server.requests()[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path(), "/v4/spreadsheets/sheet-id/values/'s'!A:ZZ:clear");
    assert_eq!(req.json(), json!({}));
}

#[test]
fn add_sheet_sends_an_add_sheet_batch_update() {
    let server = StubServer::start(vec![ok(json!({"replies": [{}]}))]);
    client(&server).add_sheet("2024-05-01").unwrap();

    let req = &server.requests()[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path(), "/v4/spreadsheets/sheet-id:batchUpdate");
    assert_eq!(
        req.json(),
        json!({"requests": [{"addSheet": {"properties": {"title": "2024-05-01"}}}]})
    );
}

#[test]
fn spreadsheet_asks_only_for_sheet_properties() {
    let server = StubServer::start(vec![ok(json!({
        "properties": {"title": "i18n"},
        "sheets": [{"properties": {"sheetId": 5, "title": "2024-05-01", "index": 0}}]
    }))]);
    let meta = client(&server).spreadsheet().unwrap();
    assert_eq!(meta.title, "i18n");
    assert_eq!(meta.sheets[0].sheet_id, 5);

    let req = &server.requests()[0];
    assert_eq!(req.method, "GET");
    assert_eq!(req.path(), "/v4/spreadsheets/sheet-id");
    assert_eq!(req.query(), "fields=properties.title%2Csheets.properties");
}

#[test]
fn server_errors_become_remote_unavailable() {
    let server = StubServer::start(vec![(500, json!({"error": {"message": "backend boom"}}).to_string())]);
    let err = client(&server)
        .get_values("'s'!A:ZZ", ValueRender::Formula)
        .unwrap_err();
    match err.downcast_ref::<SyncError>() {
        Some(SyncError::RemoteUnavailable(msg)) => {
            assert!(msg.contains("500"), "{msg}");
            assert!(msg.contains("backend boom"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unreachable_server_is_remote_unavailable() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let c = HttpSheetsClient::new(
        &format!("http://{addr}"),
        "sheet-id",
        TokenSource::Static("tok".into()),
        Duration::from_secs(2),
    )
    .unwrap();
    let err = c.spreadsheet().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::RemoteUnavailable(_))
    ));
}

fn service_account_config(dir: &std::path::Path, server: &StubServer) -> SyncConfig {
    let key_path = dir.join("sa.json");
    let key = json!({
        "type": "service_account",
        "client_email": "sync@project.iam.gserviceaccount.com",
        "private_key_id": "key-1",
        "private_key": PRIVATE_KEY,
        "token_uri": format!("{}/token", server.base_url),
    });
    std::fs::write(&key_path, key.to_string()).unwrap();
    SyncConfig {
        spreadsheet_id: Some("sheet-id".into()),
        credentials: Some(Credentials::ServiceAccount(key_path)),
        base_url: server.base_url.clone(),
        ..SyncConfig::default()
    }
}

fn form_value<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[test]
fn service_account_token_is_exchanged_once_and_reused() {
    let sheets = json!({"properties": {"title": "i18n"}, "sheets": []});
    let server = StubServer::start(vec![
        ok(json!({"access_token": "sa-1", "expires_in": 3600, "token_type": "Bearer"})),
        ok(sheets.clone()),
        ok(sheets),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let c = HttpSheetsClient::from_config(&service_account_config(dir.path(), &server)).unwrap();
    c.spreadsheet().unwrap();
    c.spreadsheet().unwrap();

    let reqs = server.requests();
    assert_eq!(reqs.len(), 3);
    assert_eq!(reqs[0].method, "POST");
    assert_eq!(reqs[0].path(), "/token");
    assert_eq!(
        form_value(&reqs[0].body, "grant_type"),
        Some("urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
    );
    let assertion = form_value(&reqs[0].body, "assertion").unwrap();
    assert_eq!(assertion.split('.').count(), 3);
    assert_eq!(reqs[1].header("authorization"), Some("Bearer sa-1"));
    assert_eq!(reqs[2].header("authorization"), Some("Bearer sa-1"));
}

#[test]
fn service_account_token_is_renewed_near_expiry() {
    let sheets = json!({"properties": {"title": "i18n"}, "sheets": []});
    let server = StubServer::start(vec![
        ok(json!({"access_token": "sa-1", "expires_in": 60})),
        ok(sheets.clone()),
        ok(json!({"access_token": "sa-2", "expires_in": 3600})),
        ok(sheets),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let c = HttpSheetsClient::from_config(&service_account_config(dir.path(), &server)).unwrap();
    c.spreadsheet().unwrap();
    c.spreadsheet().unwrap();

    let reqs = server.requests();
    let paths: Vec<&str> = reqs.iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/token", "/v4/spreadsheets/sheet-id", "/token", "/v4/spreadsheets/sheet-id"]);
    assert_eq!(reqs[1].header("authorization"), Some("Bearer sa-1"));
    assert_eq!(reqs[3].header("authorization"), Some("Bearer sa-2"));
}

#[test]
fn rejected_token_exchange_is_remote_unavailable() {
    let server = StubServer::start(vec![(400, json!({"error": "invalid_grant"}).to_string())]);
    let dir = tempfile::tempdir().unwrap();
    let c = HttpSheetsClient::from_config(&service_account_config(dir.path(), &server)).unwrap();
    let err = c.spreadsheet().unwrap_err();
    match err.downcast_ref::<SyncError>() {
        Some(SyncError::RemoteUnavailable(msg)) => assert!(msg.contains("invalid_grant"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.requests().len(), 1);
}
