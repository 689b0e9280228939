use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;
use std::path::Path;
use yt_trend_report::api::build_rocket;
use yt_trend_report::config::{create_app_state, PipelineConfig};

async fn client(root: &Path) -> Client {
    let config = PipelineConfig::with_dirs(root.join("data"), root.join("reports"));
    let state = create_app_state(config).unwrap();
    Client::tracked(build_rocket(state).unwrap()).await.unwrap()
}

#[rocket::async_test]
async fn status_reports_missing_credentials() {
    let tmp = tempfile::tempdir().unwrap();
    let client = client(tmp.path()).await;

    let response = client.get("/api/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["youtube_api_configured"], false);
    assert_eq!(body["email_configured"], false);
    assert!(body["message"].as_str().unwrap().contains("YOUTUBE_API_KEY"));
}

#[rocket::async_test]
async fn empty_query_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let client = client(tmp.path()).await;

    let response = client
        .post("/api/run")
        .header(ContentType::JSON)
        .body(r#"{"query": "   ", "send_email": false}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "invalid_query");
}

#[rocket::async_test]
async fn failed_run_is_remembered() {
    let tmp = tempfile::tempdir().unwrap();
    let client = client(tmp.path()).await;

    let last: Value = client.get("/api/runs/last").dispatch().await.into_json().await.unwrap();
    assert!(last.is_null());

    let response = client
        .post("/api/run")
        .header(ContentType::JSON)
        .body(r#"{"query": "shiv bhajan"}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let summary: Value = response.into_json().await.unwrap();
    assert_eq!(summary["query"], "shiv bhajan");
    assert_eq!(summary["steps"][0]["step"], "Data Collection");
    assert_eq!(summary["steps"][0]["status"]["status"], "failed");

    let last: Value = client.get("/api/runs/last").dispatch().await.into_json().await.unwrap();
    assert_eq!(last["query"], "shiv bhajan");
}

#[rocket::async_test]
async fn reports_are_listed_and_downloaded() {
    let tmp = tempfile::tempdir().unwrap();
    let client = client(tmp.path()).await;
    let reports = tmp.path().join("reports");
    std::fs::write(reports.join("YouTube_Trends_Report_20261001_090000.pptx"), b"older").unwrap();
    std::fs::write(reports.join("YouTube_Trends_Report_20261019_090000.pptx"), b"newest").unwrap();
    std::fs::write(reports.join("notes.txt"), b"ignored").unwrap();

    let listed: Value = client.get("/api/reports").dispatch().await.into_json().await.unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "YouTube_Trends_Report_20261019_090000.pptx",
            "YouTube_Trends_Report_20261001_090000.pptx"
        ]
    );
    assert_eq!(listed[0]["size_bytes"], 6);

    let download = client
        .get("/api/reports/YouTube_Trends_Report_20261019_090000.pptx")
        .dispatch()
        .await;
    assert_eq!(download.status(), Status::Ok);
    assert_eq!(download.into_bytes().await.unwrap(), b"newest".to_vec());

    let missing = client.get("/api/reports/absent.pptx").dispatch().await;
    assert_eq!(missing.status(), Status::NotFound);

    let wrong_kind = client.get("/api/reports/notes.txt").dispatch().await;
    assert_eq!(wrong_kind.status(), Status::BadRequest);
}
