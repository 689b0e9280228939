use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;
use yt_trend_report::config::PipelineConfig;
use yt_trend_report::services::collector::YouTubeCollector;
use yt_trend_report::services::pipeline::Pipeline;

const FAILING_ID: &str = "vid050";

/// Query strings of every `/videos` call, split into their id lists.
type Batches = Arc<Mutex<Vec<Vec<String>>>>;

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

fn generated_video(id: &str) -> Value {
    json!({
        "id": id,
        "snippet": {
            "publishedAt": "2026-10-10T06:00:00Z",
            "channelId": "UCgen",
            "title": format!("Shiv bhajan {id}"),
            "description": "",
            "channelTitle": "Generated"
        },
        "contentDetails": { "duration": "PT3M" },
        "statistics": { "viewCount": "10", "likeCount": "1", "commentCount": "0" }
    })
}

/// Stand-in for the Data API. `q=broken` fails the search; a batch holding
/// `vid050` fails the statistics call.
fn respond(target: &str, batches: &Batches) -> (&'static str, String) {
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return ("400 Bad Request", "{}".to_string());
    };
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
            .unwrap_or_default()
    };
    if param("key") != "test-key" {
        return ("403 Forbidden", r#"{"error": "bad key"}"#.to_string());
    }

    match url.path() {
        "/youtube/v3/search" if param("q") == "broken" => {
            ("500 Internal Server Error", r#"{"error": "backend"}"#.to_string())
        }
        "/youtube/v3/search" => ("200 OK", fixture("search_response.json")),
        "/youtube/v3/videos" => {
            let ids: Vec<String> = param("id").split(',').map(String::from).collect();
            batches.lock().unwrap().push(ids.clone());
            if ids.iter().any(|id| id == FAILING_ID) {
                return ("500 Internal Server Error", r#"{"error": "backend"}"#.to_string());
            }
            if ids.iter().all(|id| id.starts_with("vid")) {
                let items: Vec<Value> = ids.iter().map(|id| generated_video(id)).collect();
                ("200 OK", json!({ "items": items }).to_string())
            } else {
                ("200 OK", fixture("videos_response.json"))
            }
        }
        _ => ("404 Not Found", "{}".to_string()),
    }
}

async fn handle(mut socket: TcpStream, batches: Batches) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&request);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();

    let (status, body) = respond(&target, &batches);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn start_server() -> (SocketAddr, Batches) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let batches: Batches = Arc::default();
    let shared = batches.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handle(socket, shared.clone()));
        }
    });
    (addr, batches)
}

fn config(root: &Path, addr: SocketAddr) -> PipelineConfig {
    let mut config = PipelineConfig::with_dirs(root.join("data"), root.join("reports"));
    config.api_key = Some("test-key".to_string());
    config.api_base_url = format!("http://{addr}/youtube/v3");
    config
}

#[tokio::test]
async fn search_fetches_statistics_for_found_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let (addr, batches) = start_server().await;
    let collector = YouTubeCollector::new(config(tmp.path(), addr)).unwrap();

    let videos = collector.search_videos("shiva").await.unwrap();

    let ids: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(ids, vec!["k9Xw2mPq1aA", "Zt4Lr8nB0cE", "Qm7Hs3vY5dI"]);
    assert_eq!(videos[0].view_count, 154_321);
    assert_eq!(
        batches.lock().unwrap().clone(),
        vec![vec!["k9Xw2mPq1aA", "Zt4Lr8nB0cE", "Qm7Hs3vY5dI"]]
    );
}

#[tokio::test]
async fn statistics_are_batched_and_failed_batches_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let (addr, batches) = start_server().await;
    let collector = YouTubeCollector::new(config(tmp.path(), addr)).unwrap();
    let ids: Vec<String> = (0..51).map(|i| format!("vid{i:03}")).collect();

    let videos = collector.get_video_statistics(&ids).await;

    let requested = batches.lock().unwrap().clone();
    assert_eq!(requested.len(), 2);
    assert_eq!(requested[0].len(), 50);
    assert_eq!(requested[1], vec![FAILING_ID.to_string()]);

    assert_eq!(videos.len(), 50);
    assert_eq!(videos[0].video_id, "vid000");
    assert_eq!(videos[49].video_id, "vid049");
    assert_eq!(videos[0].duration_seconds, 180);
}

#[tokio::test]
async fn rejected_search_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let (addr, batches) = start_server().await;
    let collector = YouTubeCollector::new(config(tmp.path(), addr)).unwrap();

    assert!(collector.search_videos("broken").await.is_err());
    assert!(batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_search_fails_collection_step() {
    let tmp = tempfile::tempdir().unwrap();
    let (addr, _) = start_server().await;
    let mut pipeline = Pipeline::new(config(tmp.path(), addr));

    let summary = pipeline.run_full_pipeline(false, Some("broken"), None).await;

    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.steps[0].step, "Data Collection");
    assert!(!summary.succeeded());
    assert!(!tmp.path().join("data/videos.csv").exists());
}
