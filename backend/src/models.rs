use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::Responder;
use rocket::{response, Response};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// One collected video. Column order here is the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
    pub thumbnail_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub duration: String, // ISO 8601, e.g. PT4M13S
    pub duration_seconds: i64,
    pub collected_at: String,
    pub transcript: Option<String>,
    pub compound_sentiment: Option<f64>,
    pub positive: Option<f64>,
    pub negative: Option<f64>,
    pub neutral: Option<f64>,
    pub engagement_score: Option<f64>,
}

impl VideoRecord {
    pub fn sentiment_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingVideo {
    pub title: String,
    pub channel_title: String,
    pub view_count: i64,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngagementStats {
    pub avg_views: f64,
    pub median_views: f64,
    pub avg_likes: f64,
    pub avg_comments: f64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub avg_sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelStats {
    pub channel_title: String,
    pub video_count: usize,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Insights {
    pub trending_videos: Vec<TrendingVideo>,
    pub engagement_stats: EngagementStats,
    pub sentiment_distribution: SentimentDistribution,
    pub industry_themes: Vec<String>,
    pub top_channels: Vec<ChannelStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Skipped,
    Failed(String),
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Passed => "PASSED",
            StepStatus::Skipped => "SKIPPED",
            StepStatus::Failed(_) => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSummary {
    pub query: String,
    pub started_at: String,
    pub finished_at: String,
    pub videos_analyzed: usize,
    pub report_path: Option<String>,
    pub steps: Vec<StepResult>,
}

impl RunSummary {
    /// True when every step that ran passed or was skipped, and none halted the run.
    pub fn succeeded(&self) -> bool {
        !self.steps.is_empty()
            && self
                .steps
                .iter()
                .all(|s| !matches!(s.status, StepStatus::Failed(_)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunRequest {
    pub query: String,
    #[serde(default)]
    pub send_email: bool,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiStatus {
    pub youtube_api_configured: bool,
    pub email_configured: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportFile {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl<'r> Responder<'r, 'static> for ErrorResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let json = serde_json::to_string(&self).map_err(|_| Status::InternalServerError)?;
        Response::build()
            .status(Status::BadRequest)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
