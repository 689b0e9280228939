use crate::AppState;
use anyhow::{Context, Result};
use env_logger::{Builder, Env};
use lazy_static::lazy_static;
use log::info;
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

pub const DEFAULT_SEARCH_QUERY: &str = "Shivji trending videos";
pub const DEFAULT_REPORT_TITLE: &str = "Shivji Trending Videos Analysis Report";
pub const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Hard cap the search and videos endpoints place on `maxResults` / id batches.
pub const API_PAGE_LIMIT: usize = 50;

lazy_static! {
    pub static ref YOUTUBE_API_KEY: Option<String> = non_empty_var("YOUTUBE_API_KEY");
    pub static ref GMAIL_SENDER_EMAIL: Option<String> = non_empty_var("GMAIL_SENDER_EMAIL");
    pub static ref GMAIL_APP_PASSWORD: Option<String> = non_empty_var("GMAIL_APP_PASSWORD");
    pub static ref GMAIL_RECIPIENT: Option<String> = non_empty_var("GMAIL_RECIPIENT");
    pub static ref SEARCH_QUERY: String =
        env::var("SEARCH_QUERY").unwrap_or_else(|_| DEFAULT_SEARCH_QUERY.to_string());
    pub static ref REPORT_TITLE: String =
        env::var("REPORT_TITLE").unwrap_or_else(|_| DEFAULT_REPORT_TITLE.to_string());
    pub static ref YOUTUBE_REGION: Option<String> = non_empty_var("YOUTUBE_REGION");
    pub static ref API_BASE_URL: String =
        env::var("YOUTUBE_API_BASE_URL").unwrap_or_else(|_| YOUTUBE_API_BASE_URL.to_string());
    pub static ref DATA_DIR: PathBuf =
        PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    pub static ref REPORTS_DIR: PathBuf =
        PathBuf::from(env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string()));
    pub static ref CHART_FONT_PATH: Option<PathBuf> =
        non_empty_var("CHART_FONT_PATH").map(PathBuf::from);
    pub static ref ALLOWED_ORIGIN: String =
        env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".to_string());
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting YouTube trend report...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

/// Everything a pipeline run needs. Built from the environment in production,
/// constructed directly in tests.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub search_query: String,
    pub max_videos_per_search: usize,
    pub days_back: i64,
    pub region_code: Option<String>,

    pub sentiment_threshold_positive: f64,
    pub sentiment_threshold_negative: f64,
    pub min_engagement_threshold: i64,

    pub db_path: PathBuf,
    pub csv_export_path: PathBuf,
    pub transcripts_path: PathBuf,

    pub report_title: String,
    pub report_output_path: PathBuf,
    pub chart_font_path: Option<PathBuf>,

    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: Option<String>,
    pub app_password: Option<String>,
    pub default_recipient: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_dirs(PathBuf::from("data"), PathBuf::from("reports"))
    }
}

impl PipelineConfig {
    /// Defaults rooted at the given data and report directories.
    pub fn with_dirs(data_dir: PathBuf, reports_dir: PathBuf) -> Self {
        PipelineConfig {
            api_key: None,
            api_base_url: YOUTUBE_API_BASE_URL.to_string(),
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            max_videos_per_search: API_PAGE_LIMIT,
            days_back: 30,
            region_code: None,
            sentiment_threshold_positive: 0.05,
            sentiment_threshold_negative: -0.05,
            min_engagement_threshold: 100,
            db_path: data_dir.join("youtube_data.db"),
            csv_export_path: data_dir.join("videos.csv"),
            transcripts_path: data_dir.join("transcripts"),
            report_title: DEFAULT_REPORT_TITLE.to_string(),
            report_output_path: reports_dir,
            chart_font_path: None,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender_email: None,
            app_password: None,
            default_recipient: None,
        }
    }

    pub fn from_env() -> Self {
        PipelineConfig {
            api_key: YOUTUBE_API_KEY.clone(),
            api_base_url: API_BASE_URL.clone(),
            search_query: SEARCH_QUERY.clone(),
            region_code: YOUTUBE_REGION.clone(),
            report_title: REPORT_TITLE.clone(),
            chart_font_path: CHART_FONT_PATH.clone(),
            sender_email: GMAIL_SENDER_EMAIL.clone(),
            app_password: GMAIL_APP_PASSWORD.clone(),
            default_recipient: GMAIL_RECIPIENT.clone(),
            ..Self::with_dirs(DATA_DIR.clone(), REPORTS_DIR.clone())
        }
    }

    pub fn charts_path(&self) -> PathBuf {
        self.report_output_path.join("charts")
    }

    pub fn email_configured(&self) -> bool {
        self.sender_email.is_some() && self.app_password.is_some()
    }

    pub fn ensure_directories(&self) -> Result<()> {
        let mut dirs = vec![
            self.transcripts_path.clone(),
            self.report_output_path.clone(),
            self.charts_path(),
        ];
        dirs.extend(self.db_path.parent().map(PathBuf::from));
        dirs.extend(self.csv_export_path.parent().map(PathBuf::from));

        for dir in dirs.into_iter().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn create_app_state(config: PipelineConfig) -> Result<AppState> {
    config.ensure_directories()?;
    Ok(AppState {
        config,
        run_lock: Mutex::new(()),
        last_run: RwLock::new(None),
    })
}

pub fn create_cors() -> Result<rocket_cors::Cors> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&[ALLOWED_ORIGIN.as_str()]))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .allow_credentials(true)
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}
