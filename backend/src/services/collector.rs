use crate::config::{PipelineConfig, API_PAGE_LIMIT};
use crate::models::VideoRecord;
use crate::services::storage;
use crate::utils::parse_iso8601_duration_to_seconds;
use anyhow::{anyhow, Context, Result};
use chrono::{Duration, SecondsFormat, Utc};
use log::{error, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration as StdDuration;
use url::Url;
use yt_transcript_rs::api::YouTubeTranscriptApi;

const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Pulls search results, statistics and captions from YouTube.
pub struct YouTubeCollector {
    client: Client,
    config: PipelineConfig,
}

impl YouTubeCollector {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(YouTubeCollector { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("YOUTUBE_API_KEY is not configured"))
    }

    /// `{api_base_url}/{name}`, keeping any path prefix on the base.
    pub fn endpoint(&self, name: &str) -> Result<Url> {
        let base = &self.config.api_base_url;
        let mut url =
            Url::parse(base).with_context(|| format!("Invalid YOUTUBE_API_BASE_URL {base}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("YOUTUBE_API_BASE_URL {base} cannot take a path"))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    pub fn search_params(&self, query: &str) -> Result<Vec<(&'static str, String)>> {
        let published_after = (Utc::now() - Duration::days(self.config.days_back))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut params = vec![
            ("q", query.to_string()),
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("key", self.api_key()?.to_string()),
            (
                "maxResults",
                self.config.max_videos_per_search.min(API_PAGE_LIMIT).to_string(),
            ),
            ("publishedAfter", published_after),
            ("order", "relevance".to_string()),
        ];
        if let Some(region) = &self.config.region_code {
            params.push(("regionCode", region.clone()));
        }
        Ok(params)
    }

    /// Documentation: https://developers.google.com/youtube/v3/docs/search/list
    pub async fn search_videos(&self, query: &str) -> Result<Vec<VideoRecord>> {
        info!("Searching YouTube for: {query}");

        let params = self.search_params(query)?;
        let url = self.endpoint("search")?;
        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search request rejected")?
            .json::<Value>()
            .await?;

        let video_ids = parse_search_response(&response);
        info!("Found {} videos", video_ids.len());

        Ok(self.get_video_statistics(&video_ids).await)
    }

    /// Documentation: https://developers.google.com/youtube/v3/docs/videos/list
    pub async fn get_video_statistics(&self, video_ids: &[String]) -> Vec<VideoRecord> {
        let mut videos = Vec::new();
        let Ok(api_key) = self.api_key() else {
            error!("Cannot fetch statistics without YOUTUBE_API_KEY");
            return videos;
        };
        let url = match self.endpoint("videos") {
            Ok(url) => url,
            Err(e) => {
                error!("{e:#}");
                return videos;
            }
        };

        for batch in video_ids.chunks(API_PAGE_LIMIT) {
            let params = [
                ("id", batch.join(",")),
                ("part", "statistics,snippet,contentDetails".to_string()),
                ("key", api_key.to_string()),
            ];

            let response = match self.client.get(url.clone()).query(&params).send().await {
                Ok(r) => r,
                Err(e) => {
                    error!("Failed to get statistics: {e:?}");
                    continue;
                }
            };
            let body = match response.error_for_status() {
                Ok(r) => r.json::<Value>().await,
                Err(e) => {
                    error!("Statistics request rejected: {e}");
                    continue;
                }
            };

            match body {
                Ok(json) => videos.extend(parse_videos_response(&json)),
                Err(e) => error!("Failed to decode statistics response: {e:?}"),
            }
        }

        videos
    }

    pub async fn get_video_transcript(&self, video_id: &str) -> Option<String> {
        let languages = &["en"];

        let api = match YouTubeTranscriptApi::new(None, None, None) {
            Ok(api) => api,
            Err(e) => {
                warn!("Could not create transcript client: {e:?}");
                return None;
            }
        };

        match api.fetch_transcript(video_id, languages, false).await {
            Ok(transcript) => {
                let parts: Vec<String> = transcript
                    .into_iter()
                    .map(|entry| entry.text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
            Err(e) => {
                warn!("Could not get transcript for {video_id}: {e:?}");
                None
            }
        }
    }

    pub async fn collect_full_data(&self, query: &str) -> Result<Vec<VideoRecord>> {
        info!("Starting full data collection pipeline");

        let mut videos = self.search_videos(query).await?;
        info!("Collected statistics for {} videos", videos.len());

        for video in videos.iter_mut() {
            video.transcript = self.get_video_transcript(&video.video_id).await;
            if let Some(text) = &video.transcript {
                save_transcript(&self.config, &video.video_id, text)?;
                info!("Saved transcript for {}", video.video_id);
            }
        }

        storage::export_csv(&self.config.csv_export_path, &videos)?;
        Ok(videos)
    }
}

pub fn save_transcript(config: &PipelineConfig, video_id: &str, text: &str) -> Result<()> {
    std::fs::create_dir_all(&config.transcripts_path)?;
    let path = config.transcripts_path.join(format!("{video_id}.txt"));
    std::fs::write(&path, text)
        .with_context(|| format!("Failed to write transcript {}", path.display()))
}

pub fn parse_search_response(response: &Value) -> Vec<String> {
    response["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"]["videoId"].as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_videos_response(response: &Value) -> Vec<VideoRecord> {
    response["items"]
        .as_array()
        .map(|items| items.iter().map(parse_video_item).collect())
        .unwrap_or_default()
}

fn count_field(value: &Value) -> i64 {
    // The API sends counts as strings; hidden counts are simply absent.
    match value {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

pub fn parse_video_item(item: &Value) -> VideoRecord {
    let snippet = &item["snippet"];
    let statistics = &item["statistics"];
    let duration = item["contentDetails"]["duration"]
        .as_str()
        .unwrap_or("")
        .to_string();

    VideoRecord {
        video_id: item["id"].as_str().unwrap_or("").to_string(),
        title: snippet["title"].as_str().unwrap_or("").to_string(),
        description: snippet["description"].as_str().unwrap_or("").to_string(),
        channel_id: snippet["channelId"].as_str().unwrap_or("").to_string(),
        channel_title: snippet["channelTitle"].as_str().unwrap_or("").to_string(),
        published_at: snippet["publishedAt"].as_str().unwrap_or("").to_string(),
        thumbnail_url: snippet["thumbnails"]["high"]["url"].as_str().map(String::from),
        view_count: count_field(&statistics["viewCount"]),
        like_count: count_field(&statistics["likeCount"]),
        comment_count: count_field(&statistics["commentCount"]),
        duration_seconds: parse_iso8601_duration_to_seconds(&duration),
        duration,
        collected_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        ..Default::default()
    }
}
