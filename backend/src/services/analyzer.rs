use crate::config::PipelineConfig;
use crate::models::{
    ChannelStats, EngagementStats, Insights, SentimentDistribution, TrendingVideo, VideoRecord,
};
use crate::utils::compare_desc_float;
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use vader_sentiment::SentimentIntensityAnalyzer;

const VIEW_WEIGHT: f64 = 0.5;
const LIKE_WEIGHT: f64 = 2.0;
const COMMENT_WEIGHT: f64 = 3.0;
const MAX_PHRASE_WORDS: usize = 3;

lazy_static! {
    // A word, or a single punctuation/symbol character that breaks a phrase.
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}\p{M}'’]*|[^\p{L}\p{N}\p{M}\s]")
        .expect("token regex is valid");
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
        "been", "before", "being", "best", "but", "by", "can", "could", "did", "do", "does",
        "for", "from", "full", "get", "got", "had", "has", "have", "he", "her", "here", "his",
        "how", "hd", "i", "if", "in", "into", "is", "it", "its", "just", "latest", "let", "me",
        "more", "most", "my", "new", "no", "not", "now", "of", "official", "on", "one", "or",
        "our", "out", "over", "part", "shorts", "short", "so", "some", "than", "that", "the",
        "their", "them", "then", "there", "these", "they", "this", "those", "to", "too", "top",
        "up", "us", "very", "video", "videos", "was", "we", "were", "what", "when", "which",
        "who", "why", "will", "with", "would", "you", "your", "4k", "she", "don't", "doesn't",
        "didn't", "isn't", "aren't", "wasn't", "weren't", "can't", "won't", "couldn't",
        "shouldn't", "i'm", "i've", "i'll", "i'd", "you're", "you've", "you'll", "we're",
        "we've", "we'll", "they're", "they've", "he'll", "she'll",
    ]
    .into_iter()
    .collect();
}

pub fn engagement_score(video: &VideoRecord) -> f64 {
    video.view_count as f64 * VIEW_WEIGHT
        + video.like_count as f64 * LIKE_WEIGHT
        + video.comment_count as f64 * COMMENT_WEIGHT
}

/// Frequency-ranked key phrases. Phrases are runs of non-stop-words broken by
/// punctuation and newlines, at most three words long. Ties keep first-seen order.
pub fn extract_key_topics(text: &str, top_n: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    let mut record = |words: &mut Vec<String>| {
        for chunk in words.chunks(MAX_PHRASE_WORDS) {
            let phrase = chunk.join(" ");
            let next_order = counts.len();
            counts.entry(phrase).or_insert((0, next_order)).0 += 1;
        }
        words.clear();
    };

    for line in text.lines() {
        let mut run: Vec<String> = Vec::new();
        for token in TOKEN.find_iter(line) {
            let word = token.as_str().to_lowercase().replace('’', "'");
            // Possessives count as their stem, so "it's" meets the stop word "it".
            let word = match word.strip_suffix("'s") {
                Some(stem) if !stem.is_empty() => stem.to_string(),
                _ => word,
            };
            let is_word = word.chars().next().is_some_and(char::is_alphanumeric);
            let keep = is_word
                && word.chars().count() > 1
                && !word.chars().all(|c| c.is_ascii_digit())
                && !STOP_WORDS.contains(word.as_str());
            if keep {
                run.push(word);
            } else {
                record(&mut run);
            }
        }
        record(&mut run);
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(top_n).map(|(phrase, _)| phrase).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Runs sentiment, engagement, theme and channel analysis over one batch of videos.
pub struct YouTubeAnalyzer {
    videos: Vec<VideoRecord>,
    insights: Insights,
    positive_threshold: f64,
    negative_threshold: f64,
    min_engagement: i64,
}

impl YouTubeAnalyzer {
    pub fn new(videos: Vec<VideoRecord>, config: &PipelineConfig) -> Self {
        YouTubeAnalyzer {
            videos,
            insights: Insights::default(),
            positive_threshold: config.sentiment_threshold_positive,
            negative_threshold: config.sentiment_threshold_negative,
            min_engagement: config.min_engagement_threshold,
        }
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn analyze_sentiment(&mut self) {
        info!("Performing sentiment analysis");
        let analyzer = SentimentIntensityAnalyzer::new();

        for video in self.videos.iter_mut() {
            let scores = analyzer.polarity_scores(&video.sentiment_text());
            let score = |key: &str| scores.get(key).copied().unwrap_or(0.0);
            video.compound_sentiment = Some(score("compound"));
            video.positive = Some(score("pos"));
            video.negative = Some(score("neg"));
            video.neutral = Some(score("neu"));
        }
    }

    pub fn identify_trending_videos(&mut self, top_n: usize) -> Vec<TrendingVideo> {
        info!("Identifying trending videos");

        for video in self.videos.iter_mut() {
            video.engagement_score = Some(engagement_score(video));
        }

        let mut trending: Vec<&VideoRecord> = self
            .videos
            .iter()
            .filter(|v| v.comment_count >= self.min_engagement)
            .collect();
        trending.sort_by(|a, b| {
            compare_desc_float(
                a.engagement_score.unwrap_or(0.0),
                b.engagement_score.unwrap_or(0.0),
            )
        });

        let trending: Vec<TrendingVideo> = trending
            .into_iter()
            .take(top_n)
            .map(|v| TrendingVideo {
                title: v.title.clone(),
                channel_title: v.channel_title.clone(),
                view_count: v.view_count,
                engagement_score: v.engagement_score.unwrap_or(0.0),
            })
            .collect();

        self.insights.trending_videos = trending.clone();
        trending
    }

    pub fn analyze_engagement(&mut self) -> EngagementStats {
        info!("Analyzing engagement metrics");

        let views: Vec<f64> = self.videos.iter().map(|v| v.view_count as f64).collect();
        let likes: Vec<f64> = self.videos.iter().map(|v| v.like_count as f64).collect();
        let comments: Vec<f64> = self.videos.iter().map(|v| v.comment_count as f64).collect();
        let rates: Vec<f64> = self
            .videos
            .iter()
            .filter(|v| v.view_count > 0)
            .map(|v| (v.like_count + v.comment_count) as f64 / v.view_count as f64)
            .collect();

        let stats = EngagementStats {
            avg_views: mean(&views),
            median_views: median(&views),
            avg_likes: mean(&likes),
            avg_comments: mean(&comments),
            engagement_rate: mean(&rates),
        };

        self.insights.engagement_stats = stats.clone();
        stats
    }

    pub fn analyze_sentiment_distribution(&mut self) -> SentimentDistribution {
        info!("Analyzing sentiment distribution");

        let scores: Vec<f64> = self
            .videos
            .iter()
            .map(|v| v.compound_sentiment.unwrap_or(0.0))
            .collect();
        let positive = scores.iter().filter(|s| **s > self.positive_threshold).count();
        let negative = scores.iter().filter(|s| **s < self.negative_threshold).count();

        let distribution = SentimentDistribution {
            positive,
            negative,
            neutral: scores.len() - positive - negative,
            avg_sentiment: mean(&scores),
        };

        self.insights.sentiment_distribution = distribution.clone();
        distribution
    }

    pub fn extract_industry_themes(&mut self) -> Vec<String> {
        info!("Extracting industry themes");

        let titles: Vec<&str> = self.videos.iter().map(|v| v.title.as_str()).collect();
        let themes = extract_key_topics(&titles.join("\n"), 15);

        self.insights.industry_themes = themes.clone();
        themes
    }

    pub fn get_channel_insights(&mut self, top_n: usize) -> Vec<ChannelStats> {
        info!("Analyzing top channels");

        let mut by_channel: HashMap<&str, ChannelStats> = HashMap::new();
        for video in &self.videos {
            let entry = by_channel
                .entry(video.channel_title.as_str())
                .or_insert_with(|| ChannelStats {
                    channel_title: video.channel_title.clone(),
                    video_count: 0,
                    total_views: 0,
                    total_likes: 0,
                    total_comments: 0,
                });
            entry.video_count += 1;
            entry.total_views += video.view_count;
            entry.total_likes += video.like_count;
            entry.total_comments += video.comment_count;
        }

        let mut channels: Vec<ChannelStats> = by_channel.into_values().collect();
        channels.sort_by(|a, b| {
            b.total_views
                .cmp(&a.total_views)
                .then_with(|| a.channel_title.cmp(&b.channel_title))
        });
        channels.truncate(top_n);

        self.insights.top_channels = channels.clone();
        channels
    }

    pub fn run_full_analysis(&mut self) -> Insights {
        info!("Running full analysis pipeline");

        self.analyze_sentiment();
        self.identify_trending_videos(10);
        self.analyze_engagement();
        self.analyze_sentiment_distribution();
        self.extract_industry_themes();
        self.get_channel_insights(10);

        info!("Analysis complete");
        self.insights.clone()
    }

    pub fn into_parts(self) -> (Vec<VideoRecord>, Insights) {
        (self.videos, self.insights)
    }
}
