use crate::config::PipelineConfig;
use crate::models::{Insights, RunSummary, StepResult, StepStatus, VideoRecord};
use crate::services::analyzer::YouTubeAnalyzer;
use crate::services::collector::YouTubeCollector;
use crate::services::mailer::EmailSender;
use crate::services::report::{report_filename, ReportGenerator};
use crate::services::storage::{self, VideoStore};
use crate::utils::{format_percent, format_thousands};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

const BANNER: &str = "============================================================";

fn banner(title: &str) {
    info!("{BANNER}");
    info!("{title}");
    info!("{BANNER}");
}

/// Collect, analyze, report and email, in that order. Holds the data handed
/// from one step to the next.
pub struct Pipeline {
    config: PipelineConfig,
    query: String,
    videos: Vec<VideoRecord>,
    insights: Option<Insights>,
    report_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let query = config.search_query.clone();
        Pipeline {
            config,
            query,
            videos: Vec::new(),
            insights: None,
            report_path: None,
        }
    }

    /// Starts from records loaded elsewhere, e.g. a previous CSV export.
    pub fn with_videos(config: PipelineConfig, videos: Vec<VideoRecord>) -> Self {
        Pipeline {
            videos,
            ..Self::new(config)
        }
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn insights(&self) -> Option<&Insights> {
        self.insights.as_ref()
    }

    pub fn report_path(&self) -> Option<&Path> {
        self.report_path.as_deref()
    }

    pub async fn step1_collect_data(&mut self, query: &str) -> Result<()> {
        banner("STEP 1: Collecting YouTube Data");
        self.query = query.to_string();

        let collector = YouTubeCollector::new(self.config.clone())?;
        self.videos = collector
            .collect_full_data(query)
            .await
            .context("Data collection failed")?;

        info!("Successfully collected data for {} videos", self.videos.len());
        Ok(())
    }

    pub async fn step2_analyze_data(&mut self) -> Result<()> {
        banner("STEP 2: Analyzing Data");

        if self.videos.is_empty() {
            bail!("No data available for analysis");
        }

        let mut analyzer = YouTubeAnalyzer::new(std::mem::take(&mut self.videos), &self.config);
        analyzer.run_full_analysis();
        let (videos, insights) = analyzer.into_parts();
        self.videos = videos;
        self.insights = Some(insights);

        storage::export_csv(&self.config.csv_export_path, &self.videos)?;
        info!(
            "Exported analyzed data to {}",
            self.config.csv_export_path.display()
        );

        let run_id = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let store = VideoStore::connect(&self.config.db_path).await?;
        let inserted = store.insert_run(&run_id, &self.videos).await?;
        store.close().await;
        info!("Stored {inserted} rows for run {run_id}");

        info!("Analysis complete");
        Ok(())
    }

    pub fn step3_generate_report(&mut self) -> Result<()> {
        banner("STEP 3: Generating Report");

        let insights = self
            .insights
            .as_ref()
            .ok_or_else(|| anyhow!("No insights available for report generation"))?;

        let generator = ReportGenerator::new(insights, &self.videos, &self.config);
        let path = generator.generate_presentation(&report_filename())?;
        info!("Report generated: {}", path.display());
        self.report_path = Some(path);
        Ok(())
    }

    /// Returns `Ok(false)` when email is disabled and nothing was sent.
    pub async fn step4_send_email(&self, recipient: Option<&str>, send_email: bool) -> Result<bool> {
        banner("STEP 4: Sending Report via Email");

        if !send_email {
            info!("Email sending skipped (disabled)");
            return Ok(false);
        }

        let report_path = self
            .report_path
            .as_deref()
            .ok_or_else(|| anyhow!("No report available to send"))?;
        let recipient = recipient
            .or(self.config.default_recipient.as_deref())
            .ok_or_else(|| anyhow!("No recipient given and GMAIL_RECIPIENT is not set"))?;

        let sender = EmailSender::from_config(&self.config)?;
        sender
            .send_report(recipient, &self.email_subject(), &self.email_body(), report_path)
            .await?;
        Ok(true)
    }

    pub fn email_subject(&self) -> String {
        format!(
            "{} - {}",
            self.config.report_title,
            Local::now().format("%B %d, %Y")
        )
    }

    pub fn email_body(&self) -> String {
        let insights = self.insights.clone().unwrap_or_default();
        let themes: Vec<&str> = insights
            .industry_themes
            .iter()
            .take(5)
            .map(String::as_str)
            .collect();

        format!(
            "Hello,

Please find attached your YouTube Trends Analysis Report for \"{query}\".

Report Details:
- Videos Analyzed: {count}
- Report Generated: {generated}
- Time Period: Last {days} days

Key Findings:
- Average Views per Video: {avg_views}
- Engagement Rate: {rate}
- Positive Sentiment Videos: {positive}
- Top Themes: {themes}

This report includes:
- Executive Summary
- Engagement Analysis
- Sentiment Distribution
- Industry Trends
- Top Performing Channels
- Actionable Recommendations

Best regards,
YouTube Automation System
",
            query = self.query,
            count = self.videos.len(),
            generated = Local::now().format("%Y-%m-%d %H:%M:%S"),
            days = self.config.days_back,
            avg_views = format_thousands(insights.engagement_stats.avg_views),
            rate = format_percent(insights.engagement_stats.engagement_rate),
            positive = insights.sentiment_distribution.positive,
            themes = themes.join(", "),
        )
    }

    pub async fn run_full_pipeline(
        &mut self,
        send_email: bool,
        query: Option<&str>,
        recipient: Option<&str>,
    ) -> RunSummary {
        info!("YOUTUBE AUTOMATION PIPELINE STARTING");
        let query = query
            .map(str::to_string)
            .unwrap_or_else(|| self.config.search_query.clone());
        self.query = query.clone();

        let mut summary = self.start_summary();
        let outcome = self.step1_collect_data(&query).await;
        if record_step(&mut summary, "Data Collection", outcome.map(|_| true)) {
            self.run_remaining_steps(&mut summary, send_email, recipient)
                .await;
        }
        self.finish_summary(summary)
    }

    /// Reruns analysis, report and email on a previous CSV export.
    pub async fn run_from_csv(
        &mut self,
        csv_path: &Path,
        send_email: bool,
        recipient: Option<&str>,
    ) -> RunSummary {
        info!("Loading videos from {}", csv_path.display());
        let mut summary = self.start_summary();
        let loaded = storage::import_csv(csv_path).map(|videos| {
            info!("Loaded {} videos", videos.len());
            self.videos = videos;
            true
        });
        if record_step(&mut summary, "Data Loading", loaded) {
            self.run_remaining_steps(&mut summary, send_email, recipient)
                .await;
        }
        self.finish_summary(summary)
    }

    async fn run_remaining_steps(
        &mut self,
        summary: &mut RunSummary,
        send_email: bool,
        recipient: Option<&str>,
    ) {
        let analyzed = self.step2_analyze_data().await.map(|_| true);
        if !record_step(summary, "Data Analysis", analyzed) {
            return;
        }
        let reported = self.step3_generate_report().map(|_| true);
        if !record_step(summary, "Report Generation", reported) {
            return;
        }
        let sent = self.step4_send_email(recipient, send_email).await;
        record_step(summary, "Email Delivery", sent);
    }

    fn start_summary(&self) -> RunSummary {
        RunSummary {
            query: self.query.clone(),
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    fn finish_summary(&self, mut summary: RunSummary) -> RunSummary {
        summary.finished_at = Utc::now().to_rfc3339();
        summary.videos_analyzed = self.videos.len();
        summary.report_path = self
            .report_path
            .as_ref()
            .map(|p| p.display().to_string());

        banner("PIPELINE EXECUTION SUMMARY");
        for step in &summary.steps {
            match &step.status {
                StepStatus::Failed(message) => {
                    info!("{}: {} ({message})", step.step, step.status.label())
                }
                status => info!("{}: {}", step.step, status.label()),
            }
        }
        info!("{BANNER}");
        summary
    }
}

/// Appends the step outcome. `Ok(false)` marks a skipped step. Returns whether
/// the run may continue.
fn record_step(summary: &mut RunSummary, step: &str, outcome: Result<bool>) -> bool {
    let (status, proceed) = match outcome {
        Ok(true) => (StepStatus::Passed, true),
        Ok(false) => (StepStatus::Skipped, true),
        Err(e) => {
            error!("{step} failed: {e:#}");
            warn!("Pipeline halted at: {step}");
            (StepStatus::Failed(format!("{e:#}")), false)
        }
    };
    summary.steps.push(StepResult {
        step: step.to_string(),
        status,
    });
    proceed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tmp: &Path) -> PipelineConfig {
        PipelineConfig::with_dirs(tmp.join("data"), tmp.join("reports"))
    }

    fn video(id: &str, views: i64, comments: i64) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: format!("Shiva temple darshan {id}"),
            description: "Evening aarti".to_string(),
            channel_title: "Bhakti Channel".to_string(),
            published_at: "2026-10-01T10:00:00Z".to_string(),
            view_count: views,
            like_count: views / 10,
            comment_count: comments,
            duration: "PT5M".to_string(),
            duration_seconds: 300,
            collected_at: "2026-10-19T08:00:00".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn analysis_requires_videos() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config(tmp.path()));
        let err = pipeline.step2_analyze_data().await.unwrap_err();
        assert!(err.to_string().contains("No data available"));
    }

    #[test]
    fn report_requires_insights() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config(tmp.path()));
        assert!(pipeline.step3_generate_report().is_err());
    }

    #[tokio::test]
    async fn email_step_is_skipped_or_needs_report() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(config(tmp.path()));
        assert!(!pipeline.step4_send_email(None, false).await.unwrap());

        let err = pipeline
            .step4_send_email(Some("team@example.com"), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No report"));
    }

    #[tokio::test]
    async fn analyze_stores_scores_and_run() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        cfg.ensure_directories().unwrap();
        let mut pipeline = Pipeline::with_videos(
            cfg.clone(),
            vec![video("a", 1000, 150), video("b", 500, 20)],
        );

        pipeline.step2_analyze_data().await.unwrap();

        assert!(pipeline.videos().iter().all(|v| v.engagement_score.is_some()));
        let insights = pipeline.insights().unwrap();
        assert_eq!(insights.trending_videos.len(), 1);

        let exported = storage::import_csv(&cfg.csv_export_path).unwrap();
        assert_eq!(exported.len(), 2);
        assert!(exported[0].compound_sentiment.is_some());

        let store = VideoStore::connect(&cfg.db_path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn csv_rerun_without_email() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        cfg.ensure_directories().unwrap();
        let csv_path = tmp.path().join("previous.csv");
        storage::export_csv(&csv_path, &[video("a", 1000, 150), video("b", 500, 20)]).unwrap();

        let mut pipeline = Pipeline::new(cfg);
        let summary = pipeline.run_from_csv(&csv_path, false, None).await;

        let steps: Vec<(&str, &StepStatus)> = summary
            .steps
            .iter()
            .map(|s| (s.step.as_str(), &s.status))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("Data Loading", &StepStatus::Passed),
                ("Data Analysis", &StepStatus::Passed),
                ("Report Generation", &StepStatus::Passed),
                ("Email Delivery", &StepStatus::Skipped),
            ]
        );
        assert!(summary.succeeded());
        assert_eq!(summary.videos_analyzed, 2);
        assert!(Path::new(summary.report_path.as_deref().unwrap()).exists());
    }

    #[tokio::test]
    async fn missing_api_key_halts_at_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config(tmp.path()));
        let summary = pipeline
            .run_full_pipeline(false, Some("shiv bhajan"), None)
            .await;

        assert_eq!(summary.query, "shiv bhajan");
        assert_eq!(summary.steps.len(), 1);
        assert!(matches!(summary.steps[0].status, StepStatus::Failed(_)));
        assert!(!summary.succeeded());
    }

    #[test]
    fn email_body_summarizes_findings() {
        let tmp = tempfile::tempdir().unwrap();
        let mut pipeline =
            Pipeline::with_videos(config(tmp.path()), vec![video("a", 1000, 150)]);
        let mut insights = Insights::default();
        insights.engagement_stats.avg_views = 12345.0;
        insights.engagement_stats.engagement_rate = 0.0321;
        insights.sentiment_distribution.positive = 3;
        insights.industry_themes = (1..=7).map(|i| format!("theme{i}")).collect();
        pipeline.insights = Some(insights);

        let body = pipeline.email_body();
        assert!(body.contains("Videos Analyzed: 1"));
        assert!(body.contains("Average Views per Video: 12,345"));
        assert!(body.contains("Engagement Rate: 3.21%"));
        assert!(body.contains("Positive Sentiment Videos: 3"));
        assert!(body.contains("Top Themes: theme1, theme2, theme3, theme4, theme5\n"));
        assert!(body.contains("Last 30 days"));
    }
}
