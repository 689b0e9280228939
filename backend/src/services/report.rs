use crate::config::PipelineConfig;
use crate::models::{Insights, VideoRecord};
use crate::services::charts;
use crate::services::pptx::{inches, Frame, Presentation, Rgb, Slide, TextStyle};
use crate::utils::{format_percent, format_thousands};
use anyhow::Result;
use chrono::Local;
use log::{info, warn};
use std::path::{Path, PathBuf};

const DARK: Rgb = Rgb(44, 62, 80);
const WHITE: Rgb = Rgb(255, 255, 255);
const SILVER: Rgb = Rgb(189, 195, 199);

/// Builds the slide deck for one analyzed batch of videos.
pub struct ReportGenerator<'a> {
    insights: &'a Insights,
    videos: &'a [VideoRecord],
    config: &'a PipelineConfig,
    prs: Presentation,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(insights: &'a Insights, videos: &'a [VideoRecord], config: &'a PipelineConfig) -> Self {
        ReportGenerator {
            insights,
            videos,
            config,
            prs: Presentation::new(10.0, 7.5, &config.report_title),
        }
    }

    /// New slide with the standard heading; callers add the body to the returned slide.
    fn add_heading(&mut self, text: &str, size_pt: f64) -> &mut Slide {
        let slide = self.prs.add_slide();
        slide.add_textbox(
            Frame::inches(0.5, 0.3, 9.0, 0.6),
            text,
            TextStyle::new(size_pt).bold().color(DARK),
            false,
        );
        slide
    }

    pub fn create_title_slide(&mut self) {
        info!("Creating title slide");

        let generated = format!("Generated on {}", Local::now().format("%B %d, %Y"));
        let slide = self.prs.add_slide();
        slide.background = Some(DARK);
        slide.add_textbox(
            Frame::inches(0.5, 2.5, 9.0, 1.5),
            &self.config.report_title,
            TextStyle::new(54.0).bold().color(WHITE).centered(),
            true,
        );
        slide.add_textbox(
            Frame::inches(0.5, 4.2, 9.0, 1.0),
            &generated,
            TextStyle::new(24.0).color(SILVER).centered(),
            false,
        );
    }

    pub fn executive_summary_text(&self) -> String {
        let stats = &self.insights.engagement_stats;
        let sentiment = &self.insights.sentiment_distribution;
        let total_comments: i64 = self.videos.iter().map(|v| v.comment_count).sum();

        format!(
            "Videos Analyzed: {}\n\
             \n\
             Engagement Metrics:\n\
             • Average Views per Video: {}\n\
             • Average Engagement Rate: {}\n\
             • Total Comments: {}\n\
             \n\
             Sentiment Analysis:\n\
             • Positive Sentiment: {} videos\n\
             • Negative Sentiment: {} videos\n\
             • Neutral Sentiment: {} videos\n\
             • Average Sentiment Score: {:.2}",
            self.videos.len(),
            format_thousands(stats.avg_views),
            format_percent(stats.engagement_rate),
            format_thousands(total_comments as f64),
            sentiment.positive,
            sentiment.negative,
            sentiment.neutral,
            sentiment.avg_sentiment,
        )
    }

    pub fn create_executive_summary_slide(&mut self) {
        info!("Creating executive summary slide");

        let text = self.executive_summary_text();
        self.add_heading("Executive Summary", 44.0).add_textbox(
            Frame::inches(0.5, 1.2, 9.0, 5.5),
            &text,
            TextStyle::new(16.0).line_spacing(1.5),
            true,
        );
    }

    pub fn add_chart_slide(&mut self, chart_title: &str, chart_path: Option<&Path>) {
        let Some(chart_path) = chart_path else {
            warn!("Skipping chart slide: {chart_title} (no image available)");
            return;
        };
        info!("Adding chart slide: {chart_title}");

        self.add_heading(chart_title, 40.0);
        if let Err(e) = self
            .prs
            .add_picture(chart_path, inches(0.5), inches(1.2), inches(9.0))
        {
            warn!(
                "Skipping chart slide: {chart_title} (could not place {}: {e:#})",
                chart_path.display()
            );
            self.prs.pop_slide();
        }
    }

    pub fn themes_text(&self) -> String {
        self.insights
            .industry_themes
            .iter()
            .take(12)
            .map(|theme| format!("• {theme}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn create_themes_slide(&mut self) {
        info!("Creating themes slide");

        let mut text = self.themes_text();
        if text.is_empty() {
            text = "No recurring themes found in video titles.".to_string();
        }
        self.add_heading("Key Industry Themes", 44.0).add_textbox(
            Frame::inches(1.0, 1.5, 8.0, 5.5),
            &text,
            TextStyle::new(18.0).line_spacing(1.8),
            true,
        );
    }

    pub fn channels_text(&self) -> String {
        self.insights
            .top_channels
            .iter()
            .take(8)
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{}. {}\n   Videos: {}, Total Views: {}",
                    i + 1,
                    c.channel_title,
                    c.video_count,
                    format_thousands(c.total_views as f64)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn create_top_channels_slide(&mut self) {
        info!("Creating top channels slide");

        let text = self.channels_text();
        self.add_heading("Top Performing Channels", 40.0).add_textbox(
            Frame::inches(0.7, 1.2, 8.6, 5.8),
            &text,
            TextStyle::new(14.0),
            true,
        );
    }

    pub fn takeaways_text(&self) -> String {
        let dist = &self.insights.sentiment_distribution;
        let mood = if dist.positive >= dist.negative && dist.positive >= dist.neutral {
            "predominantly positive"
        } else if dist.negative >= dist.neutral {
            "leaning negative"
        } else {
            "mostly neutral"
        };
        let leader = self
            .insights
            .top_channels
            .first()
            .map(|c| format!("• {} leads the niche by total views", c.channel_title))
            .unwrap_or_else(|| "• No single channel dominates the niche".to_string());
        let themes = if self.insights.industry_themes.is_empty() {
            "• No dominant topics surfaced in titles".to_string()
        } else {
            format!(
                "• Trending topics revolve around {}",
                self.insights
                    .industry_themes
                    .iter()
                    .take(3)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };

        format!(
            "• The niche averages {} views per video at a {} engagement rate\n\
             • Sentiment across the niche is {mood}\n\
             {leader}\n\
             {themes}\n\
             \n\
             Recommendations:\n\
             ✓ Focus on in-depth, practical content\n\
             ✓ Engage with trending topics and formats\n\
             ✓ Build community through comments and interactions\n\
             ✓ Maintain consistent upload schedule\n\
             ✓ Optimize titles and descriptions for discoverability",
            format_thousands(self.insights.engagement_stats.avg_views),
            format_percent(self.insights.engagement_stats.engagement_rate),
        )
    }

    pub fn create_conclusion_slide(&mut self) {
        info!("Creating conclusion slide");

        let text = self.takeaways_text();
        self.add_heading("Key Takeaways", 40.0).add_textbox(
            Frame::inches(0.7, 1.2, 8.6, 5.8),
            &text,
            TextStyle::new(14.0).line_spacing(1.6),
            true,
        );
    }

    /// Builds every slide in deck order. Chart slides are left out when their
    /// image could not be rendered.
    pub fn build_slides(&mut self) -> Result<()> {
        let config = self.config;
        let charts_dir = config.charts_path();
        std::fs::create_dir_all(&charts_dir)?;
        let font = config.chart_font_path.as_deref();

        self.create_title_slide();
        self.create_executive_summary_slide();

        let engagement_chart = charts::create_engagement_chart(&charts_dir, self.videos, font);
        self.add_chart_slide("Engagement Analysis", engagement_chart.as_deref());

        let sentiment_chart =
            charts::create_sentiment_chart(&charts_dir, &self.insights.sentiment_distribution, font);
        self.add_chart_slide("Sentiment Distribution", sentiment_chart.as_deref());

        self.create_themes_slide();
        self.create_top_channels_slide();
        self.create_conclusion_slide();
        Ok(())
    }

    pub fn generate_presentation(mut self, output_filename: &str) -> Result<PathBuf> {
        info!("Generating presentation");

        self.build_slides()?;

        let output_path = self.config.report_output_path.join(output_filename);
        self.prs.save(&output_path)?;
        info!("Presentation saved to {}", output_path.display());

        Ok(output_path)
    }

    pub fn presentation(&self) -> &Presentation {
        &self.prs
    }
}

pub fn report_filename() -> String {
    format!(
        "YouTube_Trends_Report_{}.pptx",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelStats, EngagementStats, SentimentDistribution};

    fn insights() -> Insights {
        Insights {
            engagement_stats: EngagementStats {
                avg_views: 12_345.6,
                median_views: 9_000.0,
                avg_likes: 300.0,
                avg_comments: 40.0,
                engagement_rate: 0.0321,
            },
            sentiment_distribution: SentimentDistribution {
                positive: 3,
                negative: 1,
                neutral: 1,
                avg_sentiment: 0.276,
            },
            industry_themes: (1..=14).map(|i| format!("theme {i}")).collect(),
            top_channels: (1..=9)
                .map(|i| ChannelStats {
                    channel_title: format!("Channel {i}"),
                    video_count: i,
                    total_views: 1_000_000 / i as i64,
                    total_likes: 0,
                    total_comments: 0,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn videos() -> Vec<VideoRecord> {
        (0..5)
            .map(|i| VideoRecord {
                video_id: format!("v{i}"),
                title: format!("Video {i}"),
                comment_count: 1_000,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn summary_text_formats_metrics() {
        let config = PipelineConfig::default();
        let (insights, videos) = (insights(), videos());
        let generator = ReportGenerator::new(&insights, &videos, &config);
        let text = generator.executive_summary_text();
        assert!(text.starts_with("Videos Analyzed: 5\n"));
        assert!(text.contains("Average Views per Video: 12,346"));
        assert!(text.contains("Average Engagement Rate: 3.21%"));
        assert!(text.contains("Total Comments: 5,000"));
        assert!(text.contains("Positive Sentiment: 3 videos"));
        assert!(text.contains("Average Sentiment Score: 0.28"));
    }

    #[test]
    fn themes_and_channels_are_capped() {
        let config = PipelineConfig::default();
        let (insights, videos) = (insights(), videos());
        let generator = ReportGenerator::new(&insights, &videos, &config);

        assert_eq!(generator.themes_text().lines().count(), 12);
        let channels = generator.channels_text();
        assert!(channels.starts_with("1. Channel 1\n   Videos: 1, Total Views: 1,000,000"));
        assert!(channels.contains("8. Channel 8"));
        assert!(!channels.contains("9. Channel 9"));
    }

    #[test]
    fn takeaways_reflect_sentiment_and_leader() {
        let config = PipelineConfig::default();
        let (insights, videos) = (insights(), videos());
        let generator = ReportGenerator::new(&insights, &videos, &config);
        let text = generator.takeaways_text();
        assert!(text.contains("predominantly positive"));
        assert!(text.contains("Channel 1 leads the niche"));
        assert!(text.contains("theme 1, theme 2, theme 3"));
    }

    #[test]
    fn missing_chart_skips_slide() {
        let config = PipelineConfig::default();
        let (insights, videos) = (insights(), videos());
        let mut generator = ReportGenerator::new(&insights, &videos, &config);
        generator.add_chart_slide("Engagement Analysis", None);
        assert!(generator.presentation().slides().is_empty());
    }

    #[test]
    fn unreadable_chart_leaves_no_heading_slide() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = tmp.path().join("engagement_chart.png");
        std::fs::write(&broken, b"not a png").unwrap();

        let config = PipelineConfig::default();
        let (insights, videos) = (insights(), videos());
        let mut generator = ReportGenerator::new(&insights, &videos, &config);
        generator.create_title_slide();
        generator.add_chart_slide("Engagement Analysis", Some(&broken));

        let slides = generator.presentation().slides();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].background, Some(DARK));
    }

    #[test]
    fn deck_has_fixed_slides_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_dirs(tmp.path().join("data"), tmp.path().join("reports"));
        let (insights, videos) = (insights(), videos());
        let mut generator = ReportGenerator::new(&insights, &videos, &config);
        generator.build_slides().unwrap();

        let headings: Vec<&str> = generator
            .presentation()
            .slides()
            .iter()
            .filter_map(|s| s.texts().next())
            .collect();
        // Chart slides depend on a usable system font, so only the fixed slides are asserted.
        let fixed: Vec<&str> = headings
            .iter()
            .copied()
            .filter(|h| *h != "Engagement Analysis" && *h != "Sentiment Distribution")
            .collect();
        assert_eq!(
            fixed,
            vec![
                config.report_title.as_str(),
                "Executive Summary",
                "Key Industry Themes",
                "Top Performing Channels",
                "Key Takeaways",
            ]
        );
        assert_eq!(generator.presentation().slides()[0].background, Some(DARK));
    }

    #[test]
    fn report_file_is_written() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_dirs(tmp.path().join("data"), tmp.path().join("reports"));
        let (insights, videos) = (insights(), videos());
        let path = ReportGenerator::new(&insights, &videos, &config)
            .generate_presentation(&report_filename())
            .unwrap();
        assert!(path.starts_with(tmp.path().join("reports")));
        assert!(path.extension().is_some_and(|e| e == "pptx"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
