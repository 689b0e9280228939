use crate::models::{SentimentDistribution, VideoRecord};
use crate::utils::{compare_desc_float, truncate_chars};
use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use log::{info, warn};
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

const FONT_FAMILY: &str = "sans-serif";
const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub const POSITIVE_COLOR: RGBColor = RGBColor(0x27, 0xae, 0x60);
pub const NEGATIVE_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
pub const NEUTRAL_COLOR: RGBColor = RGBColor(0x95, 0xa5, 0xa6);
const BAR_COLOR: RGBColor = RGBColor(0x63, 0x6e, 0xfa);

lazy_static! {
    static ref FONT_REGISTERED: Mutex<bool> = Mutex::new(false);
}

/// Registers a TTF under the generic sans-serif family. The bitmap backend has
/// no built-in fonts, so every chart depends on this succeeding once.
pub fn ensure_font(preferred: Option<&Path>) -> Result<()> {
    let mut registered = FONT_REGISTERED
        .lock()
        .map_err(|_| anyhow!("font registry lock poisoned"))?;
    if *registered {
        return Ok(());
    }

    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

    let path = register_first_usable(candidates)?;
    info!("Registered chart font {}", path.display());
    *registered = true;
    Ok(())
}

/// Registers the first candidate that reads and parses as a font. Unreadable or
/// unparsable files are skipped.
fn register_first_usable(candidates: impl IntoIterator<Item = PathBuf>) -> Result<PathBuf> {
    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let usable = [FontStyle::Normal, FontStyle::Bold]
            .into_iter()
            .all(|style| register_font(FONT_FAMILY, style, bytes).is_ok());
        if !usable {
            warn!("{} is not a usable font, trying the next one", path.display());
            continue;
        }
        return Ok(path);
    }

    Err(anyhow!(
        "No chart font found; set CHART_FONT_PATH to a .ttf file"
    ))
}

/// Top videos by engagement score, highest first, with display-ready labels.
pub fn top_engagement_bars(videos: &[VideoRecord], top_n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<&VideoRecord> = videos
        .iter()
        .filter(|v| v.engagement_score.is_some())
        .collect();
    ranked.sort_by(|a, b| {
        compare_desc_float(
            a.engagement_score.unwrap_or(0.0),
            b.engagement_score.unwrap_or(0.0),
        )
    });
    ranked
        .into_iter()
        .take(top_n)
        .map(|v| (truncate_chars(&v.title, 45), v.engagement_score.unwrap_or(0.0)))
        .collect()
}

/// Non-empty sentiment slices in positive, negative, neutral order.
pub fn sentiment_slices(dist: &SentimentDistribution) -> Vec<(&'static str, f64, RGBColor)> {
    [
        ("Positive", dist.positive, POSITIVE_COLOR),
        ("Negative", dist.negative, NEGATIVE_COLOR),
        ("Neutral", dist.neutral, NEUTRAL_COLOR),
    ]
    .into_iter()
    .filter(|(_, count, _)| *count > 0)
    .map(|(label, count, color)| (label, count as f64, color))
    .collect()
}

fn draw_engagement(path: &Path, bars: &[(String, f64)]) -> DrawResult {
    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_score = bars.iter().map(|(_, s)| *s).fold(0.0, f64::max).max(1.0);
    // Rows are drawn bottom-up, so the first bar owns the last row.
    let labels: Vec<String> = bars.iter().rev().map(|(t, _)| t.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption("Top 10 Videos by Engagement Score", (FONT_FAMILY, 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(380)
        .build_cartesian_2d(0f64..max_score * 1.05, (0..bars.len()).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Engagement Score")
        .y_labels(bars.len())
        .y_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .label_style((FONT_FAMILY, 13))
        .draw()?;

    let rows = bars.len();
    chart.draw_series(bars.iter().enumerate().map(|(i, (_, score))| {
        let row = rows - 1 - i;
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(row)),
                (*score, SegmentValue::Exact(row + 1)),
            ],
            BAR_COLOR.filled(),
        );
        bar.set_margin(4, 4, 0, 0);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn draw_sentiment(path: &Path, slices: &[(&'static str, f64, RGBColor)]) -> DrawResult {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Sentiment Distribution", (FONT_FAMILY, 28))?;

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = (width.min(height) as f64) * 0.35;
    let sizes: Vec<f64> = slices.iter().map(|(_, v, _)| *v).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|(_, _, c)| *c).collect();
    let labels: Vec<&str> = slices.iter().map(|(l, _, _)| *l).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT_FAMILY, 20).into_font().color(&BLACK));
    pie.percentages((FONT_FAMILY, 18).into_font().color(&WHITE));
    root.draw(&pie)?;

    root.present()?;
    Ok(())
}

/// Renders the engagement bar chart. `None` means the slide should be skipped.
pub fn create_engagement_chart(
    charts_dir: &Path,
    videos: &[VideoRecord],
    font: Option<&Path>,
) -> Option<PathBuf> {
    info!("Creating engagement chart");

    let bars = top_engagement_bars(videos, 10);
    if bars.is_empty() {
        warn!("No engagement scores to chart");
        return None;
    }
    if let Err(e) = ensure_font(font) {
        warn!("Could not save chart image: {e}. Continuing without image.");
        return None;
    }

    let path = charts_dir.join("engagement_chart.png");
    match draw_engagement(&path, &bars) {
        Ok(()) => {
            info!("Saved chart: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Error creating engagement chart: {e}");
            None
        }
    }
}

pub fn create_sentiment_chart(
    charts_dir: &Path,
    dist: &SentimentDistribution,
    font: Option<&Path>,
) -> Option<PathBuf> {
    info!("Creating sentiment chart");

    let slices = sentiment_slices(dist);
    if slices.is_empty() {
        warn!("No sentiment data to chart");
        return None;
    }
    if let Err(e) = ensure_font(font) {
        warn!("Could not save sentiment chart image: {e}. Continuing without image.");
        return None;
    }

    let path = charts_dir.join("sentiment_chart.png");
    match draw_sentiment(&path, &slices) {
        Ok(()) => {
            info!("Saved chart: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Error creating sentiment chart: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(title: &str, score: Option<f64>) -> VideoRecord {
        VideoRecord {
            title: title.to_string(),
            engagement_score: score,
            ..Default::default()
        }
    }

    #[test]
    fn bars_are_sorted_and_capped() {
        let videos: Vec<VideoRecord> = (0..12)
            .map(|i| scored(&format!("v{i}"), Some(i as f64)))
            .chain(std::iter::once(scored("unscored", None)))
            .collect();
        let bars = top_engagement_bars(&videos, 10);
        assert_eq!(bars.len(), 10);
        assert_eq!(bars[0], ("v11".to_string(), 11.0));
        assert_eq!(bars[9].0, "v2");
    }

    #[test]
    fn bar_labels_are_truncated() {
        let long = "x".repeat(80);
        let bars = top_engagement_bars(&[scored(&long, Some(1.0))], 10);
        assert_eq!(bars[0].0.chars().count(), 45);
        assert!(bars[0].0.ends_with("..."));
    }

    #[test]
    fn empty_sentiment_slices_are_dropped() {
        let dist = SentimentDistribution {
            positive: 4,
            negative: 0,
            neutral: 2,
            avg_sentiment: 0.3,
        };
        let slices = sentiment_slices(&dist);
        let labels: Vec<&str> = slices.iter().map(|s| s.0).collect();
        assert_eq!(labels, vec!["Positive", "Neutral"]);
        assert!(sentiment_slices(&SentimentDistribution::default()).is_empty());
    }

    #[test]
    fn unusable_preferred_font_falls_through() {
        let tmp = tempfile::tempdir().unwrap();
        let bogus = tmp.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        let err = register_first_usable([bogus.clone(), tmp.path().join("absent.ttf")]).unwrap_err();
        assert!(err.to_string().contains("No chart font found"));

        if let Some(system) = SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.exists()) {
            let chosen = register_first_usable([bogus, system.clone()]).unwrap();
            assert_eq!(chosen, system);
        }
    }

    #[test]
    fn charts_skip_when_nothing_to_draw() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(create_engagement_chart(tmp.path(), &[], None).is_none());
        assert!(
            create_sentiment_chart(tmp.path(), &SentimentDistribution::default(), None).is_none()
        );
    }
}
