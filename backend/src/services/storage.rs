use crate::models::VideoRecord;
use anyhow::{Context, Result};
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

pub fn export_csv(path: &Path, records: &[VideoRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    if records.is_empty() {
        // serde only emits the header alongside the first row
        writer.write_record(CSV_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Exported {} videos to {}", records.len(), path.display());
    Ok(())
}

pub fn import_csv(path: &Path) -> Result<Vec<VideoRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: VideoRecord = row?;
        records.push(record);
    }
    Ok(records)
}

pub const CSV_COLUMNS: [&str; 19] = [
    "video_id",
    "title",
    "description",
    "channel_id",
    "channel_title",
    "published_at",
    "thumbnail_url",
    "view_count",
    "like_count",
    "comment_count",
    "duration",
    "duration_seconds",
    "collected_at",
    "transcript",
    "compound_sentiment",
    "positive",
    "negative",
    "neutral",
    "engagement_score",
];

/// Single-table mirror of the CSV export. Rows are appended per run and never rewritten.
pub struct VideoStore {
    pool: SqlitePool,
}

impl VideoStore {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        info!("Opening SQLite database: {}", db_path.display());

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let store = Self { pool };
        store.initialize_table().await?;
        Ok(store)
    }

    async fn initialize_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                video_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                channel_title TEXT NOT NULL,
                published_at TEXT NOT NULL,
                thumbnail_url TEXT,
                view_count INTEGER NOT NULL,
                like_count INTEGER NOT NULL,
                comment_count INTEGER NOT NULL,
                duration TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL,
                collected_at TEXT NOT NULL,
                transcript TEXT,
                compound_sentiment REAL,
                positive REAL,
                negative REAL,
                neutral REAL,
                engagement_score REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_videos_run ON videos(run_id)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_run(&self, run_id: &str, records: &[VideoRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for r in records {
            let result = sqlx::query(
                r#"
                INSERT INTO videos (
                    run_id, video_id, title, description, channel_id, channel_title,
                    published_at, thumbnail_url, view_count, like_count, comment_count,
                    duration, duration_seconds, collected_at, transcript,
                    compound_sentiment, positive, negative, neutral, engagement_score
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
                "#,
            )
            .bind(run_id)
            .bind(&r.video_id)
            .bind(&r.title)
            .bind(&r.description)
            .bind(&r.channel_id)
            .bind(&r.channel_title)
            .bind(&r.published_at)
            .bind(&r.thumbnail_url)
            .bind(r.view_count)
            .bind(r.like_count)
            .bind(r.comment_count)
            .bind(&r.duration)
            .bind(r.duration_seconds)
            .bind(&r.collected_at)
            .bind(&r.transcript)
            .bind(r.compound_sentiment)
            .bind(r.positive)
            .bind(r.negative)
            .bind(r.neutral)
            .bind(r.engagement_score)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        info!("Stored {inserted} videos for run {run_id}");
        Ok(inserted)
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn list_run(&self, run_id: &str) -> Result<Vec<VideoRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT video_id, title, description, channel_id, channel_title, published_at,
                   thumbnail_url, view_count, like_count, comment_count, duration,
                   duration_seconds, collected_at, transcript, compound_sentiment,
                   positive, negative, neutral, engagement_score
            FROM videos
            WHERE run_id = ?
            ORDER BY id
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(VideoRecord {
                video_id: row.try_get("video_id")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                channel_id: row.try_get("channel_id")?,
                channel_title: row.try_get("channel_title")?,
                published_at: row.try_get("published_at")?,
                thumbnail_url: row.try_get("thumbnail_url")?,
                view_count: row.try_get("view_count")?,
                like_count: row.try_get("like_count")?,
                comment_count: row.try_get("comment_count")?,
                duration: row.try_get("duration")?,
                duration_seconds: row.try_get("duration_seconds")?,
                collected_at: row.try_get("collected_at")?,
                transcript: row.try_get("transcript")?,
                compound_sentiment: row.try_get("compound_sentiment")?,
                positive: row.try_get("positive")?,
                negative: row.try_get("negative")?,
                neutral: row.try_get("neutral")?,
                engagement_score: row.try_get("engagement_score")?,
            });
        }
        Ok(records)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, views: i64) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: format!("Video {id}"),
            description: "line one\nline two, with \"quotes\"".to_string(),
            channel_id: "UC1".to_string(),
            channel_title: "Channel".to_string(),
            published_at: "2026-10-01T10:00:00Z".to_string(),
            view_count: views,
            duration: "PT1M".to_string(),
            duration_seconds: 60,
            collected_at: "2026-10-19T08:00:00Z".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn csv_export_then_import_preserves_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/videos.csv");
        let mut analyzed = record("b", 20);
        analyzed.compound_sentiment = Some(0.42);
        analyzed.transcript = Some("hello there".to_string());

        export_csv(&path, &[record("a", 10), analyzed.clone()]).unwrap();
        let back = import_csv(&path).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0], record("a", 10));
        assert_eq!(back[1], analyzed);
    }

    #[test]
    fn csv_header_matches_record_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("videos.csv");
        export_csv(&path, &[record("a", 1)]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn empty_export_still_writes_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("videos.csv");
        export_csv(&path, &[]).unwrap();
        assert!(import_csv(&path).unwrap().is_empty());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("video_id,title,"));
    }

    #[tokio::test]
    async fn store_appends_each_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store = VideoStore::connect(&tmp.path().join("db/youtube.db")).await.unwrap();

        store.insert_run("run-1", &[record("a", 1), record("b", 2)]).await.unwrap();
        store.insert_run("run-2", &[record("a", 5)]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        let second = store.list_run("run-2").await.unwrap();
        assert_eq!(second, vec![record("a", 5)]);
        let first = store.list_run("run-1").await.unwrap();
        assert_eq!(first[1].video_id, "b");
        store.close().await;
    }
}
