use crate::models::{ErrorResponse, ReportFile};
use crate::AppState;
use log::error;
use rocket::fs::NamedFile;
use rocket::serde::json::Json;
use rocket::{get, State};
use std::path::Path;

fn is_report(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("pptx")
}

/// Accepts a bare `*.pptx` file name and nothing that could leave the reports directory.
pub fn validate_report_name(name: &str) -> Result<(), ErrorResponse> {
    let rejected = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || !is_report(Path::new(name));
    if rejected {
        return Err(ErrorResponse {
            error: "invalid_report_name".to_string(),
            message: format!("'{name}' is not a valid report file name"),
        });
    }
    Ok(())
}

#[get("/reports")]
pub async fn list_reports(state: &State<AppState>) -> Json<Vec<ReportFile>> {
    let dir = &state.config.report_output_path;
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to read reports directory {}: {e:?}", dir.display());
            return Json(vec![]);
        }
    };

    let mut reports: Vec<ReportFile> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_report(&entry.path()))
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            metadata.is_file().then(|| ReportFile {
                name: entry.file_name().to_string_lossy().to_string(),
                size_bytes: metadata.len(),
            })
        })
        .collect();
    // Timestamped names sort chronologically; newest first.
    reports.sort_by(|a, b| b.name.cmp(&a.name));
    Json(reports)
}

#[get("/reports/<name>")]
pub async fn download_report(
    state: &State<AppState>,
    name: &str,
) -> Result<Option<NamedFile>, ErrorResponse> {
    validate_report_name(name)?;
    Ok(NamedFile::open(state.config.report_output_path.join(name))
        .await
        .ok())
}
