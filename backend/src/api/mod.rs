pub mod pipeline;
pub mod reports;

pub use pipeline::*;
pub use reports::*;

use crate::config::create_cors;
use crate::AppState;
use anyhow::Result;
use rocket::{routes, Build, Rocket};

/// Mounts every route under `/api` with CORS attached.
pub fn build_rocket(state: AppState) -> Result<Rocket<Build>> {
    let cors = create_cors()?;
    Ok(rocket::build()
        .manage(state)
        .mount(
            "/api",
            routes![
                api_status,
                run_pipeline,
                last_run,
                list_reports,
                download_report
            ],
        )
        .attach(cors))
}
