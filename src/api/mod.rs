mod admin;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Local;
use serde::Deserialize;

use crate::db::{programmes, repository};
use crate::error::AppError;
use crate::models::{MasterCourseSummary, ProgrammeMasterCourse};
use crate::services::SyncReport;
use crate::services::enrolments::{self, UserEnrolments};
use crate::state::AppState;

#[derive(Deserialize)]
struct EnrolmentQueryParams {
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "student".to_string()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync", post(sync_now))
        .route("/master-courses", get(list_master_courses))
        .route("/master-courses/{vle_course_id}", get(get_master_course))
        .route("/users/{username}/programmes", get(user_programmes))
        .route("/stages/{stage_id}/courses", get(stage_courses))
        .route("/create/master/", post(admin::create_master_course))
        .route("/update/master/", post(admin::update_master_course))
        .route("/delete/master/", post(admin::delete_master_course))
        .route("/create/scheduled/", post(admin::create_scheduled_course))
        .route("/update/scheduled/", post(admin::update_scheduled_course))
        .route("/delete/scheduled/", post(admin::delete_scheduled_course))
        .route("/create/group/", post(admin::create_group))
        .route("/update/group/", post(admin::update_group))
        .route("/delete/group/", post(admin::delete_group))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn sync_now(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    let report = state.sync.full_sync().await?;
    Ok(Json(report))
}

async fn list_master_courses(
    State(state): State<AppState>,
) -> Result<Json<Vec<MasterCourseSummary>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let today = Local::now().date_naive();

    let mut summaries = Vec::new();
    for course in repository::fetch_master_courses(&mut conn).await? {
        let next_start_date = repository::next_start_date(&mut conn, &course.id, today).await?;
        summaries.push(MasterCourseSummary {
            course,
            next_start_date,
        });
    }
    Ok(Json(summaries))
}

async fn get_master_course(
    State(state): State<AppState>,
    Path(vle_course_id): Path<String>,
) -> Result<Json<MasterCourseSummary>, AppError> {
    let mut conn = state.db.acquire().await?;
    let course = repository::find_master_course(&mut conn, &vle_course_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let next_start_date =
        repository::next_start_date(&mut conn, &course.id, Local::now().date_naive()).await?;

    Ok(Json(MasterCourseSummary {
        course,
        next_start_date,
    }))
}

async fn user_programmes(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<EnrolmentQueryParams>,
) -> Result<Json<UserEnrolments>, AppError> {
    let result = enrolments::enrolled_courses_by_programme(
        &state.db,
        state.vle.as_ref(),
        &username,
        &params.role,
    )
    .await?;
    Ok(Json(result))
}

/// Master courses currently offered in a stage, in display order.
async fn stage_courses(
    State(state): State<AppState>,
    Path(stage_id): Path<String>,
) -> Result<Json<Vec<ProgrammeMasterCourse>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let courses = programmes::fetch_stage_courses(&mut conn, &stage_id).await?;
    Ok(Json(courses))
}
