//! JSON endpoints the VLE calls to push single changes between full syncs.
//!
//! Every endpoint answers `200 {"successMessage": ...}` or
//! `400 {"errorMessage": ...}`. Missing fields count as empty strings.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    #[serde(rename = "successMessage")]
    pub success_message: String,
}

fn success(message: &str) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        success_message: message.to_string(),
    })
}

fn bad_request(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Request body is not a valid JSON object: {}", e)))
}

fn all_present(fields: &[&str]) -> bool {
    fields.iter().all(|f| !f.is_empty())
}

pub async fn create_master_course(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: CreateMasterCourseRequest = parse_body(&body)?;
    if !all_present(&[&req.vle_course_id, &req.name]) {
        return Err(bad_request("Must specify vle_course_id and name"));
    }

    let mut tx = state.db.begin().await?;
    if repository::find_master_course(&mut *tx, &req.vle_course_id).await?.is_some() {
        return Err(bad_request("Course with given vle_course_id already exists"));
    }

    let course = MasterCourse {
        id: Uuid::new_v4().to_string(),
        vle_course_id: req.vle_course_id,
        display_name: req.name,
        compulsory: req.compulsory,
        commitment: req.commitment,
        credits: req.credits,
        weeks_duration: req.weeks_duration,
    };
    repository::insert_master_course(&mut *tx, &course).await?;
    tx.commit().await?;

    info!("master course {} created", course.vle_course_id);
    Ok(success("Course created successfully!"))
}

pub async fn update_master_course(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: UpdateMasterCourseRequest = parse_body(&body)?;
    if !all_present(&[&req.old_vle_course_id, &req.vle_course_id, &req.name]) {
        return Err(bad_request("Must specify old_vle_course_id, vle_course_id, name"));
    }

    let mut tx = state.db.begin().await?;
    let Some(mut course) = repository::find_master_course(&mut *tx, &req.old_vle_course_id).await? else {
        return Err(bad_request("Course with given old_vle_course_id does not exist"));
    };

    if req.vle_course_id != req.old_vle_course_id
        && repository::find_master_course(&mut *tx, &req.vle_course_id).await?.is_some()
    {
        return Err(bad_request("Course with given vle_course_id already exists"));
    }

    course.vle_course_id = req.vle_course_id;
    course.display_name = req.name;
    course.compulsory = req.compulsory;
    course.credits = req.credits;
    course.commitment = req.commitment;
    course.weeks_duration = req.weeks_duration;
    repository::save_master_course(&mut *tx, &course).await?;
    tx.commit().await?;

    info!("master course {} updated (was {})", course.vle_course_id, req.old_vle_course_id);
    Ok(success("Course updated successfully!"))
}

pub async fn delete_master_course(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: DeleteMasterCourseRequest = parse_body(&body)?;
    if !all_present(&[&req.vle_course_id]) {
        return Err(bad_request("Must specify vle_course_id"));
    }

    let mut tx = state.db.begin().await?;
    if repository::find_master_course(&mut *tx, &req.vle_course_id).await?.is_none() {
        return Err(bad_request("Course with given vle_course_id does not exist"));
    }

    repository::delete_master_courses(&mut *tx, std::slice::from_ref(&req.vle_course_id)).await?;
    tx.commit().await?;

    info!("master course {} deleted", req.vle_course_id);
    Ok(success("Course deleted successfully!"))
}

pub async fn create_scheduled_course(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: CreateScheduledCourseRequest = parse_body(&body)?;
    if !all_present(&[&req.master_vle_course_id, &req.vle_course_id, &req.name]) {
        return Err(bad_request("Must specify master_vle_course_id, vle_course_id and name"));
    }

    let mut tx = state.db.begin().await?;
    if repository::find_scheduled_course(&mut *tx, &req.vle_course_id).await?.is_some() {
        return Err(bad_request("Course with given vle_course_id already exists"));
    }

    let Some(master) = repository::find_master_course(&mut *tx, &req.master_vle_course_id).await? else {
        return Err(bad_request("Course with given master_vle_course_id does not exist"));
    };

    let course = ScheduledCourse {
        id: Uuid::new_v4().to_string(),
        master_course_id: master.id,
        vle_course_id: req.vle_course_id,
        display_name: req.name,
        open_date: req.open_date,
        start_date: req.start_date,
        end_date: req.end_date,
        close_date: req.close_date,
    };
    repository::insert_scheduled_course(&mut *tx, &course).await?;
    tx.commit().await?;

    info!("scheduled course {} created under {}", course.vle_course_id, req.master_vle_course_id);
    Ok(success("Course created successfully!"))
}

pub async fn update_scheduled_course(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: UpdateScheduledCourseRequest = parse_body(&body)?;
    if !all_present(&[&req.master_vle_course_id, &req.old_vle_course_id, &req.vle_course_id, &req.name]) {
        return Err(bad_request(
            "Must specify master_vle_course_id, old_vle_course_id, vle_course_id and name",
        ));
    }

    let mut tx = state.db.begin().await?;
    let not_found = "Course with given old_vle_course_id and master_vle_course_id does not exist";
    let Some(master) = repository::find_master_course(&mut *tx, &req.master_vle_course_id).await? else {
        return Err(bad_request(not_found));
    };
    let Some(mut course) =
        repository::find_scheduled_course_in(&mut *tx, &master.id, &req.old_vle_course_id).await?
    else {
        return Err(bad_request(not_found));
    };

    if req.vle_course_id != req.old_vle_course_id
        && repository::find_scheduled_course(&mut *tx, &req.vle_course_id).await?.is_some()
    {
        return Err(bad_request("Course with given vle_course_id already exists"));
    }

    course.vle_course_id = req.vle_course_id;
    course.display_name = req.name;
    course.open_date = req.open_date;
    course.start_date = req.start_date;
    course.end_date = req.end_date;
    course.close_date = req.close_date;
    repository::save_scheduled_course(&mut *tx, &course).await?;
    tx.commit().await?;

    info!("scheduled course {} updated (was {})", course.vle_course_id, req.old_vle_course_id);
    Ok(success("Course updated successfully!"))
}

pub async fn delete_scheduled_course(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: DeleteScheduledCourseRequest = parse_body(&body)?;
    if !all_present(&[&req.master_vle_course_id, &req.vle_course_id]) {
        return Err(bad_request("Must specify master_vle_course_id and vle_course_id"));
    }

    let mut tx = state.db.begin().await?;
    let not_found = "Course with given vle_course_id and master_vle_course_id does not exist";
    let Some(master) = repository::find_master_course(&mut *tx, &req.master_vle_course_id).await? else {
        return Err(bad_request(not_found));
    };
    if repository::find_scheduled_course_in(&mut *tx, &master.id, &req.vle_course_id).await?.is_none() {
        return Err(bad_request(not_found));
    }

    repository::delete_scheduled_courses(&mut *tx, &master.id, std::slice::from_ref(&req.vle_course_id)).await?;
    tx.commit().await?;

    info!("scheduled course {} deleted", req.vle_course_id);
    Ok(success("Course deleted successfully!"))
}

pub async fn create_group(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: CreateGroupRequest = parse_body(&body)?;
    if !all_present(&[&req.vle_course_id, &req.vle_group_id, &req.name]) {
        return Err(bad_request("Must specify vle_course_id, vle_group_id, name"));
    }

    let mut tx = state.db.begin().await?;
    let Some(course) = repository::find_scheduled_course(&mut *tx, &req.vle_course_id).await? else {
        return Err(bad_request("Course with given vle_course_id does not exist"));
    };
    if repository::find_group(&mut *tx, &course.id, &req.vle_group_id).await?.is_some() {
        return Err(bad_request("Group with given vle_course_id and vle_group_id already exists"));
    }

    let group = ScheduledCourseGroup {
        id: Uuid::new_v4().to_string(),
        scheduled_course_id: course.id,
        vle_group_id: req.vle_group_id,
        display_name: req.name,
    };
    repository::insert_group(&mut *tx, &group).await?;
    tx.commit().await?;

    info!("group {} created in {}", group.vle_group_id, req.vle_course_id);
    Ok(success("Group created successfully!"))
}

pub async fn update_group(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: UpdateGroupRequest = parse_body(&body)?;
    if !all_present(&[&req.vle_course_id, &req.old_vle_group_id, &req.vle_group_id, &req.name]) {
        return Err(bad_request("Must specify vle_course_id, old_vle_group_id, vle_group_id, name"));
    }

    let mut tx = state.db.begin().await?;
    let Some(course) = repository::find_scheduled_course(&mut *tx, &req.vle_course_id).await? else {
        return Err(bad_request("Course with given vle_course_id does not exist"));
    };
    let Some(mut group) = repository::find_group(&mut *tx, &course.id, &req.old_vle_group_id).await? else {
        return Err(bad_request("Group with given vle_course_id and old_vle_group_id does not exist"));
    };

    if req.vle_group_id != req.old_vle_group_id
        && repository::find_group(&mut *tx, &course.id, &req.vle_group_id).await?.is_some()
    {
        return Err(bad_request("Group with given vle_course_id and vle_group_id already exists"));
    }

    group.vle_group_id = req.vle_group_id;
    group.display_name = req.name;
    repository::save_group(&mut *tx, &group).await?;
    tx.commit().await?;

    info!("group {} updated (was {})", group.vle_group_id, req.old_vle_group_id);
    Ok(success("Group updated successfully!"))
}

pub async fn delete_group(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: DeleteGroupRequest = parse_body(&body)?;
    if !all_present(&[&req.vle_course_id, &req.vle_group_id]) {
        return Err(bad_request("Must specify vle_course_id and vle_group_id"));
    }

    let mut tx = state.db.begin().await?;
    let Some(course) = repository::find_scheduled_course(&mut *tx, &req.vle_course_id).await? else {
        return Err(bad_request("Course with given vle_course_id does not exist"));
    };
    if repository::find_group(&mut *tx, &course.id, &req.vle_group_id).await?.is_none() {
        return Err(bad_request("Group with given vle_course_id and vle_group_id does not exist"));
    }

    repository::delete_groups(&mut *tx, &course.id, std::slice::from_ref(&req.vle_group_id)).await?;
    tx.commit().await?;

    info!("group {} deleted from {}", req.vle_group_id, req.vle_course_id);
    Ok(success("Group deleted successfully!"))
}
