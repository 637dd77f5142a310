use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::db::programmes;
use crate::error::AppError;
use crate::models::{EnrolledCourse, ProgrammeCourses, ProgrammeMasterCourse, UserProgramme};
use crate::vle::VleClient;

#[derive(Debug, Serialize)]
pub struct UserEnrolments {
    pub programmes: Vec<ProgrammeCourses>,
    pub completions: Map<String, Value>,
}

/// A user's programmes, each with the scheduled courses the VLE reports them
/// enrolled on that belong to one of the programme's master courses.
///
/// Two queries and one VLE request.
pub async fn enrolled_courses_by_programme(
    db: &SqlitePool,
    vle: &dyn VleClient,
    username: &str,
    role: &str,
) -> Result<UserEnrolments, AppError> {
    let mut conn = db.acquire().await?;
    let user_programmes = programmes::fetch_user_programmes(&mut conn, username).await?;
    let programme_ids: Vec<String> = user_programmes.iter().map(|up| up.programme_id.clone()).collect();
    let programme_courses = programmes::fetch_programme_master_courses(&mut conn, &programme_ids).await?;
    drop(conn);

    let snapshot = vle.fetch_enrolments(username, role).await?;

    Ok(UserEnrolments {
        programmes: group_by_programme(&user_programmes, &programme_courses, &snapshot.courses),
        completions: snapshot.module_completions,
    })
}

pub fn group_by_programme(
    user_programmes: &[UserProgramme],
    programme_courses: &[ProgrammeMasterCourse],
    enrolled: &[EnrolledCourse],
) -> Vec<ProgrammeCourses> {
    let mut masters_by_programme: HashMap<&str, HashSet<&str>> = HashMap::new();
    for pmc in programme_courses {
        masters_by_programme
            .entry(pmc.programme_id.as_str())
            .or_default()
            .insert(pmc.master_vle_course_id.as_str());
    }

    user_programmes
        .iter()
        .map(|up| {
            let masters = masters_by_programme.get(up.programme_id.as_str());
            let courses = enrolled
                .iter()
                .filter(|course| masters.is_some_and(|m| m.contains(course.masteridnumber.as_str())))
                .cloned()
                .collect();

            ProgrammeCourses {
                id: up.programme_id.clone(),
                display_name: up.programme_display_name.clone(),
                courses,
            }
        })
        .collect()
}
