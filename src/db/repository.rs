//! Queries over the course hierarchy: master courses, scheduled courses and
//! scheduled-course groups.
//!
//! Every function takes a bare connection so callers decide the transaction
//! boundary. Foreign keys are `ON DELETE RESTRICT`, so deletes here always
//! remove groups, then scheduled courses, then master courses.

use chrono::NaiveDate;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::{MasterCourse, ScheduledCourse, ScheduledCourseGroup};
use crate::models::fields::DATE_FORMAT;

const MASTER_COLUMNS: &str =
    "id, vle_course_id, display_name, compulsory, commitment, credits, weeks_duration";
const SCHEDULED_COLUMNS: &str =
    "id, master_course_id, vle_course_id, display_name, open_date, start_date, end_date, close_date";
const GROUP_COLUMNS: &str = "id, scheduled_course_id, vle_group_id, display_name";

/// External id and display name of an existing child, read before a level is
/// reconciled. `signature` is whatever else a rename must agree on: the four
/// dates joined with `|` for scheduled courses, empty elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ChildKey {
    pub external_id: String,
    pub display_name: String,
    pub signature: String,
}

/// How [`resolve_master_course`] and friends found their entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found,
    Renamed,
    Created,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn push_in_list<'a>(qb: &mut QueryBuilder<'a, Sqlite>, ids: &'a [String]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
}

// ---------------------------------------------------------------------------
// Master courses
// ---------------------------------------------------------------------------

pub async fn fetch_master_courses(conn: &mut SqliteConnection) -> Result<Vec<MasterCourse>, sqlx::Error> {
    sqlx::query_as::<_, MasterCourse>(&format!(
        "SELECT {MASTER_COLUMNS} FROM master_courses ORDER BY display_name, vle_course_id"
    ))
    .fetch_all(&mut *conn)
    .await
}

pub async fn find_master_course(
    conn: &mut SqliteConnection,
    vle_course_id: &str,
) -> Result<Option<MasterCourse>, sqlx::Error> {
    sqlx::query_as::<_, MasterCourse>(&format!(
        "SELECT {MASTER_COLUMNS} FROM master_courses WHERE vle_course_id = ?"
    ))
    .bind(vle_course_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn master_course_keys(conn: &mut SqliteConnection) -> Result<Vec<ChildKey>, sqlx::Error> {
    sqlx::query_as::<_, ChildKey>(
        "SELECT vle_course_id AS external_id, display_name, '' AS signature FROM master_courses",
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn insert_master_course(
    conn: &mut SqliteConnection,
    course: &MasterCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO master_courses (id, vle_course_id, display_name, compulsory, commitment, credits, weeks_duration) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&course.id)
    .bind(&course.vle_course_id)
    .bind(&course.display_name)
    .bind(course.compulsory)
    .bind(&course.commitment)
    .bind(course.credits)
    .bind(course.weeks_duration)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes every column, including `vle_course_id`, keyed by surrogate id.
pub async fn save_master_course(
    conn: &mut SqliteConnection,
    course: &MasterCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE master_courses SET vle_course_id = ?, display_name = ?, compulsory = ?, commitment = ?, credits = ?, weeks_duration = ? WHERE id = ?"
    )
    .bind(&course.vle_course_id)
    .bind(&course.display_name)
    .bind(course.compulsory)
    .bind(&course.commitment)
    .bind(course.credits)
    .bind(course.weeks_duration)
    .bind(&course.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Looks a master course up by external id, renaming `rename_from` or
/// inserting a blank row when it does not exist yet.
pub async fn resolve_master_course(
    conn: &mut SqliteConnection,
    vle_course_id: &str,
    rename_from: Option<&str>,
) -> Result<(MasterCourse, Resolution), sqlx::Error> {
    if let Some(course) = find_master_course(conn, vle_course_id).await? {
        return Ok((course, Resolution::Found));
    }

    if let Some(old_id) = rename_from {
        if let Some(mut course) = find_master_course(conn, old_id).await? {
            course.vle_course_id = vle_course_id.to_string();
            save_master_course(conn, &course).await?;
            return Ok((course, Resolution::Renamed));
        }
    }

    let course = MasterCourse::blank(new_id(), vle_course_id);
    insert_master_course(conn, &course).await?;
    Ok((course, Resolution::Created))
}

/// Deletes the named master courses with their whole subtree.
pub async fn delete_master_courses(
    conn: &mut SqliteConnection,
    vle_course_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if vle_course_ids.is_empty() {
        return Ok(0);
    }

    let mut groups = QueryBuilder::<Sqlite>::new(
        "DELETE FROM scheduled_course_groups WHERE scheduled_course_id IN (SELECT s.id FROM scheduled_courses s JOIN master_courses m ON m.id = s.master_course_id WHERE m.vle_course_id IN ",
    );
    push_in_list(&mut groups, vle_course_ids);
    groups.push(")");
    groups.build().execute(&mut *conn).await?;

    let mut scheduled = QueryBuilder::<Sqlite>::new(
        "DELETE FROM scheduled_courses WHERE master_course_id IN (SELECT id FROM master_courses WHERE vle_course_id IN ",
    );
    push_in_list(&mut scheduled, vle_course_ids);
    scheduled.push(")");
    scheduled.build().execute(&mut *conn).await?;

    let mut masters = QueryBuilder::<Sqlite>::new("DELETE FROM master_courses WHERE vle_course_id IN ");
    push_in_list(&mut masters, vle_course_ids);
    let result = masters.build().execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

/// Earliest scheduled start date of a master course on or after `today`.
pub async fn next_start_date(
    conn: &mut SqliteConnection,
    master_course_id: &str,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    let raw: Option<String> = sqlx::query_scalar(
        "SELECT MIN(start_date) FROM scheduled_courses WHERE master_course_id = ? AND start_date IS NOT NULL AND start_date >= ?"
    )
    .bind(master_course_id)
    .bind(today)
    .fetch_one(&mut *conn)
    .await?;

    Ok(raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()))
}

// ---------------------------------------------------------------------------
// Scheduled courses
// ---------------------------------------------------------------------------

pub async fn fetch_scheduled_courses(
    conn: &mut SqliteConnection,
    master_course_id: &str,
) -> Result<Vec<ScheduledCourse>, sqlx::Error> {
    sqlx::query_as::<_, ScheduledCourse>(&format!(
        "SELECT {SCHEDULED_COLUMNS} FROM scheduled_courses WHERE master_course_id = ? ORDER BY vle_course_id"
    ))
    .bind(master_course_id)
    .fetch_all(&mut *conn)
    .await
}

/// Global lookup; scheduled-course external ids are unique across masters.
pub async fn find_scheduled_course(
    conn: &mut SqliteConnection,
    vle_course_id: &str,
) -> Result<Option<ScheduledCourse>, sqlx::Error> {
    sqlx::query_as::<_, ScheduledCourse>(&format!(
        "SELECT {SCHEDULED_COLUMNS} FROM scheduled_courses WHERE vle_course_id = ?"
    ))
    .bind(vle_course_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn find_scheduled_course_in(
    conn: &mut SqliteConnection,
    master_course_id: &str,
    vle_course_id: &str,
) -> Result<Option<ScheduledCourse>, sqlx::Error> {
    sqlx::query_as::<_, ScheduledCourse>(&format!(
        "SELECT {SCHEDULED_COLUMNS} FROM scheduled_courses WHERE master_course_id = ? AND vle_course_id = ?"
    ))
    .bind(master_course_id)
    .bind(vle_course_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn scheduled_course_keys(
    conn: &mut SqliteConnection,
    master_course_id: &str,
) -> Result<Vec<ChildKey>, sqlx::Error> {
    sqlx::query_as::<_, ChildKey>(
        r#"
        SELECT
            vle_course_id AS external_id,
            display_name,
            COALESCE(open_date, '') || '|' || COALESCE(start_date, '') || '|' ||
                COALESCE(end_date, '') || '|' || COALESCE(close_date, '') AS signature
        FROM scheduled_courses
        WHERE master_course_id = ?
        "#,
    )
    .bind(master_course_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn insert_scheduled_course(
    conn: &mut SqliteConnection,
    course: &ScheduledCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scheduled_courses (id, master_course_id, vle_course_id, display_name, open_date, start_date, end_date, close_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&course.id)
    .bind(&course.master_course_id)
    .bind(&course.vle_course_id)
    .bind(&course.display_name)
    .bind(course.open_date)
    .bind(course.start_date)
    .bind(course.end_date)
    .bind(course.close_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn save_scheduled_course(
    conn: &mut SqliteConnection,
    course: &ScheduledCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE scheduled_courses SET master_course_id = ?, vle_course_id = ?, display_name = ?, open_date = ?, start_date = ?, end_date = ?, close_date = ? WHERE id = ?"
    )
    .bind(&course.master_course_id)
    .bind(&course.vle_course_id)
    .bind(&course.display_name)
    .bind(course.open_date)
    .bind(course.start_date)
    .bind(course.end_date)
    .bind(course.close_date)
    .bind(&course.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Removes a scheduled course with this external id owned by any master other
/// than `master_course_id`, groups included.
pub async fn delete_scheduled_course_elsewhere(
    conn: &mut SqliteConnection,
    vle_course_id: &str,
    master_course_id: &str,
) -> Result<u64, sqlx::Error> {
    sqlx::query(
        "DELETE FROM scheduled_course_groups WHERE scheduled_course_id IN (SELECT id FROM scheduled_courses WHERE vle_course_id = ? AND master_course_id <> ?)"
    )
    .bind(vle_course_id)
    .bind(master_course_id)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query(
        "DELETE FROM scheduled_courses WHERE vle_course_id = ? AND master_course_id <> ?"
    )
    .bind(vle_course_id)
    .bind(master_course_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Resolves a scheduled course inside one master course.
///
/// The same external id held by another master is deleted first, so the id
/// stays globally unique and the latest snapshot position wins.
pub async fn resolve_scheduled_course(
    conn: &mut SqliteConnection,
    master_course_id: &str,
    vle_course_id: &str,
    rename_from: Option<&str>,
) -> Result<(ScheduledCourse, Resolution), sqlx::Error> {
    let moved = delete_scheduled_course_elsewhere(conn, vle_course_id, master_course_id).await?;
    if moved > 0 {
        tracing::debug!(
            "scheduled course {} moved to master {}, old row deleted",
            vle_course_id,
            master_course_id
        );
    }

    if let Some(course) = find_scheduled_course_in(conn, master_course_id, vle_course_id).await? {
        return Ok((course, Resolution::Found));
    }

    if let Some(old_id) = rename_from {
        if let Some(mut course) = find_scheduled_course_in(conn, master_course_id, old_id).await? {
            course.vle_course_id = vle_course_id.to_string();
            save_scheduled_course(conn, &course).await?;
            return Ok((course, Resolution::Renamed));
        }
    }

    let course = ScheduledCourse::blank(new_id(), master_course_id, vle_course_id);
    insert_scheduled_course(conn, &course).await?;
    Ok((course, Resolution::Created))
}

/// Deletes the named scheduled courses of one master, groups included.
pub async fn delete_scheduled_courses(
    conn: &mut SqliteConnection,
    master_course_id: &str,
    vle_course_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if vle_course_ids.is_empty() {
        return Ok(0);
    }

    let mut groups = QueryBuilder::<Sqlite>::new(
        "DELETE FROM scheduled_course_groups WHERE scheduled_course_id IN (SELECT id FROM scheduled_courses WHERE master_course_id = ",
    );
    groups.push_bind(master_course_id);
    groups.push(" AND vle_course_id IN ");
    push_in_list(&mut groups, vle_course_ids);
    groups.push(")");
    groups.build().execute(&mut *conn).await?;

    let mut scheduled = QueryBuilder::<Sqlite>::new(
        "DELETE FROM scheduled_courses WHERE master_course_id = ",
    );
    scheduled.push_bind(master_course_id);
    scheduled.push(" AND vle_course_id IN ");
    push_in_list(&mut scheduled, vle_course_ids);
    let result = scheduled.build().execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Scheduled-course groups
// ---------------------------------------------------------------------------

pub async fn fetch_groups(
    conn: &mut SqliteConnection,
    scheduled_course_id: &str,
) -> Result<Vec<ScheduledCourseGroup>, sqlx::Error> {
    sqlx::query_as::<_, ScheduledCourseGroup>(&format!(
        "SELECT {GROUP_COLUMNS} FROM scheduled_course_groups WHERE scheduled_course_id = ? ORDER BY vle_group_id"
    ))
    .bind(scheduled_course_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn find_group(
    conn: &mut SqliteConnection,
    scheduled_course_id: &str,
    vle_group_id: &str,
) -> Result<Option<ScheduledCourseGroup>, sqlx::Error> {
    sqlx::query_as::<_, ScheduledCourseGroup>(&format!(
        "SELECT {GROUP_COLUMNS} FROM scheduled_course_groups WHERE scheduled_course_id = ? AND vle_group_id = ?"
    ))
    .bind(scheduled_course_id)
    .bind(vle_group_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn group_keys(
    conn: &mut SqliteConnection,
    scheduled_course_id: &str,
) -> Result<Vec<ChildKey>, sqlx::Error> {
    sqlx::query_as::<_, ChildKey>(
        "SELECT vle_group_id AS external_id, display_name, '' AS signature FROM scheduled_course_groups WHERE scheduled_course_id = ?",
    )
    .bind(scheduled_course_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn insert_group(
    conn: &mut SqliteConnection,
    group: &ScheduledCourseGroup,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scheduled_course_groups (id, scheduled_course_id, vle_group_id, display_name) VALUES (?, ?, ?, ?)"
    )
    .bind(&group.id)
    .bind(&group.scheduled_course_id)
    .bind(&group.vle_group_id)
    .bind(&group.display_name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn save_group(
    conn: &mut SqliteConnection,
    group: &ScheduledCourseGroup,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE scheduled_course_groups SET vle_group_id = ?, display_name = ? WHERE id = ?"
    )
    .bind(&group.vle_group_id)
    .bind(&group.display_name)
    .bind(&group.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn resolve_group(
    conn: &mut SqliteConnection,
    scheduled_course_id: &str,
    vle_group_id: &str,
    rename_from: Option<&str>,
) -> Result<(ScheduledCourseGroup, Resolution), sqlx::Error> {
    if let Some(group) = find_group(conn, scheduled_course_id, vle_group_id).await? {
        return Ok((group, Resolution::Found));
    }

    if let Some(old_id) = rename_from {
        if let Some(mut group) = find_group(conn, scheduled_course_id, old_id).await? {
            group.vle_group_id = vle_group_id.to_string();
            save_group(conn, &group).await?;
            return Ok((group, Resolution::Renamed));
        }
    }

    let group = ScheduledCourseGroup::blank(new_id(), scheduled_course_id, vle_group_id);
    insert_group(conn, &group).await?;
    Ok((group, Resolution::Created))
}

pub async fn delete_groups(
    conn: &mut SqliteConnection,
    scheduled_course_id: &str,
    vle_group_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if vle_group_ids.is_empty() {
        return Ok(0);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "DELETE FROM scheduled_course_groups WHERE scheduled_course_id = ",
    );
    qb.push_bind(scheduled_course_id);
    qb.push(" AND vle_group_id IN ");
    push_in_list(&mut qb, vle_group_ids);
    let result = qb.build().execute(&mut *conn).await?;

    Ok(result.rows_affected())
}
