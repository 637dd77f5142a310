#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use programmes::db::{self, repository};
use programmes::error::AppError;
use programmes::models::{EnrolmentSnapshot, MasterCourse, ScheduledCourse, ScheduledCourseGroup};
use programmes::state::AppState;
use programmes::vle::{MasterCourseItem, VleClient};

/// A VLE whose snapshot and enrolments are set by the test.
pub struct FakeVle {
    snapshot: Mutex<Result<Value, String>>,
    enrolments: Mutex<EnrolmentSnapshot>,
}

impl FakeVle {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(Ok(Value::Array(Vec::new()))),
            enrolments: Mutex::new(EnrolmentSnapshot::default()),
        }
    }

    pub fn set_snapshot(&self, snapshot: Value) {
        *self.snapshot.lock().unwrap() = Ok(snapshot);
    }

    pub fn fail_with(&self, message: &str) {
        *self.snapshot.lock().unwrap() = Err(message.to_string());
    }

    pub fn set_enrolments(&self, enrolments: Value) {
        *self.enrolments.lock().unwrap() =
            serde_json::from_value(enrolments).expect("Invalid enrolments fixture");
    }
}

#[async_trait]
impl VleClient for FakeVle {
    async fn fetch_snapshot(&self) -> Result<Vec<MasterCourseItem>, AppError> {
        let snapshot = self.snapshot.lock().unwrap().clone();
        match snapshot {
            Ok(value) => serde_json::from_value(value).map_err(|e| AppError::Upstream(e.to_string())),
            Err(message) => Err(AppError::Upstream(message)),
        }
    }

    async fn fetch_enrolments(&self, _username: &str, _role: &str) -> Result<EnrolmentSnapshot, AppError> {
        Ok(self.enrolments.lock().unwrap().clone())
    }
}

pub async fn test_state() -> (AppState, Arc<FakeVle>) {
    let pool = db::connect_in_memory().await.expect("Failed to create test db");
    let vle = Arc::new(FakeVle::new());
    (AppState::new(pool, vle.clone()), vle)
}

pub fn items(snapshot: Value) -> Vec<MasterCourseItem> {
    serde_json::from_value(snapshot).expect("Invalid snapshot fixture")
}

pub async fn seed_master(pool: &SqlitePool, vle_course_id: &str, name: &str) -> MasterCourse {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    let mut course = MasterCourse::blank(Uuid::new_v4().to_string(), vle_course_id);
    course.display_name = name.to_string();
    repository::insert_master_course(&mut conn, &course)
        .await
        .expect("Failed to seed master course");
    course
}

pub async fn seed_scheduled(
    pool: &SqlitePool,
    master: &MasterCourse,
    vle_course_id: &str,
    name: &str,
) -> ScheduledCourse {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    let mut course = ScheduledCourse::blank(Uuid::new_v4().to_string(), &master.id, vle_course_id);
    course.display_name = name.to_string();
    repository::insert_scheduled_course(&mut conn, &course)
        .await
        .expect("Failed to seed scheduled course");
    course
}

pub async fn seed_group(
    pool: &SqlitePool,
    scheduled: &ScheduledCourse,
    vle_group_id: &str,
    name: &str,
) -> ScheduledCourseGroup {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    let mut group = ScheduledCourseGroup::blank(Uuid::new_v4().to_string(), &scheduled.id, vle_group_id);
    group.display_name = name.to_string();
    repository::insert_group(&mut conn, &group)
        .await
        .expect("Failed to seed group");
    group
}

pub async fn master(pool: &SqlitePool, vle_course_id: &str) -> Option<MasterCourse> {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    repository::find_master_course(&mut conn, vle_course_id)
        .await
        .expect("Failed to query master course")
}

pub async fn all_masters(pool: &SqlitePool) -> Vec<MasterCourse> {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    repository::fetch_master_courses(&mut conn)
        .await
        .expect("Failed to query master courses")
}

pub async fn scheduled(pool: &SqlitePool, vle_course_id: &str) -> Option<ScheduledCourse> {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    repository::find_scheduled_course(&mut conn, vle_course_id)
        .await
        .expect("Failed to query scheduled course")
}

pub async fn scheduled_of(pool: &SqlitePool, master: &MasterCourse) -> Vec<ScheduledCourse> {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    repository::fetch_scheduled_courses(&mut conn, &master.id)
        .await
        .expect("Failed to query scheduled courses")
}

pub async fn groups_of(pool: &SqlitePool, scheduled: &ScheduledCourse) -> Vec<ScheduledCourseGroup> {
    let mut conn = pool.acquire().await.expect("Failed to acquire");
    repository::fetch_groups(&mut conn, &scheduled.id)
        .await
        .expect("Failed to query groups")
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}
