use async_trait::async_trait;
use sqlx::SqliteConnection;

use super::{LevelStats, SyncLevel, SyncStats, reconcile};
use crate::db::repository::{self, ChildKey, Resolution};
use crate::models::fields::DATE_FORMAT;
use crate::models::{MasterCourse, ScheduledCourse, ScheduledCourseGroup};
use crate::vle::{GroupItem, MasterCourseItem, ScheduledCourseItem};

/// Root level: every master course, no parent.
pub struct MasterCourseLevel;

#[async_trait]
impl SyncLevel for MasterCourseLevel {
    type Item = MasterCourseItem;
    type Scope = ();
    type Entity = MasterCourse;

    const NAME: &'static str = "master course";

    fn external_id<'a>(&self, item: &'a MasterCourseItem) -> &'a str {
        &item.vle_course_id
    }

    fn display_name<'a>(&self, item: &'a MasterCourseItem) -> &'a str {
        &item.fullname
    }

    fn stats<'a>(&self, stats: &'a mut SyncStats) -> &'a mut LevelStats {
        &mut stats.master_courses
    }

    async fn existing(&self, conn: &mut SqliteConnection, _scope: &()) -> Result<Vec<ChildKey>, sqlx::Error> {
        repository::master_course_keys(conn).await
    }

    async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        _scope: &(),
        external_id: &str,
        rename_from: Option<&str>,
    ) -> Result<(MasterCourse, Resolution), sqlx::Error> {
        repository::resolve_master_course(conn, external_id, rename_from).await
    }

    fn apply(&self, entity: &mut MasterCourse, item: &MasterCourseItem) {
        entity.display_name = item.fullname.clone();
        entity.compulsory = item.compulsory;
        entity.credits = item.credits;
        entity.commitment = item.commitment.clone();
        entity.weeks_duration = item.weeks_duration;
    }

    async fn save(&self, conn: &mut SqliteConnection, entity: &MasterCourse) -> Result<(), sqlx::Error> {
        repository::save_master_course(conn, entity).await
    }

    async fn reconcile_children(
        &self,
        conn: &mut SqliteConnection,
        entity: &MasterCourse,
        item: &MasterCourseItem,
        stats: &mut SyncStats,
    ) -> Result<(), sqlx::Error> {
        match &item.scheduled {
            Some(scheduled) => reconcile(&ScheduledCourseLevel, conn, &entity.id, scheduled, stats).await,
            None => Ok(()),
        }
    }

    async fn delete(
        &self,
        conn: &mut SqliteConnection,
        _scope: &(),
        external_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        repository::delete_master_courses(conn, external_ids).await
    }
}

/// Scheduled courses of one master course, scoped by its surrogate id.
pub struct ScheduledCourseLevel;

#[async_trait]
impl SyncLevel for ScheduledCourseLevel {
    type Item = ScheduledCourseItem;
    type Scope = String;
    type Entity = ScheduledCourse;

    const NAME: &'static str = "scheduled course";

    fn external_id<'a>(&self, item: &'a ScheduledCourseItem) -> &'a str {
        &item.vle_course_id
    }

    fn display_name<'a>(&self, item: &'a ScheduledCourseItem) -> &'a str {
        &item.fullname
    }

    // a run with a different schedule is a new run, not a renamed one
    fn signature(&self, item: &ScheduledCourseItem) -> String {
        [item.open_date, item.start_date, item.end_date, item.close_date]
            .iter()
            .map(|d| d.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|")
    }

    fn stats<'a>(&self, stats: &'a mut SyncStats) -> &'a mut LevelStats {
        &mut stats.scheduled_courses
    }

    async fn existing(&self, conn: &mut SqliteConnection, master_id: &String) -> Result<Vec<ChildKey>, sqlx::Error> {
        repository::scheduled_course_keys(conn, master_id).await
    }

    async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        master_id: &String,
        external_id: &str,
        rename_from: Option<&str>,
    ) -> Result<(ScheduledCourse, Resolution), sqlx::Error> {
        repository::resolve_scheduled_course(conn, master_id, external_id, rename_from).await
    }

    fn apply(&self, entity: &mut ScheduledCourse, item: &ScheduledCourseItem) {
        entity.display_name = item.fullname.clone();
        entity.open_date = item.open_date;
        entity.start_date = item.start_date;
        entity.end_date = item.end_date;
        entity.close_date = item.close_date;
    }

    async fn save(&self, conn: &mut SqliteConnection, entity: &ScheduledCourse) -> Result<(), sqlx::Error> {
        repository::save_scheduled_course(conn, entity).await
    }

    async fn reconcile_children(
        &self,
        conn: &mut SqliteConnection,
        entity: &ScheduledCourse,
        item: &ScheduledCourseItem,
        stats: &mut SyncStats,
    ) -> Result<(), sqlx::Error> {
        match &item.groups {
            Some(groups) => reconcile(&GroupLevel, conn, &entity.id, groups, stats).await,
            None => Ok(()),
        }
    }

    async fn delete(
        &self,
        conn: &mut SqliteConnection,
        master_id: &String,
        external_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        repository::delete_scheduled_courses(conn, master_id, external_ids).await
    }
}

/// Groups of one scheduled course. Ids are only unique within the course.
pub struct GroupLevel;

#[async_trait]
impl SyncLevel for GroupLevel {
    type Item = GroupItem;
    type Scope = String;
    type Entity = ScheduledCourseGroup;

    const NAME: &'static str = "group";

    fn external_id<'a>(&self, item: &'a GroupItem) -> &'a str {
        &item.vle_group_id
    }

    fn display_name<'a>(&self, item: &'a GroupItem) -> &'a str {
        &item.name
    }

    fn stats<'a>(&self, stats: &'a mut SyncStats) -> &'a mut LevelStats {
        &mut stats.groups
    }

    async fn existing(&self, conn: &mut SqliteConnection, scheduled_id: &String) -> Result<Vec<ChildKey>, sqlx::Error> {
        repository::group_keys(conn, scheduled_id).await
    }

    async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        scheduled_id: &String,
        external_id: &str,
        rename_from: Option<&str>,
    ) -> Result<(ScheduledCourseGroup, Resolution), sqlx::Error> {
        repository::resolve_group(conn, scheduled_id, external_id, rename_from).await
    }

    fn apply(&self, entity: &mut ScheduledCourseGroup, item: &GroupItem) {
        entity.display_name = item.name.clone();
    }

    async fn save(&self, conn: &mut SqliteConnection, entity: &ScheduledCourseGroup) -> Result<(), sqlx::Error> {
        repository::save_group(conn, entity).await
    }

    async fn delete(
        &self,
        conn: &mut SqliteConnection,
        scheduled_id: &String,
        external_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        repository::delete_groups(conn, scheduled_id, external_ids).await
    }
}
