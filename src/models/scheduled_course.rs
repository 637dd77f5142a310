use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::fields::{lenient_date, lenient_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ScheduledCourse {
    pub id: String,
    pub master_course_id: String,
    pub vle_course_id: String,
    pub display_name: String,
    pub open_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
}

impl ScheduledCourse {
    pub fn blank(id: String, master_course_id: &str, vle_course_id: &str) -> Self {
        Self {
            id,
            master_course_id: master_course_id.to_string(),
            vle_course_id: vle_course_id.to_string(),
            display_name: String::new(),
            open_date: None,
            start_date: None,
            end_date: None,
            close_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ScheduledCourseGroup {
    pub id: String,
    pub scheduled_course_id: String,
    pub vle_group_id: String,
    pub display_name: String,
}

impl ScheduledCourseGroup {
    pub fn blank(id: String, scheduled_course_id: &str, vle_group_id: &str) -> Self {
        Self {
            id,
            scheduled_course_id: scheduled_course_id.to_string(),
            vle_group_id: vle_group_id.to_string(),
            display_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateScheduledCourseRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub master_vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, rename = "opendate", deserialize_with = "lenient_date")]
    pub open_date: Option<NaiveDate>,
    #[serde(default, rename = "startdate", deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, rename = "enddate", deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, rename = "closedate", deserialize_with = "lenient_date")]
    pub close_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateScheduledCourseRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub master_vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub old_vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, rename = "opendate", deserialize_with = "lenient_date")]
    pub open_date: Option<NaiveDate>,
    #[serde(default, rename = "startdate", deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, rename = "enddate", deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, rename = "closedate", deserialize_with = "lenient_date")]
    pub close_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteScheduledCourseRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub master_vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateGroupRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_group_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub old_vle_group_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_group_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteGroupRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_group_id: String,
}
