use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::fields::{lenient_count, lenient_flag, lenient_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MasterCourse {
    pub id: String,
    pub vle_course_id: String,
    pub display_name: String,
    pub compulsory: bool,
    pub commitment: String,
    pub credits: Option<u32>,
    pub weeks_duration: Option<u32>,
}

impl MasterCourse {
    /// A blank course waiting for its attributes.
    pub fn blank(id: String, vle_course_id: &str) -> Self {
        Self {
            id,
            vle_course_id: vle_course_id.to_string(),
            display_name: String::new(),
            compulsory: false,
            commitment: String::new(),
            credits: None,
            weeks_duration: None,
        }
    }
}

/// Listing row: a master course plus its next upcoming start date.
#[derive(Debug, Clone, Serialize)]
pub struct MasterCourseSummary {
    #[serde(flatten)]
    pub course: MasterCourse,
    pub next_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMasterCourseRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub compulsory: bool,
    #[serde(default, deserialize_with = "lenient_count")]
    pub credits: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub commitment: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub weeks_duration: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMasterCourseRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub old_vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub compulsory: bool,
    #[serde(default, deserialize_with = "lenient_count")]
    pub credits: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub commitment: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub weeks_duration: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteMasterCourseRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub vle_course_id: String,
}
