use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Programme {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Stage {
    pub id: String,
    pub programme_id: String,
    pub display_name: String,
    pub stage_order: u32,
}

/// A master course offered by a programme, joined with the course's external id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProgrammeMasterCourse {
    pub id: String,
    pub programme_id: String,
    pub master_course_id: String,
    pub master_vle_course_id: String,
    pub stage_id: Option<String>,
    pub available: bool,
    pub display_order: u32,
}

/// Membership of a user in a programme, joined with the programme name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserProgramme {
    pub id: String,
    pub username: String,
    pub programme_id: String,
    pub programme_display_name: String,
}

/// One scheduled course the VLE reports a user as enrolled on.
///
/// Only `masteridnumber` is interpreted; every other field is passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolledCourse {
    pub masteridnumber: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrolmentSnapshot {
    #[serde(default)]
    pub courses: Vec<EnrolledCourse>,
    #[serde(default)]
    pub module_completions: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgrammeCourses {
    pub id: String,
    pub display_name: String,
    pub courses: Vec<EnrolledCourse>,
}
