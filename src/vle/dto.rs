use serde::Deserialize;

use crate::models::fields::{lenient_count, lenient_date, lenient_flag, lenient_text};
use chrono::NaiveDate;

/// One master course in the sync snapshot.
///
/// A missing `scheduled` key is kept as `None` so existing scheduled courses are
/// left alone; an explicit list, even an empty one, is authoritative.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterCourseItem {
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fullname: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub weeks_duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub compulsory: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub commitment: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub credits: Option<u32>,
    #[serde(default)]
    pub scheduled: Option<Vec<ScheduledCourseItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledCourseItem {
    pub vle_course_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fullname: String,
    #[serde(default, rename = "opendate", deserialize_with = "lenient_date")]
    pub open_date: Option<NaiveDate>,
    #[serde(default, rename = "startdate", deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, rename = "enddate", deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, rename = "closedate", deserialize_with = "lenient_date")]
    pub close_date: Option<NaiveDate>,
    #[serde(default)]
    pub groups: Option<Vec<GroupItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupItem {
    pub vle_group_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
}

/// Body of a non-200 response from the VLE.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_master_item_null_coercion() {
        let item: MasterCourseItem = serde_json::from_value(json!({
            "vle_course_id": "001",
            "fullname": "How to make a lantern",
            "weeks_duration": null,
            "compulsory": null,
            "commitment": null,
            "credits": "",
            "scheduled": []
        }))
        .expect("Failed to parse item");

        assert_eq!(item.weeks_duration, None);
        assert!(!item.compulsory);
        assert_eq!(item.commitment, "");
        assert_eq!(item.credits, None);
        assert_eq!(item.scheduled.map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_missing_nested_keys_stay_none() {
        let item: MasterCourseItem = serde_json::from_value(json!({
            "vle_course_id": "001",
            "fullname": "F"
        }))
        .expect("Failed to parse item");
        assert!(item.scheduled.is_none());

        let scheduled: ScheduledCourseItem = serde_json::from_value(json!({
            "vle_course_id": "001/01",
            "fullname": "How to gather wood",
            "opendate": "2015-01-01",
            "startdate": "01/02/2015",
            "enddate": 42,
            "closedate": null
        }))
        .expect("Failed to parse scheduled item");
        assert!(scheduled.groups.is_none());
        assert_eq!(scheduled.open_date, NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(scheduled.start_date, None);
        assert_eq!(scheduled.end_date, None);
        assert_eq!(scheduled.close_date, None);
    }
}
