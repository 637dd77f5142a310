pub mod fields;
pub mod master_course;
pub mod programme;
pub mod scheduled_course;

pub use master_course::{
    CreateMasterCourseRequest, DeleteMasterCourseRequest, MasterCourse, MasterCourseSummary,
    UpdateMasterCourseRequest,
};
pub use programme::{
    EnrolledCourse, EnrolmentSnapshot, Programme, ProgrammeCourses, ProgrammeMasterCourse,
    Stage, UserProgramme,
};
pub use scheduled_course::{
    CreateGroupRequest, CreateScheduledCourseRequest, DeleteGroupRequest,
    DeleteScheduledCourseRequest, ScheduledCourse, ScheduledCourseGroup, UpdateGroupRequest,
    UpdateScheduledCourseRequest,
};
