pub(crate) mod activities;
pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod forum;
pub(crate) mod recordings;
pub(crate) mod users;
