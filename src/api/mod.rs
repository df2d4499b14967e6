pub(crate) mod activities;
pub(crate) mod auth;
pub(crate) mod contact;
pub(crate) mod courses;
pub(crate) mod dashboard;
pub(crate) mod enrollments;
pub(crate) mod errors;
pub(crate) mod forum;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod navigation;
pub(crate) mod pagination;
pub(crate) mod recordings;
pub(crate) mod router;
pub(crate) mod users;
pub(crate) mod validation;
