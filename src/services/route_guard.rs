//! Navigation decisions for the dashboard route trees.
//!
//! Unauthenticated visitors are kept out of `/dashboard/**`, signed-in users
//! are bounced from the login area to their role home. When the role lookup
//! fails the guard lets the visitor through to the student home instead of
//! blocking navigation.

use serde::Serialize;

use crate::db::types::UserRole;

pub(crate) const LOGIN_PATH: &str = "/auth/login";
pub(crate) const STUDENT_HOME: &str = "/dashboard/student";
pub(crate) const TEACHER_HOME: &str = "/dashboard/teacher";

/// What the guard knows about the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Anonymous,
    /// Signed in; `role` is `None` when the profile lookup failed.
    Authenticated { role: Option<UserRole> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum Decision {
    Allow,
    Redirect { location: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteClass {
    Public,
    Login,
    DashboardRoot,
    StudentTree,
    TeacherTree,
    OtherDashboard,
}

pub(crate) fn home_path(role: Option<UserRole>) -> &'static str {
    match role {
        Some(UserRole::Teacher) => TEACHER_HOME,
        _ => STUDENT_HOME,
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn in_tree(path: &str, root: &str) -> bool {
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

fn classify(path: &str) -> RouteClass {
    let path = normalize(path);
    if path == "/auth" || path == LOGIN_PATH {
        RouteClass::Login
    } else if path == "/dashboard" {
        RouteClass::DashboardRoot
    } else if in_tree(path, STUDENT_HOME) {
        RouteClass::StudentTree
    } else if in_tree(path, TEACHER_HOME) {
        RouteClass::TeacherTree
    } else if in_tree(path, "/dashboard") {
        RouteClass::OtherDashboard
    } else {
        RouteClass::Public
    }
}

pub(crate) fn decide(path: &str, session: SessionState) -> Decision {
    let class = classify(path);

    let role = match session {
        SessionState::Anonymous => {
            return match class {
                RouteClass::Public | RouteClass::Login => Decision::Allow,
                _ => Decision::Redirect { location: LOGIN_PATH },
            };
        }
        SessionState::Authenticated { role } => role,
    };

    let home = home_path(role);
    match class {
        RouteClass::Public => Decision::Allow,
        RouteClass::Login | RouteClass::DashboardRoot | RouteClass::OtherDashboard => {
            Decision::Redirect { location: home }
        }
        // Unknown role: fail open.
        _ if role.is_none() => Decision::Allow,
        RouteClass::StudentTree => match role {
            Some(UserRole::Teacher) => Decision::Redirect { location: TEACHER_HOME },
            _ => Decision::Allow,
        },
        RouteClass::TeacherTree => match role {
            Some(UserRole::Teacher | UserRole::Admin) => Decision::Allow,
            _ => Decision::Redirect { location: STUDENT_HOME },
        },
    }
}
