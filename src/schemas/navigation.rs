use serde::{Deserialize, Serialize};

use crate::services::route_guard::Decision;

#[derive(Debug, Deserialize)]
pub(crate) struct NavigationQuery {
    pub(crate) path: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NavigationResponse {
    #[serde(flatten)]
    pub(crate) decision: Decision,
    pub(crate) path: String,
}
