use serde::Deserialize;

/// `POST /tasks` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// `PUT /tasks/:id` body. An absent field (or `null`) leaves the stored value
/// alone; a present one replaces it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}
