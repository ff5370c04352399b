use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cars::repo_types::Car;

/// Fields collected from a multipart car form. Absent text fields stay `None`
/// so updates can tell "not sent" from "sent empty".
#[derive(Debug, Default)]
pub struct CarForm {
    pub company: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>, // comma separated
    pub images: Vec<Bytes>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CarEnvelope {
    pub message: String,
    pub car: Car,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
