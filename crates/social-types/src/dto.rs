//! Request and response DTOs for the HTTP surface, plus decay sweep job state.

use crate::{FollowEdge, Recommendation, WeightChange};
use serde::{Deserialize, Serialize};

/// Interaction request (`POST /api/interact`). `type` is parsed leniently by the handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractRequest {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Direct edge mutation (`POST /api/follow`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRequest {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// Add-user request (`POST /api/user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddUserRequest {
    pub name: String,
}

/// Base response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

pub type RecommendResponse = BaseResponse<Vec<Recommendation>>;
pub type InteractResponse = BaseResponse<WeightChange>;
pub type GraphResponse = BaseResponse<Vec<FollowEdge>>;
pub type MessageResponse = BaseResponse<serde_json::Value>;
pub type SweepStatusResponse = BaseResponse<SweepJob>;

/// Decay sweep job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// Decay sweep job record (pollable by id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepJob {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges_decayed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
