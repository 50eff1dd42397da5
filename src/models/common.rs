use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 错误响应统一格式
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
