//! The authenticated user.

use api_types::user::Me;
use axum::{Extension, Json};
use engine::User;

/// Who the credentials belong to.
pub async fn me(Extension(user): Extension<User>) -> Json<Me> {
    Json(Me {
        username: user.username,
        role: user.role.as_str().to_string(),
    })
}
