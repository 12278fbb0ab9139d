//! Public comment submission.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use inkboard_service::comments::{CommentService, CommentSubmission};

use crate::error::{ApiError, ErrorBody};
use crate::extract::ClientIp;
use crate::state::AppState;
use crate::types::{CommentBody, CommentResponse};

/// Submit a comment for moderation.
///
/// Limited to 5 per IP per 15 minutes and 3 per email per hour. A rejected
/// submission gets 429 with a `Retry-After` header in seconds.
#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CommentBody,
    responses(
        (status = 201, description = "Comment stored as pending", body = CommentResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
    ),
    tag = "Comments"
)]
pub async fn submit_comment(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<CommentBody>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let comment = CommentService::submit(
        &state,
        &ip,
        CommentSubmission {
            post_id: body.post_id,
            name: body.name,
            email: body.email,
            content: body.content,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment.id,
            status: comment.status,
        }),
    ))
}
