//! Public comment intake.
//!
//! Every accepted comment is stored as `pending` and waits for moderation.
//! Submissions are throttled per client IP and per author email.

use crate::ServiceState;
use crate::error::ServiceError;
use crate::types::{Comment, NewComment, is_plausible_email, normalize_email};

const MAX_NAME_LEN: usize = 100;
const MAX_CONTENT_LEN: usize = 5000;

pub struct CommentSubmission {
    pub post_id: String,
    pub name: String,
    pub email: String,
    pub content: String,
}

pub struct CommentService;

impl CommentService {
    /// Validates, rate-limits and stores a comment from `ip`.
    ///
    /// Order: field validation, then the rate limiter, then the post lookup.
    pub async fn submit(
        state: &ServiceState,
        ip: &str,
        submission: CommentSubmission,
    ) -> Result<Comment, ServiceError> {
        let name = submission.name.trim();
        let email = normalize_email(&submission.email);
        let content = submission.content.trim();

        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::BadRequest(format!(
                "Name must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
        if !is_plausible_email(&email) {
            return Err(ServiceError::BadRequest(
                "A valid email address is required".to_owned(),
            ));
        }
        if content.is_empty() || content.chars().count() > MAX_CONTENT_LEN {
            return Err(ServiceError::BadRequest(format!(
                "Comment must be between 1 and {MAX_CONTENT_LEN} characters"
            )));
        }

        let decision = state.rate_limiter().check_rate_limit(ip, &email);
        if !decision.allowed {
            let message = decision
                .error
                .unwrap_or_else(|| "Too many requests".to_owned());
            return match decision.retry_after_seconds {
                Some(retry_after_seconds) => {
                    state.metrics().record_comment_rate_limited();
                    Err(ServiceError::TooManyRequests {
                        message,
                        retry_after_seconds: Some(retry_after_seconds),
                    })
                }
                // Rejected on input (no usable IP), not on volume.
                None => Err(ServiceError::BadRequest(message)),
            };
        }

        let post_id = submission.post_id.trim();
        match state.content().find_post(post_id).await? {
            Some(post) if post.published => {}
            _ => return Err(ServiceError::NotFound("Post not found".to_owned())),
        }

        let comment = state
            .content()
            .create_comment(NewComment {
                post_id: post_id.to_owned(),
                author_name: name.to_owned(),
                author_email: email,
                content: content.to_owned(),
                ip: ip.trim().to_owned(),
            })
            .await?;

        state.metrics().record_comment();
        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "comment received");
        Ok(comment)
    }
}
