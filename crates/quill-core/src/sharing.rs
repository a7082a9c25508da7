//! Post recommendation emails.

use crate::domain::Post;
use crate::forms::ShareRequest;
use crate::ports::OutgoingMail;

/// Compose the "recommends you read" message for a validated share request.
///
/// `post_url` must already be absolute.
pub fn recommendation_mail(
    share: &ShareRequest,
    post: &Post,
    post_url: &str,
    from: &str,
) -> OutgoingMail {
    let subject = format!(
        "{} ({}) recommends you read {}",
        share.name, share.email, post.title
    );
    let body = format!(
        "Read {} at {}\n\n{}'s comments: {}",
        post.title,
        post_url,
        share.name,
        share.comments.as_deref().unwrap_or_default()
    );

    OutgoingMail {
        from: from.to_string(),
        to: vec![share.to.clone()],
        subject,
        body,
    }
}
