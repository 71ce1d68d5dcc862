use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::api::{ApiResult, Comment, LikeToggle, Post};

/// Applies a successful like toggle to the card and returns the new count.
pub fn apply_like(post: &mut Post, toggle: &LikeToggle) -> i64 {
    let count = match toggle.like_count {
        Some(count) => count.max(0),
        None => {
            let current = post.likes.unwrap_or(0);
            if toggle.liked {
                current + 1
            } else {
                (current - 1).max(0)
            }
        }
    };
    post.likes = Some(count);
    count
}

/// Comment modal state for one post.
#[derive(Debug, Clone, Default)]
pub struct CommentThread {
    post_id: i64,
    comments: Vec<Comment>,
    pub draft: String,
    loaded: bool,
}

impl CommentThread {
    pub fn new(post_id: i64) -> Self {
        Self {
            post_id,
            ..Self::default()
        }
    }

    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Stores a fetched comment list. A failed fetch shows an empty thread.
    pub fn apply_loaded(&mut self, result: ApiResult<Vec<Comment>>) {
        self.comments = match result {
            Ok(comments) => comments,
            Err(err) => {
                warn!(post = self.post_id, "failed to load comments: {err}");
                Vec::new()
            }
        };
        self.loaded = true;
    }

    /// The trimmed draft, or `None` when there is nothing to send.
    pub fn pending_content(&self) -> Option<String> {
        let content = self.draft.trim();
        (!content.is_empty()).then(|| content.to_string())
    }

    /// Applies the result of posting the draft. Returns true when the
    /// comment was added.
    pub fn apply_submitted(&mut self, result: ApiResult<Comment>, post: Option<&mut Post>) -> bool {
        match result {
            Ok(comment) => {
                debug!(post = self.post_id, comment = comment.id, "comment added");
                self.comments.push(comment);
                self.draft.clear();
                if let Some(post) = post {
                    post.comments = Some(post.comments.unwrap_or(0) + 1);
                }
                true
            }
            Err(err) => {
                warn!(post = self.post_id, "failed to add comment: {err}");
                false
            }
        }
    }
}

/// Parses the API's `createdAt`. Offsetless timestamps are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_relative_time(created_at: &str, now: DateTime<Utc>) -> String {
    let Some(ts) = parse_timestamp(created_at) else {
        return created_at.to_string();
    };
    let elapsed = now.signed_duration_since(ts);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };
    match elapsed.num_seconds() {
        s if s < 60 => "just now".to_string(),
        s if s < 60 * 60 => plural(s / 60, "minute"),
        s if s < 24 * 60 * 60 => plural(s / 3600, "hour"),
        _ if elapsed.num_days() < 30 => plural(elapsed.num_days(), "day"),
        _ => ts.format("%Y-%m-%d").to_string(),
    }
}
