//! Journal entries and visitor feedback.
//!
//! Plain in-memory records. Whether a caller may change them is decided at
//! the web layer; nothing here knows about authentication.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::{JourneyError, Result};

/// A journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// Entry text.
    pub content: String,
    /// `#tags` found in the content, lower-cased.
    pub tags: Vec<String>,
    /// Creation time.
    pub date: DateTime<Utc>,
    /// Last edit time.
    pub edited_at: Option<DateTime<Utc>>,
}

/// A visitor's feedback message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Feedback ID.
    pub id: Uuid,
    /// Message text.
    pub message: String,
    /// Optional 1-5 rating.
    pub rating: Option<u8>,
    /// Optional emoji reaction.
    pub emoji: Option<String>,
    /// Submission time.
    pub timestamp: DateTime<Utc>,
}

/// Filter for listing posts.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Case-insensitive substring of the content or a tag.
    pub search: Option<String>,
    /// Exact tag, with or without the leading `#`.
    pub tag: Option<String>,
}

impl PostFilter {
    fn matches(&self, post: &Post) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let search = search.to_lowercase();
            let hit = post.content.to_lowercase().contains(&search)
                || post.tags.iter().any(|t| t.contains(&search));
            if !hit {
                return false;
            }
        }

        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            let tag = tag.trim_start_matches('#').to_lowercase();
            if !post.tags.iter().any(|t| t[1..] == tag) {
                return false;
            }
        }

        true
    }
}

/// Extract unique `#tags` from text, lower-cased, in order of appearance.
///
/// # Examples
///
/// ```
/// use journeylog::journal::extract_tags;
///
/// assert_eq!(
///     extract_tags("Learning #Rust and #axum, more #rust tomorrow"),
///     vec!["#rust", "#axum"]
/// );
/// ```
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut rest = content;

    while let Some(pos) = rest.find('#') {
        rest = &rest[pos + 1..];
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());

        if end > 0 {
            let tag = format!("#{}", rest[..end].to_lowercase());
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        rest = &rest[end..];
    }

    tags
}

/// In-memory store of posts and feedback.
#[derive(Debug)]
pub struct Journal {
    posts: RwLock<Vec<Post>>,
    feedback: RwLock<Vec<Feedback>>,
    clock: Arc<dyn Clock>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty journal with a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            posts: RwLock::new(Vec::new()),
            feedback: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Posts matching `filter`, newest first.
    pub async fn list_posts(&self, filter: &PostFilter) -> Vec<Post> {
        let posts = self.posts.read().await;
        let mut result: Vec<Post> = posts.iter().filter(|p| filter.matches(p)).cloned().collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        result
    }

    /// Get a post by ID.
    pub async fn get_post(&self, id: Uuid) -> Result<Post> {
        self.posts
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| JourneyError::NotFound("post".to_string()))
    }

    /// Create a post.
    pub async fn create_post(&self, content: &str) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            content: content.to_string(),
            tags: extract_tags(content),
            date: self.clock.now(),
            edited_at: None,
        };

        self.posts.write().await.push(post.clone());
        tracing::info!(post_id = %post.id, tags = post.tags.len(), "Post created");
        post
    }

    /// Replace a post's content.
    pub async fn update_post(&self, id: Uuid, content: &str) -> Result<Post> {
        let mut posts = self.posts.write().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| JourneyError::NotFound("post".to_string()))?;

        post.content = content.to_string();
        post.tags = extract_tags(content);
        post.edited_at = Some(self.clock.now());

        tracing::info!(post_id = %id, "Post updated");
        Ok(post.clone())
    }

    /// Delete a post.
    pub async fn delete_post(&self, id: Uuid) -> Result<()> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);

        if posts.len() == before {
            return Err(JourneyError::NotFound("post".to_string()));
        }

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Record visitor feedback.
    pub async fn add_feedback(
        &self,
        message: &str,
        rating: Option<u8>,
        emoji: Option<String>,
    ) -> Feedback {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            message: message.to_string(),
            rating,
            emoji,
            timestamp: self.clock.now(),
        };

        self.feedback.write().await.push(feedback.clone());
        tracing::debug!(feedback_id = %feedback.id, "Feedback received");
        feedback
    }

    /// All feedback, newest first.
    pub async fn list_feedback(&self) -> Vec<Feedback> {
        let mut result = self.feedback.read().await.clone();
        result.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        result
    }
}
