use serde::{Deserialize, Serialize};

use crate::utils::{strip_html, truncate_string};

/// Characters shown in list excerpts
const EXCERPT_LENGTH: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl BlogPost {
    /// The summary if present, else the start of the content as plain text.
    pub fn excerpt(&self) -> String {
        match self.summary.as_deref() {
            Some(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            _ => truncate_string(&strip_html(&self.content), EXCERPT_LENGTH),
        }
    }
}

/// Body for creating or updating a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct BlogPostInput {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_with_defaults() {
        let post: BlogPost = serde_json::from_str(r#"{"id": 3, "title": "Hello"}"#)
            .expect("Failed to parse post test JSON");
        assert_eq!(post.id, 3);
        assert!(post.tags.is_empty());
        assert!(!post.published);
    }

    #[test]
    fn test_excerpt_prefers_summary() {
        let post = BlogPost {
            id: 1,
            title: "t".into(),
            slug: None,
            content: "<p>Body text</p>".into(),
            summary: Some("  Short  ".into()),
            tags: vec![],
            published: true,
            cover_image: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(post.excerpt(), "Short");

        let post = BlogPost { summary: None, ..post };
        assert_eq!(post.excerpt(), "Body text");
    }

    #[test]
    fn test_input_skips_empty_optionals() {
        let input = BlogPostInput {
            title: "t".into(),
            content: "c".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("summary").is_none());
        assert_eq!(value["published"], false);
    }
}
