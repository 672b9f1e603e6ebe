//! Marketing and editorial content: banners, CMS blocks, articles,
//! subscribers and sales-chat logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    ArticleCategory, ArticleId, ArticleStatus, BannerId, ChatLogId, DiscountBannerId, Email,
    SubscriberId,
};

/// A hero banner on the home page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(rename = "_id")]
    pub id: BannerId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A promotional banner advertising a discount.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DiscountBanner {
    #[serde(rename = "_id")]
    pub id: DiscountBannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub discount: Option<String>,
    pub category: Option<String>,
    pub image: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable copy for a storefront page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CmsContent {
    #[serde(default = "default_page_name")]
    pub page_name: String,
    #[serde(default)]
    pub hero_title: String,
    #[serde(default)]
    pub hero_description: String,
    #[serde(default)]
    pub seo_footer_title: String,
    #[serde(default)]
    pub seo_footer_description: String,
}

fn default_page_name() -> String {
    "home".to_string()
}

/// A blog article.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: ArticleCategory,
    pub image: Option<String>,
    pub author: String,
    pub views: i32,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of the article list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub total_pages: i64,
    pub current_page: i64,
}

/// A newsletter subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(rename = "_id")]
    pub id: SubscriberId,
    pub email: Email,
    #[serde(skip)]
    pub unsubscribe_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored sales-chat exchange.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatLog {
    #[serde(rename = "_id")]
    pub id: ChatLogId,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

/// Turn an article title into a URL slug: lower-case ASCII words joined by
/// single hyphens.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Best Laptops of 2025!"), "best-laptops-of-2025");
        assert_eq!(slugify("  --Ryzen vs. Core i7-- "), "ryzen-vs-core-i7");
        assert_eq!(slugify("¿¿??"), "article");
    }

    #[test]
    fn test_cms_defaults_on_partial_body() {
        let cms: CmsContent = serde_json::from_str(r#"{"heroTitle":"Spring sale"}"#).unwrap();
        assert_eq!(cms.page_name, "home");
        assert_eq!(cms.hero_title, "Spring sale");
        assert!(cms.seo_footer_title.is_empty());
    }

    #[test]
    fn test_subscriber_json_hides_token() {
        let sub = Subscriber {
            id: SubscriberId::new(1),
            email: Email::parse("reader@example.com").unwrap(),
            unsubscribe_token: Some("ab".repeat(32)),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&sub).unwrap();
        assert!(json.contains("reader@example.com"));
        assert!(!json.contains("abab"));
    }
}
