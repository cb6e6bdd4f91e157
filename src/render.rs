//! Server-rendered HTML for the dashboard page
use crate::models::{Relevance, SuggestedPost};

const EMPTY_STATE: &str = r#"<p class="empty">
    No recommendations yet. Like posts or follow writers to get suggestions.
</p>"#;

fn badge_class(relevance: Relevance) -> &'static str {
    match relevance {
        Relevance::FollowedAuthor => "badge badge-followed",
        Relevance::Category => "badge badge-category",
        Relevance::Tag => "badge badge-tag",
    }
}

fn render_suggestion(post: &SuggestedPost) -> String {
    let category = post
        .category_name
        .as_deref()
        .map(|name| {
            format!(
                r#"<span class="category">{}</span>"#,
                html_escape::encode_text(name)
            )
        })
        .unwrap_or_default();

    let published = post
        .published_at
        .map(|at| {
            format!(
                r#"<time datetime="{}">{}</time>"#,
                at.to_rfc3339(),
                at.format("%b %-d, %Y")
            )
        })
        .unwrap_or_default();

    format!(
        r#"<li class="suggestion">
  <a href="/api/v1/posts/{id}">{title}</a>
  <span class="{badge}">{label}</span>
  <div class="meta">by {author} {category} {published}</div>
</li>"#,
        id = post.id,
        title = html_escape::encode_text(&post.title),
        badge = badge_class(post.relevance),
        label = html_escape::encode_text(&post.relevance_label),
        author = html_escape::encode_text(&post.author_username),
        category = category,
        published = published,
    )
}

/// Full dashboard page for one viewer
pub fn render_dashboard(site_name: &str, suggestions: &[SuggestedPost]) -> String {
    let site_name = html_escape::encode_text(site_name);

    let body = if suggestions.is_empty() {
        EMPTY_STATE.to_string()
    } else {
        let items: Vec<String> = suggestions.iter().map(render_suggestion).collect();
        format!(
            "<ul class=\"suggestions\">\n{}\n</ul>",
            items.join("\n")
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{site_name} · Dashboard</title>
<style>
  body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; }}
  .suggestions {{ list-style: none; padding: 0; }}
  .suggestion {{ padding: .75rem 0; border-bottom: 1px solid #eee; }}
  .badge {{ font-size: .75rem; padding: .1rem .4rem; border-radius: .25rem; margin-left: .5rem; }}
  .badge-followed {{ background: #dbeafe; }}
  .badge-category {{ background: #dcfce7; }}
  .badge-tag {{ background: #fef9c3; }}
  .meta {{ color: #666; font-size: .85rem; }}
</style>
</head>
<body>
<h1>{site_name}</h1>
<section>
<h2>Suggested for you</h2>
{body}
</section>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn suggestion(title: &str, relevance: Relevance) -> SuggestedPost {
        SuggestedPost {
            id: 12,
            title: title.to_string(),
            author_id: 3,
            author_username: "ana".to_string(),
            category_name: Some("Tech".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap()),
            relevance_score: relevance.score(),
            relevance,
            relevance_label: relevance.label().to_string(),
        }
    }

    #[test]
    fn test_empty_state() {
        let html = render_dashboard("Quillpost", &[]);
        assert!(html.contains("<h1>Quillpost</h1>"));
        assert!(html.contains("No recommendations yet"));
        assert!(!html.contains("<ul class=\"suggestions\">"));
    }

    #[test]
    fn test_suggestions_render_with_badges() {
        let html = render_dashboard(
            "Quillpost",
            &[
                suggestion("Async Rust", Relevance::FollowedAuthor),
                suggestion("Lifetimes", Relevance::Tag),
            ],
        );
        assert!(html.contains("href=\"/api/v1/posts/12\""));
        assert!(html.contains("badge badge-followed\">from followed user"));
        assert!(html.contains("badge badge-tag\">matching tag"));
        assert!(html.contains("Mar 9, 2025"));
        assert!(html.find("Async Rust") < html.find("Lifetimes"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let html = render_dashboard(
            "<b>Site</b>",
            &[suggestion("<script>alert(1)</script>", Relevance::Category)],
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;Site&lt;/b&gt;"));
    }
}
