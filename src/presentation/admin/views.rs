use askama::Template;
use time::{Duration, OffsetDateTime};

use crate::{
    application::{editor::Command, preview::truncate_preview, sanitize::sanitize_post_html},
    domain::posts::BlogPost,
};

use super::super::views::{format_date, iso_date};

#[derive(Clone)]
pub struct AdminChrome {
    pub brand: String,
    pub title: String,
}

impl AdminChrome {
    pub fn new(site_name: &str, title: impl Into<String>) -> Self {
        Self {
            brand: format!("{site_name} Admin"),
            title: title.into(),
        }
    }
}

#[derive(Clone)]
pub struct AdminLayout<T> {
    pub chrome: AdminChrome,
    pub asset_version: String,
    pub content: T,
}

impl<T> AdminLayout<T> {
    pub fn new(chrome: AdminChrome, content: T) -> Self {
        Self {
            chrome,
            asset_version: asset_version(),
            content,
        }
    }
}

fn asset_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[derive(Clone)]
pub struct AdminPostRowView {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub created: String,
    pub created_iso: String,
    pub created_relative: String,
    pub edit_href: String,
    pub delete_href: String,
}

impl AdminPostRowView {
    pub fn from_post(post: &BlogPost, now: OffsetDateTime) -> Self {
        let id = post.id.to_string();
        Self {
            edit_href: format!("/admin/edit/{id}"),
            delete_href: format!("/admin/posts/{id}/delete"),
            id,
            title: post.title.clone(),
            preview: truncate_preview(&post.content, 150),
            created: format_date(post.created_at),
            created_iso: iso_date(post.created_at),
            created_relative: relative_age(post.created_at, now),
        }
    }
}

/// List screen: either rows, the empty state, or an inline error.
pub struct AdminPostListView {
    pub rows: Vec<AdminPostRowView>,
    pub error: Option<String>,
}

impl AdminPostListView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.error.is_none()
    }
}

#[derive(Template)]
#[template(path = "admin/posts.html")]
pub struct AdminPostListTemplate {
    pub view: AdminLayout<AdminPostListView>,
}

#[derive(Clone)]
pub struct EditorToolbarButton {
    pub command: &'static str,
    pub label: &'static str,
    pub prompt: Option<&'static str>,
}

/// Toolbar buttons in display order. Names match `Command::parse`.
pub fn editor_toolbar() -> Vec<EditorToolbarButton> {
    Command::TOOLBAR
        .iter()
        .map(|&(command, label)| EditorToolbarButton {
            command,
            label,
            prompt: match command {
                "link" => Some("Link URL"),
                "image" => Some("Image URL"),
                _ => None,
            },
        })
        .collect()
}

/// Create and edit share one form; values are echoed back after a failed submit.
///
/// `content` is always sanitized, since the editor surface renders it as live markup.
pub struct AdminPostFormView {
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub error: Option<String>,
    pub toolbar: Vec<EditorToolbarButton>,
}

impl AdminPostFormView {
    pub fn create() -> Self {
        Self {
            heading: "Create New Post",
            action: "/admin/new".to_string(),
            submit_label: "Create Post",
            title: String::new(),
            content: String::new(),
            image_url: String::new(),
            error: None,
            toolbar: editor_toolbar(),
        }
    }

    /// Edit form prefilled from the stored post, including its current image URL.
    pub fn edit(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            content: sanitize_post_html(&post.content),
            image_url: post.image_url.clone().unwrap_or_default(),
            ..Self::editing(post.id.as_str())
        }
    }

    pub fn editing(id: &str) -> Self {
        Self {
            heading: "Edit Post",
            action: format!("/admin/edit/{id}"),
            submit_label: "Update Post",
            title: String::new(),
            content: String::new(),
            image_url: String::new(),
            error: None,
            toolbar: editor_toolbar(),
        }
    }

    pub fn with_values(
        mut self,
        title: String,
        content: String,
        image_url: String,
        error: impl Into<String>,
    ) -> Self {
        self.title = title;
        self.content = sanitize_post_html(&content);
        self.image_url = image_url;
        self.error = Some(error.into());
        self
    }
}

#[derive(Template)]
#[template(path = "admin/post_form.html")]
pub struct AdminPostFormTemplate {
    pub view: AdminLayout<AdminPostFormView>,
}

pub struct AdminDeleteConfirmView {
    pub title: String,
    pub action: String,
}

#[derive(Template)]
#[template(path = "admin/delete_confirm.html")]
pub struct AdminDeleteConfirmTemplate {
    pub view: AdminLayout<AdminDeleteConfirmView>,
}

/// Terminal state for a missing post or a failed load.
pub struct AdminMessageView {
    pub heading: &'static str,
    pub message: String,
}

#[derive(Template)]
#[template(path = "admin/message.html")]
pub struct AdminMessageTemplate {
    pub view: AdminLayout<AdminMessageView>,
}

/// `5 minutes ago`, `about 3 hours ago`, `2 days ago`.
pub fn relative_age(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - then;
    if elapsed < Duration::minutes(1) {
        return "less than a minute ago".to_string();
    }
    let (count, unit, about) = if elapsed < Duration::hours(1) {
        (elapsed.whole_minutes(), "minute", false)
    } else if elapsed < Duration::days(1) {
        (elapsed.whole_hours(), "hour", true)
    } else if elapsed < Duration::days(30) {
        (elapsed.whole_days(), "day", false)
    } else if elapsed < Duration::days(365) {
        (elapsed.whole_days() / 30, "month", false)
    } else {
        (elapsed.whole_days() / 365, "year", true)
    };
    let plural = if count == 1 { "" } else { "s" };
    let prefix = if about { "about " } else { "" };
    format!("{prefix}{count} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn relative_age_picks_the_largest_unit() {
        let now = datetime!(2024-06-10 12:00 UTC);
        assert_eq!(
            relative_age(datetime!(2024-06-10 11:59:30 UTC), now),
            "less than a minute ago"
        );
        assert_eq!(relative_age(datetime!(2024-06-10 11:55 UTC), now), "5 minutes ago");
        assert_eq!(relative_age(datetime!(2024-06-10 11:00 UTC), now), "about 1 hour ago");
        assert_eq!(relative_age(datetime!(2024-06-08 12:00 UTC), now), "2 days ago");
        assert_eq!(relative_age(datetime!(2024-03-10 12:00 UTC), now), "3 months ago");
        assert_eq!(relative_age(datetime!(2022-06-01 12:00 UTC), now), "about 2 years ago");
    }

    #[test]
    fn toolbar_names_parse_as_commands() {
        for button in editor_toolbar() {
            let arg = button.prompt.map(|_| "https://example.com");
            assert!(
                Command::parse(button.command, arg).is_some(),
                "{} should parse",
                button.command
            );
        }
    }
}
