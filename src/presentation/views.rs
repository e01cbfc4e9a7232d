use crate::{
    application::{
        error::{ErrorReport, HttpError},
        preview::{meta_description, truncate_preview},
        sanitize::sanitize_post_html,
    },
    config::SiteSettings,
    domain::{posts::BlogPost, qualification::ELIGIBLE_STATES},
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome, content: ErrorPageView) -> Response {
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// `March 1, 2024`.
pub fn format_date(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!(
            "[month repr:long] [day padding:none], [year]"
        ))
        .unwrap_or_else(|_| iso_date(timestamp))
}

pub fn iso_date(timestamp: OffsetDateTime) -> String {
    timestamp.format(&Rfc3339).unwrap_or_default()
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: &'static str,
    pub href: &'static str,
}

const NAVIGATION: [NavigationLinkView; 5] = [
    NavigationLinkView {
        label: "Why Solar",
        href: "/#industry",
    },
    NavigationLinkView {
        label: "PPA",
        href: "/#ppa",
    },
    NavigationLinkView {
        label: "Qualify",
        href: "/#qualify",
    },
    NavigationLinkView {
        label: "Blog",
        href: "/blogs",
    },
    NavigationLinkView {
        label: "Contact Us",
        href: "/#contact",
    },
];

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: String,
    pub navigation: Vec<NavigationLinkView>,
    pub footer: String,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn for_site(site: &SiteSettings) -> Self {
        let year = OffsetDateTime::now_utc().year();
        Self {
            brand: site.name.clone(),
            navigation: NAVIGATION.to_vec(),
            footer: format!("© {year} {}. All rights reserved.", site.name),
            meta: PageMetaView::website(
                site.name.clone(),
                "No upfront cost solar. Stop paying endless bills and own your energy.".to_string(),
            ),
        }
        .with_canonical(site, "/")
    }

    pub fn with_meta(self, meta: PageMetaView) -> Self {
        Self { meta, ..self }
    }

    /// Absolute canonical URL when the public base URL is configured.
    pub fn with_canonical(mut self, site: &SiteSettings, path: &str) -> Self {
        self.meta.canonical = site
            .base_url
            .as_ref()
            .and_then(|base| base.join(path.trim_start_matches('/')).ok())
            .map(|url| url.to_string());
        self
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: String,
    pub navigation: Vec<NavigationLinkView>,
    pub footer: String,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

/// Head metadata, including the Open Graph and Twitter card tags.
#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub og_title: String,
    pub og_type: &'static str,
    pub canonical: Option<String>,
    pub published_time: Option<String>,
    pub image: Option<String>,
}

impl PageMetaView {
    pub fn website(title: String, description: String) -> Self {
        Self {
            og_title: title.clone(),
            title,
            description,
            og_type: "website",
            canonical: None,
            published_time: None,
            image: None,
        }
    }

    pub fn for_post(post: &BlogPost, site_name: &str) -> Self {
        Self {
            title: format!("{} | {site_name} Blog", post.title),
            description: meta_description(&post.content),
            og_title: post.title.clone(),
            og_type: "article",
            canonical: None,
            published_time: Some(iso_date(post.created_at)),
            image: post.image_url.clone(),
        }
    }

    pub fn not_found_post(site_name: &str) -> Self {
        Self::website(
            format!("Blog Post Not Found | {site_name}"),
            "The requested blog post could not be found.".to_string(),
        )
    }
}

pub struct HomeView {
    pub states: Vec<&'static str>,
    pub quiz: QuizView,
}

/// Quiz section state: unanswered, or the verdict for a submitted form.
pub struct QuizView {
    pub submitted: bool,
    pub qualified: bool,
}

impl HomeView {
    pub fn new(quiz: QuizView) -> Self {
        Self {
            states: ELIGIBLE_STATES.to_vec(),
            quiz,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: LayoutContext<HomeView>,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub published: String,
    pub iso_date: String,
    pub image_url: Option<String>,
}

impl PostCard {
    pub fn from_post(post: &BlogPost, preview_chars: usize) -> Self {
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            preview: truncate_preview(&post.content, preview_chars),
            published: format_date(post.created_at),
            iso_date: iso_date(post.created_at),
            image_url: post.image_url.clone(),
        }
    }
}

pub struct BlogListView {
    pub posts: Vec<PostCard>,
    pub error: Option<String>,
}

impl BlogListView {
    pub fn has_posts(&self) -> bool {
        !self.posts.is_empty()
    }
}

#[derive(Template)]
#[template(path = "blogs.html")]
pub struct BlogListTemplate {
    pub view: LayoutContext<BlogListView>,
}

pub struct BlogPostView {
    pub title: String,
    pub content_html: String,
    pub published: String,
    pub iso_date: String,
    pub image_url: Option<String>,
}

impl BlogPostView {
    /// Stored content is sanitized again here; documents written by other clients are untrusted.
    pub fn from_post(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            content_html: sanitize_post_html(&post.content),
            published: format_date(post.created_at),
            iso_date: iso_date(post.created_at),
            image_url: post.image_url.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "blog_post.html")]
pub struct BlogPostTemplate {
    pub view: LayoutContext<BlogPostView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn post_not_found() -> Self {
        Self {
            title: "Error".to_string(),
            message: "Blog post not found".to_string(),
            primary_action: Some(ErrorAction::blog()),
        }
    }

    pub fn post_unavailable() -> Self {
        Self {
            title: "Error".to_string(),
            message: "Failed to load blog post. Please try again later.".to_string(),
            primary_action: Some(ErrorAction::blog()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }

    pub fn blog() -> Self {
        Self {
            href: "/blogs".to_string(),
            label: "Back to Blog".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub struct LoginView {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}
