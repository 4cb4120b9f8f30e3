use crate::application::error::{ErrorReport, HttpError};
use crate::presentation::routes;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

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

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    render_error_response(chrome, ErrorPageView::not_found(), StatusCode::NOT_FOUND)
}

pub fn render_error_response(
    chrome: LayoutChrome,
    content: ErrorPageView,
    status: StatusCode,
) -> Response {
    let message = content.title.clone();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    ErrorReport::from_message("presentation::views::render_error_response", status, message)
        .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct LanguageLinkView {
    pub short_name: String,
    pub full_name: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub language_code: String,
    pub navigation: Vec<NavigationLinkView>,
    pub languages: Vec<LanguageLinkView>,
}

impl LayoutChrome {
    /// Chrome used when the language catalogue cannot be loaded.
    pub fn minimal(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
            language_code: "en".to_string(),
            navigation: Vec::new(),
            languages: Vec::new(),
        }
    }
}

pub struct LayoutContext<T> {
    pub site_title: String,
    pub language_code: String,
    pub navigation: Vec<NavigationLinkView>,
    pub languages: Vec<LanguageLinkView>,
    pub page_title: String,
    pub content: T,
}

impl<T: PageTitle> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            page_title: format!("{} | {}", content.page_title(), chrome.site_title),
            site_title: chrome.site_title,
            language_code: chrome.language_code,
            navigation: chrome.navigation,
            languages: chrome.languages,
            content,
        }
    }
}

pub trait PageTitle {
    fn page_title(&self) -> String;
}

// ---- equipment overview ----

#[derive(Clone)]
pub struct OverviewExerciseView {
    pub id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct OverviewEquipmentView {
    pub id: i64,
    pub name: String,
    pub exercises: Vec<OverviewExerciseView>,
}

/// Cached region of the overview page.
#[derive(Template)]
#[template(path = "exercise/equipment/overview_fragment.html")]
pub struct EquipmentOverviewFragmentTemplate {
    pub language_code: String,
    pub equipment: Vec<OverviewEquipmentView>,
}

pub struct EquipmentOverviewView {
    pub fragment_html: String,
    pub show_shariff: bool,
}

impl PageTitle for EquipmentOverviewView {
    fn page_title(&self) -> String {
        "Equipment".to_string()
    }
}

#[derive(Template)]
#[template(path = "exercise/equipment/overview.html")]
pub struct EquipmentOverviewTemplate {
    pub view: LayoutContext<EquipmentOverviewView>,
}

// ---- equipment list ----

#[derive(Clone)]
pub struct EquipmentRowView {
    pub id: i64,
    pub name: String,
    pub edit_href: String,
    pub delete_href: String,
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u64,
    pub href: String,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct PaginationView {
    pub number: u64,
    pub num_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLinkView>,
}

impl PaginationView {
    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

pub struct EquipmentListView {
    pub rows: Vec<EquipmentRowView>,
    pub total: u64,
    pub add_href: String,
    pub pagination: PaginationView,
}

impl PageTitle for EquipmentListView {
    fn page_title(&self) -> String {
        "Equipment list".to_string()
    }
}

#[derive(Template)]
#[template(path = "exercise/equipment/list.html")]
pub struct EquipmentListTemplate {
    pub view: LayoutContext<EquipmentListView>,
}

// ---- equipment forms ----

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldErrorView {
    pub field: String,
    pub message: String,
}

pub struct EquipmentFormView {
    pub heading: String,
    pub form_action: String,
    pub name: String,
    pub errors: Vec<FieldErrorView>,
    pub submit_label: &'static str,
    pub cancel_href: String,
}

impl EquipmentFormView {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl PageTitle for EquipmentFormView {
    fn page_title(&self) -> String {
        self.heading.clone()
    }
}

#[derive(Template)]
#[template(path = "exercise/equipment/form.html")]
pub struct EquipmentFormTemplate {
    pub view: LayoutContext<EquipmentFormView>,
}

pub struct EquipmentDeleteView {
    pub name: String,
    pub form_action: String,
    pub cancel_href: String,
}

impl PageTitle for EquipmentDeleteView {
    fn page_title(&self) -> String {
        format!("Delete {}?", self.name)
    }
}

#[derive(Template)]
#[template(path = "exercise/equipment/delete.html")]
pub struct EquipmentDeleteTemplate {
    pub view: LayoutContext<EquipmentDeleteView>,
}

// ---- errors ----

pub struct ErrorPageView {
    pub status_code: u16,
    pub title: String,
    pub message: String,
    pub back_href: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status_code: StatusCode::NOT_FOUND.as_u16(),
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            back_href: routes::overview_path().to_string(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status_code: StatusCode::UNAUTHORIZED.as_u16(),
            title: "Authentication required".to_string(),
            message: "Provide an API key to manage equipment.".to_string(),
            back_href: routes::overview_path().to_string(),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            status_code: StatusCode::FORBIDDEN.as_u16(),
            title: "Permission denied".to_string(),
            message: "Your API key is not allowed to manage equipment.".to_string(),
            back_href: routes::overview_path().to_string(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status_code: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            title: "Service unavailable".to_string(),
            message: "Your API key could not be checked. Try again shortly.".to_string(),
            back_href: routes::overview_path().to_string(),
        }
    }
}

impl PageTitle for ErrorPageView {
    fn page_title(&self) -> String {
        self.title.clone()
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome() -> LayoutChrome {
        LayoutChrome {
            site_title: "wger".to_string(),
            language_code: "en".to_string(),
            navigation: Vec::new(),
            languages: Vec::new(),
        }
    }

    #[test]
    fn fragment_lists_equipment_with_exercises() {
        let html = EquipmentOverviewFragmentTemplate {
            language_code: "en".to_string(),
            equipment: vec![OverviewEquipmentView {
                id: 1,
                name: "Dumbbells".to_string(),
                exercises: vec![OverviewExerciseView {
                    id: 2,
                    name: "Biceps curls".to_string(),
                }],
            }],
        }
        .render()
        .expect("fragment renders");

        assert!(html.contains("Dumbbells"));
        assert!(html.contains("Biceps curls"));
    }

    #[test]
    fn fragment_escapes_names() {
        let html = EquipmentOverviewFragmentTemplate {
            language_code: "en".to_string(),
            equipment: vec![OverviewEquipmentView {
                id: 1,
                name: "<b>Bar</b>".to_string(),
                exercises: Vec::new(),
            }],
        }
        .render()
        .expect("fragment renders");

        assert!(!html.contains("<b>Bar</b>"));
    }

    #[test]
    fn not_found_response_carries_report() {
        let response = render_not_found_response(chrome());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn layout_title_combines_page_and_site() {
        let view = LayoutContext::new(chrome(), ErrorPageView::forbidden());
        assert_eq!(view.page_title, "Permission denied | wger");
    }
}
