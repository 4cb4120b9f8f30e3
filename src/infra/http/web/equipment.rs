use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::application::equipment::{
    CreateEquipmentCommand, EquipmentError, UpdateEquipmentCommand,
};
use crate::application::error::HttpError;
use crate::application::pagination::{NumberedPage, PageSelector};
use crate::domain::entities::EquipmentRecord;
use crate::infra::http::{parse_id, repo_error_to_http};
use crate::presentation::routes;
use crate::presentation::views::{
    EquipmentDeleteTemplate, EquipmentDeleteView, EquipmentFormTemplate, EquipmentFormView,
    EquipmentListTemplate, EquipmentListView, EquipmentOverviewTemplate, EquipmentRowView,
    FieldErrorView, LayoutChrome, LayoutContext, PageLinkView, PaginationView,
    render_not_found_response, render_template_response,
};

use super::HttpState;

const SOURCE: &str = "infra::http::web::equipment";

#[derive(Debug, Default, Deserialize)]
pub(super) struct LanguageQuery {
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ListQuery {
    page: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EquipmentForm {
    #[serde(default)]
    name: String,
}

pub(super) async fn overview(
    State(state): State<HttpState>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let (language, chrome) = match state
        .page_context(query.language.as_deref(), &headers, routes::overview_path())
        .await
    {
        Ok(context) => context,
        Err(err) => return err.into_response(),
    };

    let content = match state.overview.load_view(&language).await {
        Ok(content) => content,
        Err(err) => return HttpError::from(err).into_response(),
    };

    render_template_response(
        EquipmentOverviewTemplate {
            view: LayoutContext::new(chrome, content),
        },
        StatusCode::OK,
    )
}

pub(super) async fn list(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    let (_, chrome) = match state
        .page_context(query.language.as_deref(), &headers, routes::list_path())
        .await
    {
        Ok(context) => context,
        Err(err) => return err.into_response(),
    };

    let Ok(selector) = PageSelector::parse(query.page.as_deref()) else {
        return render_not_found_response(chrome);
    };

    match state.equipment.list_page(selector).await {
        Ok(page) => render_template_response(
            EquipmentListTemplate {
                view: LayoutContext::new(chrome, build_list_view(page)),
            },
            StatusCode::OK,
        ),
        Err(err) => equipment_failure(err, chrome),
    }
}

pub(super) async fn add_form(
    State(state): State<HttpState>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let chrome = match state
        .page_context(query.language.as_deref(), &headers, routes::add_path())
        .await
    {
        Ok((_, chrome)) => chrome,
        Err(err) => return err.into_response(),
    };

    render_form(chrome, add_form_view(String::new(), Vec::new()))
}

pub(super) async fn add_submit(
    State(state): State<HttpState>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
    Form(form): Form<EquipmentForm>,
) -> Response {
    let command = CreateEquipmentCommand {
        name: form.name.clone(),
    };
    match state.equipment.create(command).await {
        Ok(_) => Redirect::to(routes::list_path()).into_response(),
        Err(EquipmentError::Validation { field, message }) => {
            let chrome = match state
                .page_context(query.language.as_deref(), &headers, routes::add_path())
                .await
            {
                Ok((_, chrome)) => chrome,
                Err(err) => return err.into_response(),
            };
            render_form(
                chrome,
                add_form_view(form.name, vec![field_error(field, message)]),
            )
        }
        Err(err) => equipment_failure(err, state.chrome.minimal()),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(state.chrome.minimal());
    };
    let chrome = match state
        .page_context(query.language.as_deref(), &headers, &routes::edit_path(id))
        .await
    {
        Ok((_, chrome)) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.equipment.get(id).await {
        Ok(equipment) => render_form(chrome, edit_form_view(id, equipment.name, Vec::new())),
        Err(err) => equipment_failure(err, chrome),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
    Form(form): Form<EquipmentForm>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(state.chrome.minimal());
    };

    let command = UpdateEquipmentCommand {
        id,
        name: form.name.clone(),
    };
    match state.equipment.update(command).await {
        Ok(_) => Redirect::to(routes::list_path()).into_response(),
        Err(EquipmentError::Validation { field, message }) => {
            let chrome = match state
                .page_context(query.language.as_deref(), &headers, &routes::edit_path(id))
                .await
            {
                Ok((_, chrome)) => chrome,
                Err(err) => return err.into_response(),
            };
            render_form(
                chrome,
                edit_form_view(id, form.name, vec![field_error(field, message)]),
            )
        }
        Err(err) => equipment_failure(err, state.chrome.minimal()),
    }
}

pub(super) async fn delete_confirm(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(state.chrome.minimal());
    };
    let chrome = match state
        .page_context(query.language.as_deref(), &headers, &routes::delete_path(id))
        .await
    {
        Ok((_, chrome)) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.equipment.get(id).await {
        Ok(equipment) => render_template_response(
            EquipmentDeleteTemplate {
                view: LayoutContext::new(
                    chrome,
                    EquipmentDeleteView {
                        name: equipment.name,
                        form_action: routes::delete_path(id),
                        cancel_href: routes::list_path().to_string(),
                    },
                ),
            },
            StatusCode::OK,
        ),
        Err(err) => equipment_failure(err, chrome),
    }
}

pub(super) async fn delete_submit(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(state.chrome.minimal());
    };

    match state.equipment.delete(id).await {
        Ok(_) => Redirect::to(routes::list_path()).into_response(),
        Err(err) => equipment_failure(err, state.chrome.minimal()),
    }
}

fn equipment_failure(err: EquipmentError, chrome: LayoutChrome) -> Response {
    match err {
        EquipmentError::NotFound(_) | EquipmentError::Pagination(_) => {
            render_not_found_response(chrome)
        }
        EquipmentError::Validation { field, message } => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid equipment",
            format!("{field}: {message}"),
        )
        .into_response(),
        EquipmentError::Repo(repo) => repo_error_to_http(SOURCE, repo).into_response(),
    }
}

fn render_form(chrome: LayoutChrome, view: EquipmentFormView) -> Response {
    render_template_response(
        EquipmentFormTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    )
}

fn field_error(field: &'static str, message: String) -> FieldErrorView {
    FieldErrorView {
        field: field.to_string(),
        message,
    }
}

fn add_form_view(name: String, errors: Vec<FieldErrorView>) -> EquipmentFormView {
    EquipmentFormView {
        heading: "Add equipment".to_string(),
        form_action: routes::add_path().to_string(),
        name,
        errors,
        submit_label: "Save",
        cancel_href: routes::list_path().to_string(),
    }
}

fn edit_form_view(id: i64, name: String, errors: Vec<FieldErrorView>) -> EquipmentFormView {
    EquipmentFormView {
        heading: "Edit equipment".to_string(),
        form_action: routes::edit_path(id),
        name,
        errors,
        submit_label: "Save",
        cancel_href: routes::list_path().to_string(),
    }
}

fn build_list_view(page: NumberedPage<EquipmentRecord>) -> EquipmentListView {
    let pagination = PaginationView {
        number: page.number,
        num_pages: page.num_pages,
        previous_href: page.previous_number().map(routes::list_page_path),
        next_href: page.next_number().map(routes::list_page_path),
        pages: page
            .page_numbers()
            .map(|number| PageLinkView {
                number,
                href: routes::list_page_path(number),
                is_current: number == page.number,
            })
            .collect(),
    };

    let rows = page
        .items
        .into_iter()
        .map(|item| EquipmentRowView {
            edit_href: routes::edit_path(item.id),
            delete_href: routes::delete_path(item.id),
            id: item.id,
            name: item.name,
        })
        .collect();

    EquipmentListView {
        rows,
        total: page.total,
        add_href: routes::add_path().to_string(),
        pagination,
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::application::pagination::Paginator;

    fn equipment(id: i64) -> EquipmentRecord {
        let now = OffsetDateTime::now_utc();
        EquipmentRecord {
            id,
            name: format!("Item {id:02}"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn list_view_links_neighbouring_pages() {
        let window = Paginator::default()
            .resolve(PageSelector::Number(2), 53)
            .expect("page 2");
        let page = NumberedPage::new((26..=50).map(equipment).collect(), window, 53);

        let view = build_list_view(page);
        assert_eq!(view.rows.len(), 25);
        assert_eq!(view.rows[0].edit_href, "/exercise/equipment/26/edit/");
        assert_eq!(view.pagination.previous_href.as_deref(), Some("/exercise/equipment/list/"));
        assert_eq!(
            view.pagination.next_href.as_deref(),
            Some("/exercise/equipment/list/?page=3")
        );
        assert_eq!(view.pagination.pages.len(), 3);
        assert!(view.pagination.pages[1].is_current);
    }
}
