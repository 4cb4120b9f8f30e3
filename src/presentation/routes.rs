//! Named routes and reverse URL resolution.

use thiserror::Error;

pub const EQUIPMENT_OVERVIEW: &str = "exercise:equipment:overview";
pub const EQUIPMENT_LIST: &str = "exercise:equipment:list";
pub const EQUIPMENT_ADD: &str = "exercise:equipment:add";
pub const EQUIPMENT_EDIT: &str = "exercise:equipment:edit";
pub const EQUIPMENT_DELETE: &str = "exercise:equipment:delete";

pub const EQUIPMENT_OVERVIEW_PATTERN: &str = "/exercise/equipment/overview/";
pub const EQUIPMENT_LIST_PATTERN: &str = "/exercise/equipment/list/";
pub const EQUIPMENT_ADD_PATTERN: &str = "/exercise/equipment/add/";
pub const EQUIPMENT_EDIT_PATTERN: &str = "/exercise/equipment/{id}/edit/";
pub const EQUIPMENT_DELETE_PATTERN: &str = "/exercise/equipment/{id}/delete/";

/// A named URL pattern in axum path syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub pattern: &'static str,
}

impl Route {
    /// Number of `{param}` segments.
    pub fn arity(&self) -> usize {
        self.pattern.matches('{').count()
    }
}

pub const ROUTES: &[Route] = &[
    Route {
        name: EQUIPMENT_OVERVIEW,
        pattern: EQUIPMENT_OVERVIEW_PATTERN,
    },
    Route {
        name: EQUIPMENT_LIST,
        pattern: EQUIPMENT_LIST_PATTERN,
    },
    Route {
        name: EQUIPMENT_ADD,
        pattern: EQUIPMENT_ADD_PATTERN,
    },
    Route {
        name: EQUIPMENT_EDIT,
        pattern: EQUIPMENT_EDIT_PATTERN,
    },
    Route {
        name: EQUIPMENT_DELETE,
        pattern: EQUIPMENT_DELETE_PATTERN,
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReverseError {
    #[error("no route named `{0}`")]
    UnknownRoute(String),
    #[error("route `{name}` takes {expected} arguments, got {given}")]
    ArgumentCount {
        name: &'static str,
        expected: usize,
        given: usize,
    },
}

fn find(name: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.name == name)
}

/// Build the path for `name`, substituting `{param}` segments in order.
pub fn reverse(name: &str, args: &[&str]) -> Result<String, ReverseError> {
    let route = find(name).ok_or_else(|| ReverseError::UnknownRoute(name.to_string()))?;

    let expected = route.arity();
    if expected != args.len() {
        return Err(ReverseError::ArgumentCount {
            name: route.name,
            expected,
            given: args.len(),
        });
    }
    Ok(substitute(route.pattern, args))
}

fn substitute(pattern: &str, args: &[&str]) -> String {
    let mut args = args.iter();
    pattern
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                args.next().copied().unwrap_or_default()
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn overview_path() -> &'static str {
    EQUIPMENT_OVERVIEW_PATTERN
}

pub fn list_path() -> &'static str {
    EQUIPMENT_LIST_PATTERN
}

pub fn add_path() -> &'static str {
    EQUIPMENT_ADD_PATTERN
}

pub fn edit_path(id: i64) -> String {
    substitute(EQUIPMENT_EDIT_PATTERN, &[&id.to_string()])
}

pub fn delete_path(id: i64) -> String {
    substitute(EQUIPMENT_DELETE_PATTERN, &[&id.to_string()])
}

/// List URL for a page number. Page 1 is the bare list path.
pub fn list_page_path(page: u64) -> String {
    if page <= 1 {
        list_path().to_string()
    } else {
        format!("{}?page={page}", list_path())
    }
}
