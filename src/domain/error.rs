use thiserror::Error;

/// A field value rejected by the catalogue rules. The display text is the
/// message shown next to the form field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("This field is required.")]
    Required { field: &'static str },
    #[error("Ensure this value has at most {max} characters (it has {actual}).")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

impl DomainError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field } | Self::TooLong { field, .. } => field,
        }
    }
}
