use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{LanguagesRepo, RepoError};
use crate::domain::entities::LanguageRecord;
use crate::domain::languages::accepted_languages;

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("no languages are configured")]
    NoLanguages,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Picks the language a request is served in.
#[derive(Clone)]
pub struct LanguageService {
    repo: Arc<dyn LanguagesRepo>,
    default_short_name: String,
}

impl LanguageService {
    pub fn new(repo: Arc<dyn LanguagesRepo>, default_short_name: impl Into<String>) -> Self {
        Self {
            repo,
            default_short_name: default_short_name.into(),
        }
    }

    pub async fn list(&self) -> Result<Vec<LanguageRecord>, LanguageError> {
        self.repo.list_languages().await.map_err(LanguageError::from)
    }

    /// `?language=` wins, then `Accept-Language`, then the configured
    /// default. Unknown codes fall through to the next source.
    pub async fn resolve(
        &self,
        requested: Option<&str>,
        accept_language: Option<&str>,
    ) -> Result<LanguageRecord, LanguageError> {
        let languages = self.list().await?;
        let lookup = |code: &str| {
            let code = code.trim().to_ascii_lowercase();
            languages
                .iter()
                .find(|language| language.short_name.eq_ignore_ascii_case(&code))
                .cloned()
        };

        if let Some(found) = requested.and_then(lookup) {
            return Ok(found);
        }
        if let Some(found) = accept_language
            .map(accepted_languages)
            .unwrap_or_default()
            .iter()
            .find_map(|code| lookup(code.as_str()))
        {
            return Ok(found);
        }
        lookup(self.default_short_name.as_str())
            .or_else(|| languages.first().cloned())
            .ok_or(LanguageError::NoLanguages)
    }
}
