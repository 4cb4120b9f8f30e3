use std::sync::Arc;

use axum::http::StatusCode;

use crate::application::error::HttpError;
use crate::application::languages::{LanguageError, LanguageService};
use crate::domain::entities::LanguageRecord;
use crate::presentation::routes;
use crate::presentation::views::{LanguageLinkView, LayoutChrome, NavigationLinkView};

const SOURCE: &str = "application::chrome::ChromeService";

/// Builds the navigation and language switcher shared by every page.
#[derive(Clone)]
pub struct ChromeService {
    site_title: String,
    languages: Arc<LanguageService>,
}

impl ChromeService {
    pub fn new(site_title: impl Into<String>, languages: Arc<LanguageService>) -> Self {
        Self {
            site_title: site_title.into(),
            languages,
        }
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    pub async fn load(
        &self,
        current: &LanguageRecord,
        active_path: &str,
    ) -> Result<LayoutChrome, HttpError> {
        let languages = self
            .languages
            .list()
            .await
            .map_err(|err| language_failure("list_languages", err))?;

        Ok(self.build(current, &languages, active_path))
    }

    /// Chrome for error pages rendered before a language is known.
    pub fn minimal(&self) -> LayoutChrome {
        LayoutChrome::minimal(self.site_title.clone())
    }

    fn build(
        &self,
        current: &LanguageRecord,
        languages: &[LanguageRecord],
        active_path: &str,
    ) -> LayoutChrome {
        let navigation = [
            ("Overview", routes::overview_path()),
            ("Equipment list", routes::list_path()),
        ]
        .into_iter()
        .map(|(label, href)| NavigationLinkView {
            label: label.to_string(),
            href: href.to_string(),
            is_active: href == active_path,
        })
        .collect();

        let languages = languages
            .iter()
            .map(|language| LanguageLinkView {
                short_name: language.short_name.clone(),
                full_name: language.full_name.clone(),
                href: format!("{active_path}?language={}", language.short_name),
                is_active: language.id == current.id,
            })
            .collect();

        LayoutChrome {
            site_title: self.site_title.clone(),
            language_code: current.short_name.clone(),
            navigation,
            languages,
        }
    }
}

fn language_failure(operation: &'static str, err: LanguageError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load site chrome",
        format!("{operation} failed: {err}"),
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::{LanguagesRepo, RepoError};

    struct TwoLanguages;

    #[async_trait]
    impl LanguagesRepo for TwoLanguages {
        async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError> {
            Ok(vec![language(1, "de", "Deutsch"), language(2, "en", "English")])
        }

        async fn find_language_by_short_name(
            &self,
            short_name: &str,
        ) -> Result<Option<LanguageRecord>, RepoError> {
            Ok(self
                .list_languages()
                .await?
                .into_iter()
                .find(|l| l.short_name == short_name))
        }
    }

    fn language(id: i64, short_name: &str, full_name: &str) -> LanguageRecord {
        LanguageRecord {
            id,
            short_name: short_name.to_string(),
            full_name: full_name.to_string(),
        }
    }

    #[tokio::test]
    async fn marks_active_navigation_and_language() {
        let languages = Arc::new(LanguageService::new(Arc::new(TwoLanguages), "en"));
        let service = ChromeService::new("wger", languages);

        let chrome = service
            .load(&language(1, "de", "Deutsch"), routes::list_path())
            .await
            .expect("chrome");

        assert_eq!(chrome.language_code, "de");
        let active: Vec<_> = chrome
            .navigation
            .iter()
            .filter(|link| link.is_active)
            .map(|link| link.href.as_str())
            .collect();
        assert_eq!(active, vec![routes::list_path()]);

        let german = chrome
            .languages
            .iter()
            .find(|link| link.short_name == "de")
            .expect("de link");
        assert!(german.is_active);
        assert_eq!(german.href, "/exercise/equipment/list/?language=de");
    }
}
