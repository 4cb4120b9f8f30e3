//! Wiring of repositories, cache layers and services.

use std::num::NonZeroU32;
use std::sync::Arc;

use crate::application::api_keys::ApiKeyService;
use crate::application::chrome::ChromeService;
use crate::application::equipment::EquipmentService;
use crate::application::exercises::ExerciseService;
use crate::application::fixtures::FixtureService;
use crate::application::languages::LanguageService;
use crate::application::overview::EquipmentOverviewService;
use crate::application::pagination::{PAGINATION_OBJECTS_PER_PAGE, Paginator};
use crate::application::repos::{
    ApiKeysRepo, EquipmentRepo, EquipmentWriteRepo, ExercisesRepo, ExercisesWriteRepo,
    FixtureRepo, HealthRepo, LanguagesRepo,
};
use crate::cache::{
    CacheConfig, CacheConsumer, CacheRegistry, CacheTrigger, EventQueue, FragmentCache,
    FragmentStore, ObjectStore,
};

/// Trait objects for every repository the services need.
#[derive(Clone)]
pub struct Repositories {
    pub equipment: Arc<dyn EquipmentRepo>,
    pub equipment_write: Arc<dyn EquipmentWriteRepo>,
    pub exercises: Arc<dyn ExercisesRepo>,
    pub exercises_write: Arc<dyn ExercisesWriteRepo>,
    pub languages: Arc<dyn LanguagesRepo>,
    pub api_keys: Arc<dyn ApiKeysRepo>,
    pub fixtures: Arc<dyn FixtureRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    /// Use one backend for every repository trait.
    pub fn shared<R>(repo: Arc<R>) -> Self
    where
        R: EquipmentRepo
            + EquipmentWriteRepo
            + ExercisesRepo
            + ExercisesWriteRepo
            + LanguagesRepo
            + ApiKeysRepo
            + FixtureRepo
            + HealthRepo
            + 'static,
    {
        Self {
            equipment: repo.clone(),
            equipment_write: repo.clone(),
            exercises: repo.clone(),
            exercises_write: repo.clone(),
            languages: repo.clone(),
            api_keys: repo.clone(),
            fixtures: repo.clone(),
            health: repo,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub site_title: String,
    pub default_language: String,
    pub objects_per_page: NonZeroU32,
    pub api_max_limit: u64,
    pub show_shariff: bool,
    pub cache: CacheConfig,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            site_title: "wger".to_string(),
            default_language: "en".to_string(),
            objects_per_page: NonZeroU32::new(PAGINATION_OBJECTS_PER_PAGE)
                .unwrap_or(NonZeroU32::MIN),
            api_max_limit: 100,
            show_shariff: true,
            cache: CacheConfig::default(),
        }
    }
}

/// Cache handles exposed for warmup and auto-consume.
#[derive(Clone)]
pub struct CacheHandles {
    pub trigger: Option<Arc<CacheTrigger>>,
    pub fragments: FragmentCache,
    pub objects: Arc<ObjectStore>,
}

#[derive(Clone)]
pub struct ServiceContext {
    pub equipment: Arc<EquipmentService>,
    pub exercises: Arc<ExerciseService>,
    pub languages: Arc<LanguageService>,
    pub overview: Arc<EquipmentOverviewService>,
    pub chrome: Arc<ChromeService>,
    pub api_keys: Arc<ApiKeyService>,
    pub fixtures: Arc<FixtureService>,
    pub health: Arc<dyn HealthRepo>,
    pub cache: CacheHandles,
    pub api_max_limit: u64,
}

impl ServiceContext {
    pub fn build(repos: Repositories, options: ContextOptions) -> Self {
        let cache = build_cache(&repos, &options.cache);
        let object_cache = options
            .cache
            .enable_object_cache
            .then(|| cache.objects.clone());

        let languages = Arc::new(LanguageService::new(
            repos.languages.clone(),
            options.default_language.clone(),
        ));
        let chrome = Arc::new(ChromeService::new(
            options.site_title.clone(),
            languages.clone(),
        ));

        let equipment = Arc::new(
            EquipmentService::new(
                repos.equipment.clone(),
                repos.equipment_write.clone(),
                Paginator::new(options.objects_per_page),
            )
            .with_cache(object_cache.clone())
            .with_cache_trigger_opt(cache.trigger.clone()),
        );
        let exercises = Arc::new(
            ExerciseService::new(
                repos.exercises.clone(),
                repos.exercises_write.clone(),
                repos.equipment.clone(),
            )
            .with_cache_trigger_opt(cache.trigger.clone()),
        );
        let overview = Arc::new(
            EquipmentOverviewService::new(
                repos.equipment.clone(),
                repos.exercises.clone(),
                cache.fragments.clone(),
            )
            .with_shariff(options.show_shariff),
        );
        let api_keys = Arc::new(
            ApiKeyService::new(repos.api_keys.clone())
                .with_cache(object_cache)
                .with_cache_trigger_opt(cache.trigger.clone()),
        );
        let fixtures = Arc::new(
            FixtureService::new(repos.fixtures.clone())
                .with_cache_trigger_opt(cache.trigger.clone()),
        );

        Self {
            equipment,
            exercises,
            languages,
            overview,
            chrome,
            api_keys,
            fixtures,
            health: repos.health,
            cache,
            api_max_limit: options.api_max_limit,
        }
    }
}

fn build_cache(repos: &Repositories, config: &CacheConfig) -> CacheHandles {
    let objects = Arc::new(ObjectStore::new(config));
    let fragment_store = Arc::new(FragmentStore::new(config));
    let registry = Arc::new(CacheRegistry::new());
    let fragments = FragmentCache::new(config.clone(), fragment_store.clone(), registry.clone());

    let trigger = config.is_enabled().then(|| {
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(
            CacheConsumer::new(
                config.clone(),
                objects.clone(),
                fragment_store,
                registry,
                queue.clone(),
            )
            .with_warm_source(repos.equipment.clone()),
        );
        Arc::new(CacheTrigger::new(config.clone(), queue, consumer))
    });

    CacheHandles {
        trigger,
        fragments,
        objects,
    }
}
