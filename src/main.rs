use std::{future::IntoFuture, process, str::FromStr, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use wger::{
    application::{
        api_keys::{ApiKeyService, IssueApiKeyCommand},
        context::{ContextOptions, Repositories, ServiceContext},
        error::AppError,
        fixtures::FixtureService,
    },
    cache::{CacheConfig, CacheTrigger},
    config,
    domain::api_keys::ApiScope,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, RouterState},
        telemetry::{self, targets},
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error.chain().join(": ");
    if dispatcher::has_been_set() {
        error!(error = %chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::LoadFixture(args) => run_load_fixture(settings, args).await,
        config::Command::IssueKey(args) => run_issue_key(settings, args).await,
        config::Command::RevokeKey(args) => run_revoke_key(settings, args).await,
        config::Command::ListKeys(_) => run_list_keys(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let context = ServiceContext::build(
        Repositories::shared(repositories),
        context_options(&settings),
    );

    if let Some(trigger) = &context.cache.trigger {
        trigger.warmup_on_startup().await;
    }
    let cache_handle = context.cache.trigger.clone().map(spawn_auto_consume);

    let result = serve_http(&settings, RouterState::from_context(&context)).await;

    if let Some(handle) = cache_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!(target: targets::MIGRATE, "Migrations applied");
    Ok(())
}

async fn run_load_fixture(
    settings: config::Settings,
    args: config::LoadFixtureArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let path = args.file;

    info!(
        target: targets::FIXTURE,
        path = %path.display(),
        "Loading fixture"
    );

    let summary = FixtureService::new(repositories).load_file(&path).await?;

    info!(
        target: targets::FIXTURE,
        languages = summary.languages,
        equipment = summary.equipment,
        exercise_bases = summary.exercise_bases,
        exercises = summary.exercises,
        "Fixture loaded"
    );
    Ok(())
}

async fn run_issue_key(
    settings: config::Settings,
    args: config::IssueKeyArgs,
) -> Result<(), AppError> {
    let scopes = args
        .scopes
        .iter()
        .map(|raw| ApiScope::from_str(raw.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| AppError::invalid_argument(err.to_string()))?;
    let expires_at = args
        .expires_in_days
        .map(|days| OffsetDateTime::now_utc() + time::Duration::days(i64::from(days)));

    let repositories = init_repositories(&settings).await?;
    let issued = ApiKeyService::new(repositories)
        .issue(IssueApiKeyCommand {
            name: args.name,
            scopes,
            expires_at,
        })
        .await?;

    info!(
        target: targets::API_KEYS,
        key_id = %issued.record.id,
        prefix = %issued.record.prefix,
        "API key issued"
    );
    // the token is only ever shown here
    println!("{}", issued.token);
    Ok(())
}

async fn run_revoke_key(
    settings: config::Settings,
    args: config::RevokeKeyArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let record = ApiKeyService::new(repositories).revoke(args.id).await?;

    info!(
        target: targets::API_KEYS,
        key_id = %record.id,
        prefix = %record.prefix,
        "API key revoked"
    );
    Ok(())
}

async fn run_list_keys(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let keys = ApiKeyService::new(repositories).list().await?;

    let now = OffsetDateTime::now_utc();
    for key in keys {
        let scopes: Vec<&str> = key.scopes.iter().map(|scope| scope.as_str()).collect();
        let status = if key.is_active_at(now) { "active" } else { "inactive" };
        println!(
            "{}\t{}\t{}\t{}\t{}",
            key.id,
            key.prefix,
            status,
            scopes.join(","),
            key.name
        );
    }
    Ok(())
}

fn context_options(settings: &config::Settings) -> ContextOptions {
    ContextOptions {
        site_title: settings.site.title.clone(),
        default_language: settings.site.default_language.clone(),
        objects_per_page: settings.pagination.objects_per_page,
        api_max_limit: settings.pagination.api_max_limit,
        show_shariff: settings.site.show_shariff,
        cache: CacheConfig::from(&settings.cache),
    }
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::from(err).into())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn spawn_auto_consume(trigger: Arc<CacheTrigger>) -> JoinHandle<()> {
    let interval_ms = trigger.config().auto_consume_interval_ms;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            trigger.consumer().consume().await;
        }
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(target: targets::HTTP, addr = %settings.server.addr, "Listening");

    let stopping = Arc::new(Notify::new());
    let signal = stopping.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(AppError::Server)?;
        }
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target: targets::HTTP,
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target: targets::HTTP, "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: targets::HTTP, error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: targets::HTTP, "Shutdown signal received");
}
