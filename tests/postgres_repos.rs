//! Repository behaviour against a real Postgres. Needs `DATABASE_URL`.

use sqlx::PgPool;
use time::OffsetDateTime;
use wger::application::fixtures::parse_fixture;
use wger::application::repos::{
    ApiKeysRepo, CreateApiKeyParams, CreateEquipmentParams, EquipmentRepo, EquipmentWriteRepo,
    ExercisesRepo, ExercisesWriteRepo, FixtureRepo, HealthRepo, LanguagesRepo, RepoError,
    UpdateEquipmentParams, UpdateExerciseParams,
};
use wger::domain::api_keys::ApiScope;
use wger::infra::db::PostgresRepositories;

const DEFAULT_FIXTURE: &str = include_str!("../fixtures/default.toml");

async fn seeded(pool: PgPool) -> PostgresRepositories {
    let repos = PostgresRepositories::new(pool);
    let data = parse_fixture(DEFAULT_FIXTURE).expect("fixture parses");
    repos.load_fixture(&data).await.expect("fixture loads");
    repos
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn equipment_is_ordered_by_name_then_id(pool: PgPool) {
    let repos = seeded(pool).await;
    repos
        .create_equipment(CreateEquipmentParams {
            name: "Barbell".to_string(),
        })
        .await
        .expect("create duplicate name");

    assert_eq!(repos.count_equipment().await.expect("count"), 5);
    let page = repos.list_equipment(3, 0).await.expect("list");
    let names: Vec<_> = page.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Barbell", "Barbell", "Dumbbells"]);
    assert!(page[0].id < page[1].id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn fixture_load_advances_sequences(pool: PgPool) {
    let repos = seeded(pool).await;
    let created = repos
        .create_equipment(CreateEquipmentParams {
            name: "Rings".to_string(),
        })
        .await
        .expect("create after fixture");
    assert_eq!(created.id, 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_and_delete_unknown_rows_are_not_found(pool: PgPool) {
    let repos = seeded(pool).await;
    assert!(matches!(
        repos
            .update_equipment(UpdateEquipmentParams {
                id: 999,
                name: "Ghost".to_string(),
            })
            .await,
        Err(RepoError::NotFound)
    ));
    assert!(matches!(
        repos.delete_equipment(999).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_equipment_drops_associations(pool: PgPool) {
    let repos = seeded(pool).await;
    repos.delete_equipment(1).await.expect("delete dumbbells");

    let base = repos
        .find_exercise_base(2)
        .await
        .expect("find base")
        .expect("base exists");
    assert!(base.equipment_ids.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn association_replacement_reports_previous_set(pool: PgPool) {
    let repos = seeded(pool).await;
    let change = repos
        .replace_base_equipment(2, &[2, 3])
        .await
        .expect("replace equipment");

    assert_eq!(change.previous_equipment_ids, vec![1]);
    assert_eq!(change.base.equipment_ids, vec![2, 3]);
    assert_eq!(change.touched_equipment_ids(), vec![1, 2, 3]);

    assert!(matches!(
        repos.replace_base_equipment(99, &[1]).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn overview_query_is_per_language(pool: PgPool) {
    let repos = seeded(pool).await;
    let english = repos
        .find_language_by_short_name("en")
        .await
        .expect("lookup")
        .expect("english seeded");
    assert_eq!(english.id, 2);

    let entries = repos
        .list_exercises_with_equipment(english.id)
        .await
        .expect("list exercises");
    let names: Vec<_> = entries.iter().map(|e| e.exercise.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Bench press", "Biceps curls", "Kettlebell swing", "Pull-ups"]
    );
    assert!(entries.iter().all(|e| e.exercise.language_id == 2));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn exercise_update_persists(pool: PgPool) {
    let repos = seeded(pool).await;
    let updated = repos
        .update_exercise(UpdateExerciseParams {
            id: 2,
            name: "Hammer curls".to_string(),
            description: String::new(),
        })
        .await
        .expect("update exercise");
    assert_eq!(updated.name, "Hammer curls");
    assert_eq!(
        repos
            .find_exercise(2)
            .await
            .expect("find")
            .map(|e| e.name),
        Some("Hammer curls".to_string())
    );
    repos.ping().await.expect("database reachable");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn api_keys_round_trip_scopes_and_revocation(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let created = repos
        .create_key(CreateApiKeyParams {
            name: "editor".to_string(),
            prefix: "abcd1234".to_string(),
            hashed_secret: vec![7; 32],
            scopes: vec![ApiScope::EquipmentWrite, ApiScope::ExerciseWrite],
            expires_at: None,
        })
        .await
        .expect("create key");

    let found = repos
        .find_by_prefix("abcd1234")
        .await
        .expect("lookup")
        .expect("key stored");
    assert_eq!(found.id, created.id);
    assert_eq!(
        found.scopes,
        vec![ApiScope::EquipmentWrite, ApiScope::ExerciseWrite]
    );
    assert!(found.revoked_at.is_none());

    let now = OffsetDateTime::now_utc();
    let revoked = repos.revoke_key(created.id, now).await.expect("revoke");
    assert!(revoked.revoked_at.is_some());
    assert!(!revoked.is_active_at(now));
    assert_eq!(repos.list_keys().await.expect("list").len(), 1);
}
