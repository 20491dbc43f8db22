//! Postgres repository tests.
//!
//! They need a disposable database in `TEST_DATABASE_URL` and are skipped when it is not
//! set. Every test empties the four tables first, so never point it at real data.

use chrono::{Duration, Utc};
use climascalientes::{
    error::AppError,
    models::{
        EmergencyNumberUpdate, NewEmergencyNumber, NewQuote, NewTip, NewUser, QuoteUpdate, Role,
        TipUpdate, UserUpdate,
    },
    repository::{PostgresRepository, Repository},
};
use serial_test::serial;
use sqlx::PgPool;

// --- Test Context and Setup ---

/// Holds the pool of the test database, migrated and emptied.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping Postgres repository test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        sqlx::query(
            "TRUNCATE usuarios, numeros_emergencia, consejos_clima, frases_dia RESTART IDENTITY",
        )
        .execute(&pool)
        .await
        .expect("Failed to reset test tables.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        role: Role::User,
    }
}

fn new_number(nombre: &str, categoria: &str, activo: bool) -> NewEmergencyNumber {
    NewEmergencyNumber {
        nombre: nombre.to_string(),
        numero: "911".to_string(),
        descripcion: "Atención de emergencias".to_string(),
        icono: "fa-phone".to_string(),
        categoria: categoria.to_string(),
        badge: Some("24h".to_string()),
        activo,
    }
}

fn new_quote(frase: &str) -> NewQuote {
    NewQuote {
        frase: frase.to_string(),
        autor: Some("Anónimo".to_string()),
    }
}

async fn active_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM frases_dia WHERE activa = TRUE")
        .fetch_one(pool)
        .await
        .expect("Failed to count active quotes")
}

// --- Tests ---

#[tokio::test]
#[serial]
async fn test_unique_violation_maps_to_duplicate_user() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    let ana = repo.create_user(new_user("ana", "ana@x.com")).await.unwrap();
    assert_eq!(ana.role, Role::User);

    // Same email, different username: only the UNIQUE constraint catches it here.
    let err = repo
        .create_user(new_user("otra", "ana@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateUser));

    let err = repo
        .create_user(new_user("ana", "otra@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateUser));

    assert_eq!(repo.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_partial_user_update_keeps_unset_columns() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let ana = repo.create_user(new_user("ana", "ana@x.com")).await.unwrap();

    let updated = repo
        .update_user(
            ana.id,
            UserUpdate {
                role: Some(Role::Admin),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(updated.role, Role::Admin);
    assert_eq!(updated.username, "ana");
    assert_eq!(updated.email, "ana@x.com");
    assert_eq!(updated.password_hash, ana.password_hash);

    let missing = repo.update_user(9999, UserUpdate::default()).await.unwrap();
    assert!(missing.is_none());
    assert!(!repo.delete_user(9999).await.unwrap());
}

#[tokio::test]
#[serial]
async fn test_emergency_numbers_order_filter_and_badge_clearing() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    repo.create_emergency_number(new_number("Policía", "Seguridad", true))
        .await
        .unwrap();
    let cruz = repo
        .create_emergency_number(new_number("Cruz Roja", "Salud", true))
        .await
        .unwrap();
    repo.create_emergency_number(new_number("Bomberos", "Seguridad", true))
        .await
        .unwrap();
    repo.create_emergency_number(new_number("Archivado", "Salud", false))
        .await
        .unwrap();

    let public: Vec<String> = repo
        .list_emergency_numbers(true)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.nombre)
        .collect();
    assert_eq!(public, vec!["Cruz Roja", "Bomberos", "Policía"]);
    assert_eq!(repo.list_emergency_numbers(false).await.unwrap().len(), 4);

    // Absent badge keeps it.
    let kept = repo
        .update_emergency_number(
            cruz.id,
            EmergencyNumberUpdate {
                numero: Some("065".to_string()),
                ..EmergencyNumberUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.numero, "065");
    assert_eq!(kept.badge.as_deref(), Some("24h"));
    assert_eq!(kept.nombre, "Cruz Roja");

    // `Some(None)` clears it.
    let cleared = repo
        .update_emergency_number(
            cruz.id,
            EmergencyNumberUpdate {
                badge: Some(None),
                activo: Some(false),
                ..EmergencyNumberUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.badge, None);
    assert!(!cleared.activo);
    assert_eq!(cleared.numero, "065");
}

#[tokio::test]
#[serial]
async fn test_tips_newest_first_and_tag_update() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    let older = repo
        .create_tip(NewTip {
            titulo: "Hidrátate".to_string(),
            descripcion: "Bebe agua".to_string(),
            icono: "fa-tint".to_string(),
            etiquetas: Some("calor".to_string()),
            activo: true,
        })
        .await
        .unwrap();
    sqlx::query("UPDATE consejos_clima SET fecha_creacion = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(older.id)
        .execute(&ctx.pool)
        .await
        .unwrap();
    repo.create_tip(NewTip {
        titulo: "Usa bloqueador".to_string(),
        descripcion: "Protégete del sol".to_string(),
        icono: "fa-sun".to_string(),
        etiquetas: None,
        activo: true,
    })
    .await
    .unwrap();

    let titles: Vec<String> = repo
        .list_tips(true)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.titulo)
        .collect();
    assert_eq!(titles, vec!["Usa bloqueador", "Hidrátate"]);

    let updated = repo
        .update_tip(
            older.id,
            TipUpdate {
                etiquetas: Some(None),
                activo: Some(false),
                ..TipUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.etiquetas, None);
    assert_eq!(updated.titulo, "Hidrátate");
    assert_eq!(repo.list_tips(true).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_two_publications_leave_one_active_quote() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    let first = repo.replace_active_quote(new_quote("uno")).await.unwrap();
    assert!(first.activa);
    let second = repo.replace_active_quote(new_quote("dos")).await.unwrap();

    assert_eq!(active_count(&ctx.pool).await, 1);
    assert_eq!(repo.active_quote().await.unwrap().unwrap().id, second.id);
    assert!(!repo.get_quote(first.id).await.unwrap().unwrap().activa);
    assert_eq!(repo.list_quotes().await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_concurrent_publications_leave_one_active_quote() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = std::sync::Arc::new(ctx.repository());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.replace_active_quote(new_quote(&format!("frase {i}")))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(active_count(&ctx.pool).await, 1);
    assert_eq!(repo.list_quotes().await.unwrap().len(), 8);
}

#[tokio::test]
#[serial]
async fn test_quote_activation_and_rollback_on_missing_row() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    let first = repo.replace_active_quote(new_quote("uno")).await.unwrap();
    let second = repo.replace_active_quote(new_quote("dos")).await.unwrap();

    // Re-activating the older quote deactivates the current one.
    let reactivated = repo
        .update_quote(
            first.id,
            QuoteUpdate {
                activa: Some(true),
                autor: Some(None),
                ..QuoteUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(reactivated.activa);
    assert_eq!(reactivated.autor, None);
    assert_eq!(reactivated.frase, "uno");
    assert!(!repo.get_quote(second.id).await.unwrap().unwrap().activa);

    // Activating a missing row must not leave the table without its active quote.
    let missing = repo
        .update_quote(
            9999,
            QuoteUpdate {
                activa: Some(true),
                ..QuoteUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(missing.is_none());
    assert_eq!(repo.active_quote().await.unwrap().unwrap().id, first.id);
    assert_eq!(active_count(&ctx.pool).await, 1);
}

#[tokio::test]
#[serial]
async fn test_expire_quotes_uses_publication_time() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    // fecha_publicacion comes from the column default.
    let quote = repo.replace_active_quote(new_quote("hoy")).await.unwrap();
    let cutoff = Utc::now() - Duration::hours(12);
    assert_eq!(repo.expire_quotes(cutoff).await.unwrap(), 0);
    assert!(repo.get_quote(quote.id).await.unwrap().unwrap().activa);

    sqlx::query("UPDATE frases_dia SET fecha_publicacion = NOW() - INTERVAL '13 hours' WHERE id = $1")
        .bind(quote.id)
        .execute(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(repo.expire_quotes(cutoff).await.unwrap(), 1);
    assert!(repo.active_quote().await.unwrap().is_none());

    // Already inactive rows are not counted again.
    assert_eq!(repo.expire_quotes(cutoff).await.unwrap(), 0);
}
