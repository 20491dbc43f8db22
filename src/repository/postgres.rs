use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::{Repository, StoreResult};
use crate::models::{
    EmergencyNumber, EmergencyNumberUpdate, NewEmergencyNumber, NewQuote, NewTip, NewUser, Quote,
    QuoteUpdate, Tip, TipUpdate, User, UserUpdate,
};

const USER_COLUMNS: &str = "id, username, email, password, rol";
const EMERGENCY_COLUMNS: &str = "id, nombre, numero, descripcion, icono, categoria, badge, activo";
const TIP_COLUMNS: &str = "id, titulo, descripcion, icono, etiquetas, activo, fecha_creacion";
const QUOTE_COLUMNS: &str = "id, frase, autor, activa, fecha_publicacion";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are bound at runtime (`query_as::<_, T>`), so the crate builds without a live
/// database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Opens a transaction that owns the quote table for writing.
    ///
    /// SHARE ROW EXCLUSIVE conflicts with itself, so two concurrent replacements cannot
    /// both leave a quote active, while plain readers are never blocked.
    async fn begin_quote_write(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE frases_dia IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- CREDENTIAL STORE ---

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM usuarios ORDER BY id DESC");
        Ok(sqlx::query_as::<_, User>(&query).fetch_all(&self.pool).await?)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_exists(&self, username: &str, email: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM usuarios WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO usuarios (username, email, password, rol) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    /// Uses `COALESCE` so that only the `Some` fields of `update` overwrite the row; the
    /// password hash in particular is only replaced when a new one was computed.
    async fn update_user(&self, id: i64, update: UserUpdate) -> StoreResult<Option<User>> {
        let query = format!(
            r#"
            UPDATE usuarios
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                rol = COALESCE($4, rol),
                password = COALESCE($5, password)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(update.username)
            .bind(update.email)
            .bind(update.role.map(|r| r.as_str()))
            .bind(update.password_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM usuarios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- EMERGENCY NUMBERS ---

    async fn list_emergency_numbers(&self, active_only: bool) -> StoreResult<Vec<EmergencyNumber>> {
        let filter = if active_only { "WHERE activo = TRUE" } else { "" };
        let query = format!(
            "SELECT {EMERGENCY_COLUMNS} FROM numeros_emergencia {filter} ORDER BY categoria, nombre"
        );
        Ok(sqlx::query_as::<_, EmergencyNumber>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_emergency_number(&self, id: i64) -> StoreResult<Option<EmergencyNumber>> {
        let query = format!("SELECT {EMERGENCY_COLUMNS} FROM numeros_emergencia WHERE id = $1");
        Ok(sqlx::query_as::<_, EmergencyNumber>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_emergency_number(&self, number: NewEmergencyNumber) -> StoreResult<EmergencyNumber> {
        let query = format!(
            r#"
            INSERT INTO numeros_emergencia (nombre, numero, descripcion, icono, categoria, badge, activo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EMERGENCY_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, EmergencyNumber>(&query)
            .bind(number.nombre)
            .bind(number.numero)
            .bind(number.descripcion)
            .bind(number.icono)
            .bind(number.categoria)
            .bind(number.badge)
            .bind(number.activo)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_emergency_number(
        &self,
        id: i64,
        update: EmergencyNumberUpdate,
    ) -> StoreResult<Option<EmergencyNumber>> {
        let query = format!(
            r#"
            UPDATE numeros_emergencia
            SET nombre = COALESCE($2, nombre),
                numero = COALESCE($3, numero),
                descripcion = COALESCE($4, descripcion),
                icono = COALESCE($5, icono),
                categoria = COALESCE($6, categoria),
                badge = CASE WHEN $7 THEN $8 ELSE badge END,
                activo = COALESCE($9, activo)
            WHERE id = $1
            RETURNING {EMERGENCY_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, EmergencyNumber>(&query)
            .bind(id)
            .bind(update.nombre)
            .bind(update.numero)
            .bind(update.descripcion)
            .bind(update.icono)
            .bind(update.categoria)
            .bind(update.badge.is_some())
            .bind(update.badge.flatten())
            .bind(update.activo)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_emergency_number(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM numeros_emergencia WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- TIPS ---

    async fn list_tips(&self, active_only: bool) -> StoreResult<Vec<Tip>> {
        let filter = if active_only { "WHERE activo = TRUE" } else { "" };
        let query = format!(
            "SELECT {TIP_COLUMNS} FROM consejos_clima {filter} ORDER BY fecha_creacion DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Tip>(&query).fetch_all(&self.pool).await?)
    }

    async fn get_tip(&self, id: i64) -> StoreResult<Option<Tip>> {
        let query = format!("SELECT {TIP_COLUMNS} FROM consejos_clima WHERE id = $1");
        Ok(sqlx::query_as::<_, Tip>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_tip(&self, tip: NewTip) -> StoreResult<Tip> {
        let query = format!(
            "INSERT INTO consejos_clima (titulo, descripcion, icono, etiquetas, activo) VALUES ($1, $2, $3, $4, $5) RETURNING {TIP_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Tip>(&query)
            .bind(tip.titulo)
            .bind(tip.descripcion)
            .bind(tip.icono)
            .bind(tip.etiquetas)
            .bind(tip.activo)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_tip(&self, id: i64, update: TipUpdate) -> StoreResult<Option<Tip>> {
        let query = format!(
            r#"
            UPDATE consejos_clima
            SET titulo = COALESCE($2, titulo),
                descripcion = COALESCE($3, descripcion),
                icono = COALESCE($4, icono),
                etiquetas = CASE WHEN $5 THEN $6 ELSE etiquetas END,
                activo = COALESCE($7, activo)
            WHERE id = $1
            RETURNING {TIP_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Tip>(&query)
            .bind(id)
            .bind(update.titulo)
            .bind(update.descripcion)
            .bind(update.icono)
            .bind(update.etiquetas.is_some())
            .bind(update.etiquetas.flatten())
            .bind(update.activo)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_tip(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM consejos_clima WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- QUOTE OF THE DAY ---

    async fn list_quotes(&self) -> StoreResult<Vec<Quote>> {
        let query = format!(
            "SELECT {QUOTE_COLUMNS} FROM frases_dia ORDER BY fecha_publicacion DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Quote>(&query).fetch_all(&self.pool).await?)
    }

    async fn get_quote(&self, id: i64) -> StoreResult<Option<Quote>> {
        let query = format!("SELECT {QUOTE_COLUMNS} FROM frases_dia WHERE id = $1");
        Ok(sqlx::query_as::<_, Quote>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn active_quote(&self) -> StoreResult<Option<Quote>> {
        let query = format!(
            "SELECT {QUOTE_COLUMNS} FROM frases_dia WHERE activa = TRUE ORDER BY fecha_publicacion DESC, id DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, Quote>(&query)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// The deactivate-all and the insert share one transaction: concurrent readers see
    /// either the previous active quote or the new one, never an empty window.
    async fn replace_active_quote(&self, quote: NewQuote) -> StoreResult<Quote> {
        let mut tx = self.begin_quote_write().await?;

        sqlx::query("UPDATE frases_dia SET activa = FALSE WHERE activa = TRUE")
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO frases_dia (frase, autor, activa) VALUES ($1, $2, TRUE) RETURNING {QUOTE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Quote>(&query)
            .bind(quote.frase)
            .bind(quote.autor)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_quote(&self, id: i64, update: QuoteUpdate) -> StoreResult<Option<Quote>> {
        let mut tx = self.begin_quote_write().await?;

        if update.activa == Some(true) {
            sqlx::query("UPDATE frases_dia SET activa = FALSE WHERE activa = TRUE AND id <> $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let query = format!(
            r#"
            UPDATE frases_dia
            SET frase = COALESCE($2, frase),
                autor = CASE WHEN $3 THEN $4 ELSE autor END,
                activa = COALESCE($5, activa)
            WHERE id = $1
            RETURNING {QUOTE_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Quote>(&query)
            .bind(id)
            .bind(update.frase)
            .bind(update.autor.is_some())
            .bind(update.autor.flatten())
            .bind(update.activa)
            .fetch_optional(&mut *tx)
            .await?;

        // Missing row: dropping the transaction rolls back the deactivation above.
        if updated.is_some() {
            tx.commit().await?;
        }
        Ok(updated)
    }

    async fn delete_quote(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM frases_dia WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn expire_quotes(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let res = sqlx::query(
            "UPDATE frases_dia SET activa = FALSE WHERE fecha_publicacion < $1 AND activa = TRUE",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
