//! In-memory storage implementation
//!
//! Backs local development when no DATABASE_URL is configured, and the test suite. Each
//! operation runs under a single lock acquisition, which gives it the same atomicity the
//! Postgres implementation gets from statements and transactions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Repository, StoreResult};
use crate::error::AppError;
use crate::models::{
    EmergencyNumber, EmergencyNumberUpdate, NewEmergencyNumber, NewQuote, NewTip, NewUser, Quote,
    QuoteUpdate, Tip, TipUpdate, User, UserUpdate,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    emergency_numbers: BTreeMap<i64, EmergencyNumber>,
    tips: BTreeMap<i64, Tip>,
    quotes: BTreeMap<i64, Quote>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn username_or_email_taken(&self, username: &str, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .filter(|u| Some(u.id) != except)
            .any(|u| u.username == username || u.email == email)
    }
}

/// In-memory repository
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an unreachable store: every operation fails with `AppError::Connection`
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inserts a quote with an explicit publication time (for testing purposes).
    /// Does not touch other rows.
    pub async fn insert_quote_at(
        &self,
        frase: &str,
        activa: bool,
        fecha_publicacion: DateTime<Utc>,
    ) -> Quote {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let quote = Quote {
            id,
            frase: frase.to_string(),
            autor: None,
            activa,
            fecha_publicacion,
        };
        tables.quotes.insert(id, quote.clone());
        quote
    }

    async fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.check_available()?;
        Ok(self.tables.read().await)
    }

    async fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.check_available()?;
        Ok(self.tables.write().await)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Connection("in-memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read().await?.users.values().rev().cloned().collect())
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.read().await?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()
            .await?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_exists(&self, username: &str, email: &str) -> StoreResult<bool> {
        Ok(self.read().await?.username_or_email_taken(username, email, None))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.write().await?;
        if tables.username_or_email_taken(&user.username, &user.email, None) {
            return Err(AppError::DuplicateUser);
        }
        let id = tables.next_id();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> StoreResult<Option<User>> {
        let mut tables = self.write().await?;
        let Some(current) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        let username = update.username.unwrap_or(current.username);
        let email = update.email.unwrap_or(current.email);
        if tables.username_or_email_taken(&username, &email, Some(id)) {
            return Err(AppError::DuplicateUser);
        }

        let updated = User {
            id,
            username,
            email,
            password_hash: update.password_hash.unwrap_or(current.password_hash),
            role: update.role.unwrap_or(current.role),
        };
        tables.users.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        Ok(self.write().await?.users.remove(&id).is_some())
    }

    async fn list_emergency_numbers(&self, active_only: bool) -> StoreResult<Vec<EmergencyNumber>> {
        let tables = self.read().await?;
        let mut numbers: Vec<EmergencyNumber> = tables
            .emergency_numbers
            .values()
            .filter(|n| !active_only || n.activo)
            .cloned()
            .collect();
        numbers.sort_by(|a, b| (&a.categoria, &a.nombre).cmp(&(&b.categoria, &b.nombre)));
        Ok(numbers)
    }

    async fn get_emergency_number(&self, id: i64) -> StoreResult<Option<EmergencyNumber>> {
        Ok(self.read().await?.emergency_numbers.get(&id).cloned())
    }

    async fn create_emergency_number(&self, number: NewEmergencyNumber) -> StoreResult<EmergencyNumber> {
        let mut tables = self.write().await?;
        let id = tables.next_id();
        let created = EmergencyNumber {
            id,
            nombre: number.nombre,
            numero: number.numero,
            descripcion: number.descripcion,
            icono: number.icono,
            categoria: number.categoria,
            badge: number.badge,
            activo: number.activo,
        };
        tables.emergency_numbers.insert(id, created.clone());
        Ok(created)
    }

    async fn update_emergency_number(
        &self,
        id: i64,
        update: EmergencyNumberUpdate,
    ) -> StoreResult<Option<EmergencyNumber>> {
        let mut tables = self.write().await?;
        let Some(number) = tables.emergency_numbers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(nombre) = update.nombre {
            number.nombre = nombre;
        }
        if let Some(numero) = update.numero {
            number.numero = numero;
        }
        if let Some(descripcion) = update.descripcion {
            number.descripcion = descripcion;
        }
        if let Some(icono) = update.icono {
            number.icono = icono;
        }
        if let Some(categoria) = update.categoria {
            number.categoria = categoria;
        }
        if let Some(badge) = update.badge {
            number.badge = badge;
        }
        if let Some(activo) = update.activo {
            number.activo = activo;
        }
        Ok(Some(number.clone()))
    }

    async fn delete_emergency_number(&self, id: i64) -> StoreResult<bool> {
        Ok(self.write().await?.emergency_numbers.remove(&id).is_some())
    }

    async fn list_tips(&self, active_only: bool) -> StoreResult<Vec<Tip>> {
        let tables = self.read().await?;
        let mut tips: Vec<Tip> = tables
            .tips
            .values()
            .filter(|t| !active_only || t.activo)
            .cloned()
            .collect();
        tips.sort_by(|a, b| (b.fecha_creacion, b.id).cmp(&(a.fecha_creacion, a.id)));
        Ok(tips)
    }

    async fn get_tip(&self, id: i64) -> StoreResult<Option<Tip>> {
        Ok(self.read().await?.tips.get(&id).cloned())
    }

    async fn create_tip(&self, tip: NewTip) -> StoreResult<Tip> {
        let mut tables = self.write().await?;
        let id = tables.next_id();
        let created = Tip {
            id,
            titulo: tip.titulo,
            descripcion: tip.descripcion,
            icono: tip.icono,
            etiquetas: tip.etiquetas,
            activo: tip.activo,
            fecha_creacion: Utc::now(),
        };
        tables.tips.insert(id, created.clone());
        Ok(created)
    }

    async fn update_tip(&self, id: i64, update: TipUpdate) -> StoreResult<Option<Tip>> {
        let mut tables = self.write().await?;
        let Some(tip) = tables.tips.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(titulo) = update.titulo {
            tip.titulo = titulo;
        }
        if let Some(descripcion) = update.descripcion {
            tip.descripcion = descripcion;
        }
        if let Some(icono) = update.icono {
            tip.icono = icono;
        }
        if let Some(etiquetas) = update.etiquetas {
            tip.etiquetas = etiquetas;
        }
        if let Some(activo) = update.activo {
            tip.activo = activo;
        }
        Ok(Some(tip.clone()))
    }

    async fn delete_tip(&self, id: i64) -> StoreResult<bool> {
        Ok(self.write().await?.tips.remove(&id).is_some())
    }

    async fn list_quotes(&self) -> StoreResult<Vec<Quote>> {
        let tables = self.read().await?;
        let mut quotes: Vec<Quote> = tables.quotes.values().cloned().collect();
        quotes.sort_by(|a, b| (b.fecha_publicacion, b.id).cmp(&(a.fecha_publicacion, a.id)));
        Ok(quotes)
    }

    async fn get_quote(&self, id: i64) -> StoreResult<Option<Quote>> {
        Ok(self.read().await?.quotes.get(&id).cloned())
    }

    async fn active_quote(&self) -> StoreResult<Option<Quote>> {
        Ok(self
            .read()
            .await?
            .quotes
            .values()
            .filter(|q| q.activa)
            .max_by_key(|q| (q.fecha_publicacion, q.id))
            .cloned())
    }

    async fn replace_active_quote(&self, quote: NewQuote) -> StoreResult<Quote> {
        let mut tables = self.write().await?;
        for existing in tables.quotes.values_mut() {
            existing.activa = false;
        }
        let id = tables.next_id();
        let created = Quote {
            id,
            frase: quote.frase,
            autor: quote.autor,
            activa: true,
            fecha_publicacion: Utc::now(),
        };
        tables.quotes.insert(id, created.clone());
        Ok(created)
    }

    async fn update_quote(&self, id: i64, update: QuoteUpdate) -> StoreResult<Option<Quote>> {
        let mut tables = self.write().await?;
        if !tables.quotes.contains_key(&id) {
            return Ok(None);
        }
        if update.activa == Some(true) {
            for (other_id, other) in tables.quotes.iter_mut() {
                if *other_id != id {
                    other.activa = false;
                }
            }
        }
        let Some(quote) = tables.quotes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(frase) = update.frase {
            quote.frase = frase;
        }
        if let Some(autor) = update.autor {
            quote.autor = autor;
        }
        if let Some(activa) = update.activa {
            quote.activa = activa;
        }
        Ok(Some(quote.clone()))
    }

    async fn delete_quote(&self, id: i64) -> StoreResult<bool> {
        Ok(self.write().await?.quotes.remove(&id).is_some())
    }

    async fn expire_quotes(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.write().await?;
        let mut affected = 0;
        for quote in tables.quotes.values_mut() {
            if quote.activa && quote.fecha_publicacion < cutoff {
                quote.activa = false;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = InMemoryRepository::new();
        repo.create_user(new_user("ana", "ana@x.com")).await.unwrap();
        let err = repo
            .create_user(new_user("otra", "ana@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUser));
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn users_are_listed_newest_first() {
        let repo = InMemoryRepository::new();
        let first = repo.create_user(new_user("ana", "a@x.com")).await.unwrap();
        let second = repo.create_user(new_user("beto", "b@x.com")).await.unwrap();
        let ids: Vec<i64> = repo.list_users().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn unavailable_store_reports_connection_error() {
        let repo = InMemoryRepository::new();
        repo.set_unavailable(true);
        assert!(matches!(
            repo.list_tips(true).await,
            Err(AppError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn activating_a_quote_deactivates_the_rest() {
        let repo = InMemoryRepository::new();
        let old = repo
            .replace_active_quote(NewQuote {
                frase: "uno".into(),
                autor: None,
            })
            .await
            .unwrap();
        let new = repo
            .replace_active_quote(NewQuote {
                frase: "dos".into(),
                autor: None,
            })
            .await
            .unwrap();

        repo.update_quote(
            old.id,
            QuoteUpdate {
                activa: Some(true),
                ..QuoteUpdate::default()
            },
        )
        .await
        .unwrap();

        let quotes = repo.list_quotes().await.unwrap();
        let active: Vec<i64> = quotes.iter().filter(|q| q.activa).map(|q| q.id).collect();
        assert_eq!(active, vec![old.id]);
        assert!(!repo.get_quote(new.id).await.unwrap().unwrap().activa);
    }
}
