//! Admin-managed content: emergency numbers, weather tips and the quote of the day.
//!
//! Each resource exposes the same contract (`list`, `get`, `create`, `update`, `delete`
//! for administrators, `public_list` for everyone).

pub mod emergency {
    use crate::{
        auth::require_admin,
        error::AppError,
        models::{EmergencyNumber, EmergencyNumberUpdate, NewEmergencyNumber},
        repository::Repository,
        session::Session,
    };

    pub async fn list(
        repo: &dyn Repository,
        session: Option<&Session>,
    ) -> Result<Vec<EmergencyNumber>, AppError> {
        require_admin(session)?;
        repo.list_emergency_numbers(false).await
    }

    pub async fn get(
        repo: &dyn Repository,
        session: Option<&Session>,
        id: i64,
    ) -> Result<EmergencyNumber, AppError> {
        require_admin(session)?;
        repo.get_emergency_number(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn create(
        repo: &dyn Repository,
        session: Option<&Session>,
        number: NewEmergencyNumber,
    ) -> Result<EmergencyNumber, AppError> {
        let actor = require_admin(session)?;
        let created = repo.create_emergency_number(number).await?;
        tracing::info!(actor = actor.user_id, id = created.id, "emergency number created");
        Ok(created)
    }

    pub async fn update(
        repo: &dyn Repository,
        session: Option<&Session>,
        id: i64,
        update: EmergencyNumberUpdate,
    ) -> Result<EmergencyNumber, AppError> {
        require_admin(session)?;
        repo.update_emergency_number(id, update)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn delete(
        repo: &dyn Repository,
        session: Option<&Session>,
        id: i64,
    ) -> Result<(), AppError> {
        let actor = require_admin(session)?;
        if !repo.delete_emergency_number(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(actor = actor.user_id, id, "emergency number deleted");
        Ok(())
    }

    /// Active numbers ordered by category, then name.
    pub async fn public_list(repo: &dyn Repository) -> Result<Vec<EmergencyNumber>, AppError> {
        repo.list_emergency_numbers(true).await
    }
}

pub mod tips {
    use crate::{
        auth::require_admin,
        error::AppError,
        models::{NewTip, Tip, TipUpdate},
        repository::Repository,
        session::Session,
    };

    pub async fn list(repo: &dyn Repository, session: Option<&Session>) -> Result<Vec<Tip>, AppError> {
        require_admin(session)?;
        repo.list_tips(false).await
    }

    pub async fn get(repo: &dyn Repository, session: Option<&Session>, id: i64) -> Result<Tip, AppError> {
        require_admin(session)?;
        repo.get_tip(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn create(
        repo: &dyn Repository,
        session: Option<&Session>,
        tip: NewTip,
    ) -> Result<Tip, AppError> {
        let actor = require_admin(session)?;
        let created = repo.create_tip(tip).await?;
        tracing::info!(actor = actor.user_id, id = created.id, "tip created");
        Ok(created)
    }

    pub async fn update(
        repo: &dyn Repository,
        session: Option<&Session>,
        id: i64,
        update: TipUpdate,
    ) -> Result<Tip, AppError> {
        require_admin(session)?;
        repo.update_tip(id, update).await?.ok_or(AppError::NotFound)
    }

    pub async fn delete(repo: &dyn Repository, session: Option<&Session>, id: i64) -> Result<(), AppError> {
        let actor = require_admin(session)?;
        if !repo.delete_tip(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(actor = actor.user_id, id, "tip deleted");
        Ok(())
    }

    /// Active tips, newest first.
    pub async fn public_list(repo: &dyn Repository) -> Result<Vec<Tip>, AppError> {
        repo.list_tips(true).await
    }
}

pub mod quotes {
    use crate::{
        auth::require_admin,
        error::AppError,
        models::{NewQuote, Quote, QuoteUpdate},
        repository::Repository,
        session::Session,
    };

    pub async fn list(repo: &dyn Repository, session: Option<&Session>) -> Result<Vec<Quote>, AppError> {
        require_admin(session)?;
        repo.list_quotes().await
    }

    pub async fn get(repo: &dyn Repository, session: Option<&Session>, id: i64) -> Result<Quote, AppError> {
        require_admin(session)?;
        repo.get_quote(id).await?.ok_or(AppError::NotFound)
    }

    /// Publishes a new quote of the day, retiring whichever one was active.
    pub async fn create(
        repo: &dyn Repository,
        session: Option<&Session>,
        quote: NewQuote,
    ) -> Result<Quote, AppError> {
        let actor = require_admin(session)?;
        let created = repo.replace_active_quote(quote).await?;
        tracing::info!(actor = actor.user_id, id = created.id, "quote of the day replaced");
        Ok(created)
    }

    pub async fn update(
        repo: &dyn Repository,
        session: Option<&Session>,
        id: i64,
        update: QuoteUpdate,
    ) -> Result<Quote, AppError> {
        require_admin(session)?;
        repo.update_quote(id, update).await?.ok_or(AppError::NotFound)
    }

    pub async fn delete(repo: &dyn Repository, session: Option<&Session>, id: i64) -> Result<(), AppError> {
        let actor = require_admin(session)?;
        if !repo.delete_quote(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(actor = actor.user_id, id, "quote deleted");
        Ok(())
    }

    /// The active quote, if there is one.
    pub async fn public_list(repo: &dyn Repository) -> Result<Option<Quote>, AppError> {
        repo.active_quote().await
    }
}
