use crate::{
    auth::{hash_password, require_admin},
    error::AppError,
    models::{CreateUserInput, EditUserInput, NewUser, User, UserUpdate},
    repository::Repository,
    session::{Session, SessionStore},
};

/// Lists users for the admin dashboard.
///
/// Blank search: every user, newest id first. A numeric search is an exact id lookup; any
/// other text matches nothing.
pub async fn list(
    repo: &dyn Repository,
    session: Option<&Session>,
    search: Option<&str>,
) -> Result<Vec<User>, AppError> {
    require_admin(session)?;
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => repo.list_users().await,
        Some(term) => match term.parse::<i64>() {
            Ok(id) => Ok(repo.get_user(id).await?.into_iter().collect()),
            Err(_) => Ok(Vec::new()),
        },
    }
}

pub async fn get(repo: &dyn Repository, session: Option<&Session>, id: i64) -> Result<User, AppError> {
    require_admin(session)?;
    repo.get_user(id).await?.ok_or(AppError::NotFound)
}

pub async fn create(
    repo: &dyn Repository,
    session: Option<&Session>,
    input: CreateUserInput,
) -> Result<User, AppError> {
    let actor = require_admin(session)?;
    if repo.user_exists(&input.username, &input.email).await? {
        return Err(AppError::DuplicateUser);
    }
    let user = repo
        .create_user(NewUser {
            username: input.username,
            email: input.email,
            password_hash: hash_password(&input.password)?,
            role: input.role,
        })
        .await?;
    tracing::info!(actor = actor.user_id, user_id = user.id, "user created");
    Ok(user)
}

/// Partial update. The password hash only changes when a new password was supplied.
pub async fn update(
    repo: &dyn Repository,
    session: Option<&Session>,
    id: i64,
    input: EditUserInput,
) -> Result<User, AppError> {
    let actor = require_admin(session)?;
    let password_hash = match input.new_password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let user = repo
        .update_user(
            id,
            UserUpdate {
                username: input.username,
                email: input.email,
                role: input.role,
                password_hash,
            },
        )
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(actor = actor.user_id, user_id = id, "user updated");
    Ok(user)
}

/// Deletes a user and ends every session they still hold. An admin can never delete the
/// account they are logged in with.
pub async fn delete(
    repo: &dyn Repository,
    sessions: &dyn SessionStore,
    session: Option<&Session>,
    id: i64,
) -> Result<(), AppError> {
    let actor = require_admin(session)?;
    if actor.user_id == id {
        return Err(AppError::SelfDeletionForbidden);
    }
    if !repo.delete_user(id).await? {
        return Err(AppError::NotFound);
    }
    let revoked = sessions.delete_user_sessions(id);
    tracing::info!(actor = actor.user_id, user_id = id, revoked, "user deleted");
    Ok(())
}
