//! Profile repository implementation

use super::{db_error, is_violation, UNIQUE_VIOLATION};
use rentshare_core::{
    models::{Profile, UserRole},
    traits::{ProfileRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, email, password_hash, full_name, avatar_url, bio, location, \
     role, verified, suspended, created_at, updated_at";

/// PostgreSQL implementation of ProfileRepository
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Profile, Uuid> for PgProfileRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        debug!("Finding profile by id: {}", id);

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find profile", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, entity), fields(email = %entity.email))]
    async fn create(&self, entity: &Profile) -> AppResult<Profile> {
        debug!("Creating profile");

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (
                id, email, password_hash, full_name, avatar_url, bio, location,
                role, verified, suspended
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.email)
        .bind(&entity.password_hash)
        .bind(&entity.full_name)
        .bind(&entity.avatar_url)
        .bind(&entity.bio)
        .bind(&entity.location)
        .bind(entity.role.to_string())
        .bind(entity.verified)
        .bind(entity.suspended)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                AppError::AlreadyExists(format!("Email {} is already registered", entity.email))
            } else {
                db_error("create profile", e)
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity), fields(id = %entity.id))]
    async fn update(&self, entity: &Profile) -> AppResult<Profile> {
        debug!("Updating profile");

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles
            SET full_name = $2,
                avatar_url = $3,
                bio = $4,
                location = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.full_name)
        .bind(&entity.avatar_url)
        .bind(&entity.bio)
        .bind(&entity.location)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update profile", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::UserNotFound(entity.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete profile", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE LOWER(email) = LOWER($1)",
            PROFILE_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find profile by email", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn set_suspended(&self, id: Uuid, suspended: bool) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles
            SET suspended = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(suspended)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error suspending profile {}: {}", id, e);
            AppError::Database(format!("Failed to update profile: {}", e))
        })?;

        row.map(Into::into)
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    role: String,
    verified: bool,
    suspended: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            bio: row.bio,
            location: row.location,
            role: UserRole::from_str(&row.role).unwrap_or_default(),
            verified: row.verified,
            suspended: row.suspended,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
