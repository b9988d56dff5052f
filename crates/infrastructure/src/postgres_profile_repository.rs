//! PostgreSQL-backed profile repository.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use severatee_application::{NewProfile, ProfileChanges, ProfileRepository};
use severatee_core::{AppError, AppResult, UserId};
use severatee_domain::Profile;

/// PostgreSQL implementation of the profile repository port.
#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: uuid::Uuid,
    name: Option<String>,
    avatar_url: Option<String>,
    username: Option<String>,
    email: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            avatar_url: row.avatar_url,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "id, name, avatar_url, username, email, created_at, updated_at, deleted_at";

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE id = $1
            "#,
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find profile: {error}")))?;

        Ok(row.map(Profile::from))
    }

    async fn insert(&self, profile: NewProfile) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (id, name, email)
            VALUES ($1, $2, $3)
            RETURNING {PROFILE_COLUMNS}
            "#,
        ))
        .bind(profile.id.as_uuid())
        .bind(&profile.name)
        .bind(&profile.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(ref database_error) = error {
                if database_error.code().as_deref() == Some("23505") {
                    return AppError::Conflict(format!(
                        "profile '{}' already exists",
                        profile.id
                    ));
                }
            }
            AppError::Internal(format!("failed to insert profile: {error}"))
        })?;

        Ok(Profile::from(row))
    }

    async fn update(&self, user_id: UserId, changes: ProfileChanges) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles
            SET name = COALESCE($2, name),
                avatar_url = COALESCE($3, avatar_url),
                username = COALESCE($4, username),
                updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#,
        ))
        .bind(user_id.as_uuid())
        .bind(&changes.name)
        .bind(&changes.avatar_url)
        .bind(&changes.username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update profile: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("profile '{user_id}' not found")))?;

        Ok(Profile::from(row))
    }
}
