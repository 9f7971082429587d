//! Postgres implementation of `PlatformStore` using sqlx.

use crate::store::models::{AccountIdentity, Installation, Project, User};
use crate::store::traits::PlatformStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

/// Postgres-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            email: r.email,
            name: r.name,
            password_hash: r.password_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    github_repo: String,
    manifest_yaml: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(r: ProjectRow) -> Self {
        Project {
            id: r.id,
            name: r.name,
            owner_id: r.owner_id,
            github_repo: r.github_repo,
            manifest_yaml: r.manifest_yaml,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InstallationRow {
    id: Uuid,
    installation_id: i64,
    account_login: Option<String>,
    account_source: String,
    account_type: String,
    permissions: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InstallationRow> for Installation {
    fn from(r: InstallationRow) -> Self {
        Installation {
            id: r.id,
            installation_id: r.installation_id,
            account: AccountIdentity::from_columns(r.account_login, &r.account_source),
            account_type: r.account_type,
            permissions: r.permissions,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[async_trait]
impl PlatformStore for PgStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get user")?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get user by email")?;
        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "UPDATE users SET name = $2, password_hash = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;
        Ok(())
    }

    async fn create_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, owner_id, github_repo, manifest_yaml, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(project.owner_id)
        .bind(&project.github_repo)
        .bind(&project.manifest_yaml)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create project")?;
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, owner_id, github_repo, manifest_yaml, created_at, updated_at
            FROM projects WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get project")?;
        Ok(row.map(Project::from))
    }

    async fn get_project_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, owner_id, github_repo, manifest_yaml, created_at, updated_at
            FROM projects WHERE owner_id = $1 AND name = $2
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get project by name")?;
        Ok(row.map(Project::from))
    }

    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, owner_id, github_repo, manifest_yaml, created_at, updated_at
            FROM projects WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list projects")?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn update_project_manifest(&self, id: Uuid, manifest_yaml: &str) -> Result<()> {
        sqlx::query(
            "UPDATE projects SET manifest_yaml = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(manifest_yaml)
        .execute(&self.pool)
        .await
        .context("Failed to update project manifest")?;
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete project")?;
        Ok(())
    }

    async fn upsert_installation(&self, installation: &Installation) -> Result<()> {
        let (login, source) = installation.account.to_columns();
        sqlx::query(
            r#"
            INSERT INTO installations
                (id, installation_id, account_login, account_source, account_type, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (installation_id) DO UPDATE SET
                account_login = EXCLUDED.account_login,
                account_source = EXCLUDED.account_source,
                account_type = EXCLUDED.account_type,
                permissions = EXCLUDED.permissions,
                updated_at = NOW()
            "#,
        )
        .bind(installation.id)
        .bind(installation.installation_id)
        .bind(login)
        .bind(source)
        .bind(&installation.account_type)
        .bind(&installation.permissions)
        .bind(installation.created_at)
        .bind(installation.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert installation")?;
        Ok(())
    }

    async fn get_installation(&self, installation_id: i64) -> Result<Option<Installation>> {
        let row = sqlx::query_as::<_, InstallationRow>(
            r#"
            SELECT id, installation_id, account_login, account_source, account_type,
                   permissions, created_at, updated_at
            FROM installations WHERE installation_id = $1
            "#,
        )
        .bind(installation_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get installation")?;
        Ok(row.map(Installation::from))
    }

    async fn delete_installation(&self, installation_id: i64) -> Result<()> {
        // user_installations rows go with it via ON DELETE CASCADE
        sqlx::query("DELETE FROM installations WHERE installation_id = $1")
            .bind(installation_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete installation")?;
        Ok(())
    }

    async fn list_installations_for_user(&self, user_id: Uuid) -> Result<Vec<Installation>> {
        let rows = sqlx::query_as::<_, InstallationRow>(
            r#"
            SELECT i.id, i.installation_id, i.account_login, i.account_source, i.account_type,
                   i.permissions, i.created_at, i.updated_at
            FROM installations i
            JOIN user_installations ui ON ui.installation_id = i.installation_id
            WHERE ui.user_id = $1
            ORDER BY i.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list installations")?;
        Ok(rows.into_iter().map(Installation::from).collect())
    }

    async fn link_user_to_installation(&self, user_id: Uuid, installation_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_installations (user_id, installation_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(installation_id)
        .execute(&self.pool)
        .await
        .context("Failed to link installation")?;
        Ok(())
    }

    async fn is_user_linked(&self, user_id: Uuid, installation_id: i64) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM user_installations WHERE user_id = $1 AND installation_id = $2",
        )
        .bind(user_id)
        .bind(installation_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check installation link")?;
        Ok(row.is_some())
    }

    async fn update_installation_account(
        &self,
        installation_id: i64,
        account: &AccountIdentity,
    ) -> Result<()> {
        let (login, source) = account.to_columns();
        sqlx::query(
            r#"
            UPDATE installations
            SET account_login = $2, account_source = $3, updated_at = NOW()
            WHERE installation_id = $1
            "#,
        )
        .bind(installation_id)
        .bind(login)
        .bind(source)
        .execute(&self.pool)
        .await
        .context("Failed to update installation account")?;
        Ok(())
    }
}
