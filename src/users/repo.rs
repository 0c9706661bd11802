use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{NewUser, User, UserRow};
use super::store::{StoreError, UserListQuery, UserPage, UserStore};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, provider, external_id, \
                            is_admin, last_login, created_at, updated_at";

/// `UserStore` backed by the Postgres `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        row.map(User::try_from).transpose().map_err(StoreError::from)
    }
}

fn map_write_error(e: sqlx::Error, what: &'static str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.constraint().unwrap_or("user").to_string())
        }
        _ => StoreError::Backend(anyhow::Error::new(e).context(what)),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        row.map(User::try_from).transpose().map_err(StoreError::from)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.fetch_one_by("email", email).await
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        self.fetch_one_by("external_id", external_id).await
    }

    async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1 OR lower(username) = lower($2)
            )
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.db)
        .await
        .context("check user exists")?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, provider, external_id, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.credentials.password_hash())
            .bind(user.role.as_str())
            .bind(user.credentials.provider().as_str())
            .bind(user.credentials.external_id())
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_write_error(e, "insert user"))?;
        Ok(User::try_from(row)?)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = now(), updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("update last_login")?;
        Ok(())
    }

    async fn record_logout(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("record logout")?;
        Ok(())
    }

    async fn list(&self, query: &UserListQuery) -> Result<UserPage, StoreError> {
        let direction = if query.sort.descending { "DESC" } else { "ASC" };
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY {} {direction} NULLS LAST, id
            LIMIT $2 OFFSET $3
            "#,
            query.sort.field.column(),
        );
        let role = query.role.map(|r| r.as_str());
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(role)
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch_all(&self.db)
            .await
            .context("list users")?;

        let total: i64 =
            sqlx::query_scalar("SELECT count(*) FROM users WHERE ($1::text IS NULL OR role = $1)")
                .bind(role)
                .fetch_one(&self.db)
                .await
                .context("count users")?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(UserPage {
            users,
            total: total.max(0) as u64,
        })
    }
}
