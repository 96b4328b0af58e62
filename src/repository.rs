use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    FromRow, PgConnection, PgPool, Postgres,
    postgres::PgRow,
    query_builder::{QueryBuilder, Separated},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RepoError;

/// DeleteMode
///
/// `Soft` flips `is_active` off and keeps the row; `Hard` removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Soft,
    Hard,
}

/// Resource
///
/// Describes one owner-scoped table to the generic repositories: where it lives, how
/// a row is built from a create payload, how a patch is applied, and how the row binds
/// into SQL. Every column list and bind order must agree with `COLUMNS`.
pub trait Resource:
    Clone + Send + Sync + Unpin + Serialize + for<'r> FromRow<'r, PgRow> + 'static
{
    type Create: Send + Sync + 'static;
    type Update: Send + Sync + 'static;

    const TABLE: &'static str;
    /// Every column of the table, in the order `push_values` binds them.
    const COLUMNS: &'static [&'static str];
    /// Text column matched by `ListFilter::search`.
    const SEARCH_COLUMN: &'static str;
    const DELETE_MODE: DeleteMode;

    /// Validates `fields` and builds a fresh, active row.
    fn build(id: Uuid, owner_id: &str, fields: Self::Create, now: DateTime<Utc>)
    -> Result<Self, RepoError>;

    /// Validates `patch` and overwrites the fields it carries.
    fn apply(&mut self, patch: Self::Update, now: DateTime<Utc>) -> Result<(), RepoError>;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn search_text(&self) -> &str;

    /// Hard-delete resources have no `is_active` column and are always live.
    fn is_active(&self) -> bool {
        true
    }

    fn deactivate(&mut self, _now: DateTime<Utc>) {}

    /// Row this one links to. It must be a live row of the same owner whenever the
    /// link is set or changed.
    fn parent(&self) -> Option<ParentRef> {
        None
    }

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>);
}

/// ParentRef
///
/// A link from a row to a row of another resource, e.g. a task's `goal_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef {
    /// Field of the child that holds the link.
    pub field: &'static str,
    pub table: &'static str,
    pub mode: DeleteMode,
    pub id: Uuid,
}

impl ParentRef {
    pub fn to<P: Resource>(field: &'static str, id: Uuid) -> Self {
        Self {
            field,
            table: P::TABLE,
            mode: P::DELETE_MODE,
            id,
        }
    }

    fn unknown(self) -> RepoError {
        RepoError::Validation(format!(
            "{} does not match any {} row",
            self.field, self.table
        ))
    }
}

/// The link `after` must have checked: its parent when it differs from `before`.
fn changed_parent(before: Option<ParentRef>, after: Option<ParentRef>) -> Option<ParentRef> {
    let after = after?;
    (before.map(|p| p.id) != Some(after.id)).then_some(after)
}

/// ListFilter
///
/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    /// Include soft-deleted rows.
    #[serde(default)]
    pub include_inactive: bool,
    /// Case-insensitive substring match on the resource's title/name.
    pub search: Option<String>,
}

impl ListFilter {
    fn admits<R: Resource>(&self, row: &R) -> bool {
        if !self.include_inactive && !row.is_active() {
            return false;
        }
        match self.search.as_deref() {
            Some(needle) => row
                .search_text()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Repository
///
/// The one CRUD contract shared by every resource. Implementations are scoped to a
/// single owner fixed at construction.
#[async_trait]
pub trait Repository<R: Resource>: Send + Sync {
    async fn list(&self, filter: ListFilter) -> Result<Vec<R>, RepoError>;
    async fn create(&self, fields: R::Create) -> Result<R, RepoError>;
    /// Fails with `NotFound` for unknown, foreign or soft-deleted rows.
    async fn update(&self, id: Uuid, patch: R::Update) -> Result<R, RepoError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

/// RepositoryState
///
/// Shared handle to a resource repository.
pub type RepositoryState<R> = Arc<dyn Repository<R>>;

/// LiveRows
///
/// Existence check used to validate links into a repository.
#[async_trait]
pub trait LiveRows: Send + Sync {
    /// True when a live row with `id` belongs to the repository's owner.
    async fn is_live(&self, id: Uuid) -> Result<bool, RepoError>;
}

fn live_clause(mode: DeleteMode) -> &'static str {
    match mode {
        DeleteMode::Soft => " AND is_active = true",
        DeleteMode::Hard => "",
    }
}

// --- Postgres ---

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. All values are bound parameters; only the
/// compile-time table and column names are spliced into SQL.
pub struct PostgresRepository<R> {
    pool: PgPool,
    owner_id: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> PostgresRepository<R> {
    pub fn new(pool: PgPool, owner_id: impl Into<String>) -> Self {
        Self {
            pool,
            owner_id: owner_id.into(),
            _resource: PhantomData,
        }
    }

    async fn check_parent(
        &self,
        parent: ParentRef,
        conn: &mut PgConnection,
    ) -> Result<(), RepoError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND owner_id = $2{} FOR SHARE)",
            parent.table,
            live_clause(parent.mode)
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(parent.id)
            .bind(&self.owner_id)
            .fetch_one(conn)
            .await?;
        if !exists {
            return Err(parent.unknown());
        }
        Ok(())
    }
}

/// Maps a foreign-key violation to `Validation`. `check_parent` normally catches a bad
/// link first.
fn write_error(err: sqlx::Error) -> RepoError {
    match err.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => {
            RepoError::Validation(format!("referenced row does not exist: {}", db.message()))
        }
        _ => RepoError::Database(err),
    }
}

/// Escapes LIKE metacharacters so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl<R: Resource> Repository<R> for PostgresRepository<R> {
    async fn list(&self, filter: ListFilter) -> Result<Vec<R>, RepoError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE owner_id = ", R::TABLE));
        builder.push_bind(self.owner_id.clone());

        if !filter.include_inactive {
            builder.push(live_clause(R::DELETE_MODE));
        }

        if let Some(term) = filter.search.as_deref() {
            builder.push(format!(" AND {} ILIKE ", R::SEARCH_COLUMN));
            builder.push_bind(like_pattern(term));
        }

        builder.push(" ORDER BY created_at DESC");

        let rows = builder.build_query_as::<R>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn create(&self, fields: R::Create) -> Result<R, RepoError> {
        let row = R::build(Uuid::new_v4(), &self.owner_id, fields, Utc::now())?;

        let mut tx = self.pool.begin().await?;
        if let Some(parent) = row.parent() {
            self.check_parent(parent, &mut tx).await?;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            R::TABLE,
            R::COLUMNS.join(", ")
        ));
        {
            let mut values = builder.separated(", ");
            row.push_values(&mut values);
        }
        builder.push(") RETURNING *");

        let created = builder
            .build_query_as::<R>()
            .fetch_one(&mut *tx)
            .await
            .map_err(write_error)?;
        tx.commit().await?;
        tracing::debug!(table = R::TABLE, id = %created.id(), "created row");
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: R::Update) -> Result<R, RepoError> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT * FROM {} WHERE id = $1 AND owner_id = $2{} FOR UPDATE",
            R::TABLE,
            live_clause(R::DELETE_MODE)
        );
        let mut row = sqlx::query_as::<_, R>(&select)
            .bind(id)
            .bind(&self.owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepoError::NotFound)?;

        let before = row.parent();
        row.apply(patch, Utc::now())?;
        if let Some(parent) = changed_parent(before, row.parent()) {
            self.check_parent(parent, &mut tx).await?;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "UPDATE {} SET ({}) = (",
            R::TABLE,
            R::COLUMNS.join(", ")
        ));
        {
            let mut values = builder.separated(", ");
            row.push_values(&mut values);
        }
        builder.push(") WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND owner_id = ");
        builder.push_bind(self.owner_id.clone());
        builder.push(" RETURNING *");

        let updated = builder
            .build_query_as::<R>()
            .fetch_one(&mut *tx)
            .await
            .map_err(write_error)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = match R::DELETE_MODE {
            DeleteMode::Soft => {
                let sql = format!(
                    "UPDATE {} SET is_active = false, updated_at = $3 \
                     WHERE id = $1 AND owner_id = $2 AND is_active = true",
                    R::TABLE
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(&self.owner_id)
                    .bind(Utc::now())
                    .execute(&self.pool)
                    .await?
            }
            DeleteMode::Hard => {
                let sql = format!("DELETE FROM {} WHERE id = $1 AND owner_id = $2", R::TABLE);
                sqlx::query(&sql)
                    .bind(id)
                    .bind(&self.owner_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        tracing::debug!(table = R::TABLE, %id, mode = ?R::DELETE_MODE, "deleted row");
        Ok(())
    }
}

// --- In-memory ---

/// MemoryRepository
///
/// `Repository` kept in process memory. Used for local runs without a database and
/// as the test double for handler tests. Rows of other owners can be seeded to
/// exercise owner scoping.
pub struct MemoryRepository<R> {
    rows: RwLock<Vec<R>>,
    owner_id: String,
    parents: Option<Arc<dyn LiveRows>>,
}

impl<R: Resource> MemoryRepository<R> {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            owner_id: owner_id.into(),
            parents: None,
        }
    }

    /// Repository that `Resource::parent` links are checked against. Without one, any
    /// set link is rejected.
    pub fn with_parents(mut self, parents: Arc<dyn LiveRows>) -> Self {
        self.parents = Some(parents);
        self
    }

    /// Inserts a row verbatim, whatever its owner.
    pub async fn seed(&self, row: R) {
        self.rows.write().await.push(row);
    }

    fn is_mine(&self, row: &R, id: Uuid) -> bool {
        row.id() == id && row.owner_id() == self.owner_id && row.is_active()
    }

    async fn check_parent(&self, parent: ParentRef) -> Result<(), RepoError> {
        let live = match &self.parents {
            Some(parents) => parents.is_live(parent.id).await?,
            None => false,
        };
        if !live {
            return Err(parent.unknown());
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Resource> LiveRows for MemoryRepository<R> {
    async fn is_live(&self, id: Uuid) -> Result<bool, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().any(|row| self.is_mine(row, id)))
    }
}

#[async_trait]
impl<R: Resource> Repository<R> for MemoryRepository<R> {
    async fn list(&self, filter: ListFilter) -> Result<Vec<R>, RepoError> {
        let rows = self.rows.read().await;
        let mut matched: Vec<R> = rows
            .iter()
            .filter(|row| row.owner_id() == self.owner_id && filter.admits(*row))
            .cloned()
            .collect();
        matched.sort_by_key(|row| std::cmp::Reverse(row.created_at()));
        Ok(matched)
    }

    async fn create(&self, fields: R::Create) -> Result<R, RepoError> {
        let row = R::build(Uuid::new_v4(), &self.owner_id, fields, Utc::now())?;
        if let Some(parent) = row.parent() {
            self.check_parent(parent).await?;
        }
        self.rows.write().await.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: R::Update) -> Result<R, RepoError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| self.is_mine(row, id))
            .ok_or(RepoError::NotFound)?;

        // Apply to a copy so a rejected patch leaves the stored row untouched.
        let mut patched = row.clone();
        patched.apply(patch, Utc::now())?;
        if let Some(parent) = changed_parent(row.parent(), patched.parent()) {
            self.check_parent(parent).await?;
        }
        *row = patched.clone();
        Ok(patched)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut rows = self.rows.write().await;
        let position = rows
            .iter()
            .position(|row| self.is_mine(row, id))
            .ok_or(RepoError::NotFound)?;

        match R::DELETE_MODE {
            DeleteMode::Soft => rows[position].deactivate(Utc::now()),
            DeleteMode::Hard => {
                rows.remove(position);
            }
        }
        Ok(())
    }
}
