//! `Resource` descriptions of the dashboard tables.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, query_builder::Separated};
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{
        Camp, CreateCampRequest, CreateGoalRequest, CreateMaterialRequest, CreateProductRequest,
        CreateTaskRequest, Goal, Material, Product, Task, UpdateCampRequest, UpdateGoalRequest,
        UpdateMaterialRequest, UpdateProductRequest, UpdateTaskRequest,
    },
    repository::{DeleteMode, ParentRef, Resource},
};

fn require_text(field: &str, value: &str) -> Result<(), RepoError> {
    if value.trim().is_empty() {
        return Err(RepoError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: i64) -> Result<(), RepoError> {
    if value < 0 {
        return Err(RepoError::Validation(format!("{field} must not be negative")));
    }
    Ok(())
}

/// Overwrites `slot` when the patch carries a value. For nullable columns that value
/// may itself be `None`, which clears the column.
fn patch<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl Resource for Material {
    type Create = CreateMaterialRequest;
    type Update = UpdateMaterialRequest;

    const TABLE: &'static str = "materials";
    const COLUMNS: &'static [&'static str] = &[
        "id", "owner_id", "title", "kind", "url", "notes", "is_active", "created_at",
        "updated_at",
    ];
    const SEARCH_COLUMN: &'static str = "title";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    fn build(
        id: Uuid,
        owner_id: &str,
        fields: CreateMaterialRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, RepoError> {
        require_text("title", &fields.title)?;
        require_text("kind", &fields.kind)?;
        Ok(Self {
            id,
            owner_id: owner_id.to_string(),
            title: fields.title,
            kind: fields.kind,
            url: fields.url,
            notes: fields.notes,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, p: UpdateMaterialRequest, now: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(title) = &p.title {
            require_text("title", title)?;
        }
        if let Some(kind) = &p.kind {
            require_text("kind", kind)?;
        }
        patch(&mut self.title, p.title);
        patch(&mut self.kind, p.kind);
        patch(&mut self.url, p.url);
        patch(&mut self.notes, p.notes);
        self.updated_at = now;
        Ok(())
    }

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn search_text(&self) -> &str {
        &self.title
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.owner_id.clone())
            .push_bind(self.title.clone())
            .push_bind(self.kind.clone())
            .push_bind(self.url.clone())
            .push_bind(self.notes.clone())
            .push_bind(self.is_active)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}

impl Resource for Product {
    type Create = CreateProductRequest;
    type Update = UpdateProductRequest;

    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "id", "owner_id", "name", "description", "price_cents", "is_active", "created_at",
        "updated_at",
    ];
    const SEARCH_COLUMN: &'static str = "name";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    fn build(
        id: Uuid,
        owner_id: &str,
        fields: CreateProductRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, RepoError> {
        require_text("name", &fields.name)?;
        require_non_negative("price_cents", fields.price_cents)?;
        Ok(Self {
            id,
            owner_id: owner_id.to_string(),
            name: fields.name,
            description: fields.description,
            price_cents: fields.price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, p: UpdateProductRequest, now: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(name) = &p.name {
            require_text("name", name)?;
        }
        if let Some(price) = p.price_cents {
            require_non_negative("price_cents", price)?;
        }
        patch(&mut self.name, p.name);
        patch(&mut self.description, p.description);
        patch(&mut self.price_cents, p.price_cents);
        self.updated_at = now;
        Ok(())
    }

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn search_text(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.owner_id.clone())
            .push_bind(self.name.clone())
            .push_bind(self.description.clone())
            .push_bind(self.price_cents)
            .push_bind(self.is_active)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}

// Recorded camps are the one resource removed outright on delete.
impl Resource for Camp {
    type Create = CreateCampRequest;
    type Update = UpdateCampRequest;

    const TABLE: &'static str = "camps";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "name",
        "held_on",
        "location",
        "participants",
        "revenue_cents",
        "notes",
        "created_at",
        "updated_at",
    ];
    const SEARCH_COLUMN: &'static str = "name";
    const DELETE_MODE: DeleteMode = DeleteMode::Hard;

    fn build(
        id: Uuid,
        owner_id: &str,
        fields: CreateCampRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, RepoError> {
        require_text("name", &fields.name)?;
        require_non_negative("participants", fields.participants.into())?;
        require_non_negative("revenue_cents", fields.revenue_cents)?;
        Ok(Self {
            id,
            owner_id: owner_id.to_string(),
            name: fields.name,
            held_on: fields.held_on,
            location: fields.location,
            participants: fields.participants,
            revenue_cents: fields.revenue_cents,
            notes: fields.notes,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, p: UpdateCampRequest, now: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(name) = &p.name {
            require_text("name", name)?;
        }
        if let Some(participants) = p.participants {
            require_non_negative("participants", participants.into())?;
        }
        if let Some(revenue) = p.revenue_cents {
            require_non_negative("revenue_cents", revenue)?;
        }
        patch(&mut self.name, p.name);
        patch(&mut self.held_on, p.held_on);
        patch(&mut self.location, p.location);
        patch(&mut self.participants, p.participants);
        patch(&mut self.revenue_cents, p.revenue_cents);
        patch(&mut self.notes, p.notes);
        self.updated_at = now;
        Ok(())
    }

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn search_text(&self) -> &str {
        &self.name
    }

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.owner_id.clone())
            .push_bind(self.name.clone())
            .push_bind(self.held_on)
            .push_bind(self.location.clone())
            .push_bind(self.participants)
            .push_bind(self.revenue_cents)
            .push_bind(self.notes.clone())
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}

impl Resource for Goal {
    type Create = CreateGoalRequest;
    type Update = UpdateGoalRequest;

    const TABLE: &'static str = "goals";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "description",
        "target_value",
        "current_value",
        "due_on",
        "is_active",
        "created_at",
        "updated_at",
    ];
    const SEARCH_COLUMN: &'static str = "title";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    fn build(
        id: Uuid,
        owner_id: &str,
        fields: CreateGoalRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, RepoError> {
        require_text("title", &fields.title)?;
        Ok(Self {
            id,
            owner_id: owner_id.to_string(),
            title: fields.title,
            description: fields.description,
            target_value: fields.target_value,
            current_value: fields.current_value,
            due_on: fields.due_on,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, p: UpdateGoalRequest, now: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(title) = &p.title {
            require_text("title", title)?;
        }
        patch(&mut self.title, p.title);
        patch(&mut self.description, p.description);
        patch(&mut self.target_value, p.target_value);
        patch(&mut self.current_value, p.current_value);
        patch(&mut self.due_on, p.due_on);
        self.updated_at = now;
        Ok(())
    }

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn search_text(&self) -> &str {
        &self.title
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.owner_id.clone())
            .push_bind(self.title.clone())
            .push_bind(self.description.clone())
            .push_bind(self.target_value)
            .push_bind(self.current_value)
            .push_bind(self.due_on)
            .push_bind(self.is_active)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}

impl Resource for Task {
    type Create = CreateTaskRequest;
    type Update = UpdateTaskRequest;

    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "goal_id",
        "is_done",
        "due_on",
        "is_active",
        "created_at",
        "updated_at",
    ];
    const SEARCH_COLUMN: &'static str = "title";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    fn build(
        id: Uuid,
        owner_id: &str,
        fields: CreateTaskRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, RepoError> {
        require_text("title", &fields.title)?;
        Ok(Self {
            id,
            owner_id: owner_id.to_string(),
            title: fields.title,
            goal_id: fields.goal_id,
            is_done: false,
            due_on: fields.due_on,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, p: UpdateTaskRequest, now: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(title) = &p.title {
            require_text("title", title)?;
        }
        patch(&mut self.title, p.title);
        patch(&mut self.goal_id, p.goal_id);
        patch(&mut self.is_done, p.is_done);
        patch(&mut self.due_on, p.due_on);
        self.updated_at = now;
        Ok(())
    }

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn search_text(&self) -> &str {
        &self.title
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn parent(&self) -> Option<ParentRef> {
        self.goal_id.map(|id| ParentRef::to::<Goal>("goal_id", id))
    }

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.owner_id.clone())
            .push_bind(self.title.clone())
            .push_bind(self.goal_id)
            .push_bind(self.is_done)
            .push_bind(self.due_on)
            .push_bind(self.is_active)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
