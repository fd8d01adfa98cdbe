use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;

/// Shared state for task routers.
#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<DatabaseConnection>,
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: Uuid,
    text: String,
    completed: bool,
    date: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns the ID of the task.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the task text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns whether the task is completed.
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Returns the date the task belongs to (`YYYY-MM-DD`).
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            text: model.text,
            completed: model.completed,
            date: model.date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Tasks sharing a `date` value, produced by [`TaskService::get_all_tasks`].
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct TaskGroup {
    date: String,
    tasks: Vec<Task>,
}

impl TaskGroup {
    /// Returns the date shared by every task in the group.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the tasks in the group, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Consumes the group, yielding its date and tasks.
    pub fn into_parts(self) -> (String, Vec<Task>) {
        (self.date, self.tasks)
    }
}

/// Task counts computed by [`TaskService::get_stats`].
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Task text length is outside the accepted 1..=100 range.
    #[error("Task text must be between 1 and 100 characters, got {0}")]
    InvalidText(usize),
    /// Task date was supplied empty.
    #[error("Task date must not be empty")]
    EmptyDate,
    /// The supplied ID string is not a well-formed task identifier.
    #[error("Invalid task ID format: '{0}'")]
    InvalidTaskId(String),
    /// No task with the given ID exists.
    #[error("Task with ID {0} not found")]
    TaskNotFound(Uuid),
    /// A task written moments ago could not be read back.
    #[error("Task with ID {0} missing after write")]
    MissingAfterWrite(Uuid),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Parses a raw ID string into a task identifier.
///
/// Rejects malformed IDs before any store access so that a bad ID is
/// reported as a validation error rather than a not-found.
pub fn parse_task_id(raw: &str) -> Result<Uuid, TaskServiceError> {
    Uuid::parse_str(raw).map_err(|_| TaskServiceError::InvalidTaskId(raw.to_string()))
}

fn validate_text(text: &str) -> Result<(), TaskServiceError> {
    let length = text.chars().count();
    if length == 0 || length > 100 {
        return Err(TaskServiceError::InvalidText(length));
    }
    Ok(())
}

/// Partitions tasks by date, preserving the encounter order of dates.
///
/// Input must already be sorted by date; consecutive models with the
/// same date land in the same group, so group order follows the sort
/// order of the query that produced the models.
fn group_tasks_by_date(models: Vec<task::Model>) -> Vec<TaskGroup> {
    let mut groups: Vec<TaskGroup> = Vec::new();
    for model in models {
        match groups.last_mut() {
            Some(group) if group.date == model.date => group.tasks.push(Task::from(model)),
            _ => groups.push(TaskGroup {
                date: model.date.clone(),
                tasks: vec![Task::from(model)],
            }),
        }
    }
    groups
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

#[derive(Debug, FromQueryResult)]
struct StatsRow {
    total: i64,
    completed: Option<i64>,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService {
        TaskService { db }
    }

    /// Creates a new task.
    ///
    /// `created_at` and `updated_at` are both set to the current UTC
    /// time. The record is read back after the insert; a missing
    /// read-back indicates store inconsistency and fails the request.
    ///
    /// # Arguments
    ///
    /// * `text` - The task text, 1 to 100 characters.
    /// * `completed` - Initial completion flag.
    /// * `date` - The date the task belongs to (`YYYY-MM-DD`).
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        text: String,
        completed: bool,
        date: String,
    ) -> Result<Task, TaskServiceError> {
        validate_text(&text)?;
        if date.is_empty() {
            return Err(TaskServiceError::EmptyDate);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(id),
            text: ActiveValue::Set(text),
            completed: ActiveValue::Set(completed),
            date: ActiveValue::Set(date),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        task::Entity::insert(active_model).exec(self.db).await?;

        let created_model = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::MissingAfterWrite(id))?;
        Ok(Task::from(created_model))
    }

    /// Retrieves all tasks grouped by date.
    ///
    /// Groups are ordered by ascending date; tasks within a group are
    /// ordered by descending creation time (newest first).
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<TaskGroup>, TaskServiceError> {
        let models = task::Entity::find()
            .order_by_asc(task::Column::Date)
            .order_by_desc(task::Column::CreatedAt)
            .all(self.db)
            .await?;
        Ok(group_tasks_by_date(models))
    }

    /// Retrieves the tasks for one date, newest first.
    ///
    /// An unknown date yields an empty list, not an error.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_date(&self, date: &str) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = task::Entity::find()
            .filter(task::Column::Date.eq(date))
            .order_by_desc(task::Column::CreatedAt)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Updates a task by its ID, merging only the supplied fields.
    ///
    /// `updated_at` is refreshed on every successful update, even when
    /// neither `text` nor `completed` is supplied. There is no upsert:
    /// an unknown ID is a not-found error.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to update.
    /// * `text` - Replacement text, if any.
    /// * `completed` - Replacement completion flag, if any.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        id: Uuid,
        text: Option<String>,
        completed: Option<bool>,
    ) -> Result<Task, TaskServiceError> {
        if let Some(ref text) = text {
            validate_text(text)?;
        }

        let task_to_update = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;

        let mut active_model: task::ActiveModel = task_to_update.into();
        if let Some(text) = text {
            active_model.text = ActiveValue::Set(text);
        }
        if let Some(completed) = completed {
            active_model.completed = ActiveValue::Set(completed);
        }
        active_model.updated_at = ActiveValue::Set(Utc::now());
        let updated_model = active_model.update(self.db).await?;

        Ok(Task::from(updated_model))
    }

    /// Deletes a task by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to delete.
    ///
    /// # Returns
    ///
    /// A `Result` containing `()` if the task was deleted, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid) -> Result<(), TaskServiceError> {
        let result = task::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(TaskServiceError::TaskNotFound(id));
        }
        Ok(())
    }

    /// Computes task statistics in a single aggregate query.
    ///
    /// With zero tasks stored, all counts are zero.
    #[tracing::instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<TaskStats, TaskServiceError> {
        let completed_sum = SimpleExpr::from(Func::sum(
            Expr::case(Expr::col(task::Column::Completed).eq(true), 1).finally(0),
        ));
        let row = task::Entity::find()
            .select_only()
            .column_as(task::Column::Id.count(), "total")
            .column_as(completed_sum, "completed")
            .into_model::<StatsRow>()
            .one(self.db)
            .await?;

        let stats = match row {
            Some(row) => {
                let total = row.total as u64;
                // SUM over zero rows is NULL.
                let completed = row.completed.unwrap_or(0) as u64;
                TaskStats {
                    total,
                    completed,
                    pending: total - completed,
                }
            }
            None => TaskStats {
                total: 0,
                completed: 0,
                pending: 0,
            },
        };
        Ok(stats)
    }
}
