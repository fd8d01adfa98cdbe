use crate::task::{
    Task, TaskGroup, TaskService, TaskServiceError, TaskState, TaskStats, parse_task_id,
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a Task for API responses.
///
/// The identifier is always serialized as a string, regardless of how
/// the store represents it internally.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier for the task
    id: String,
    /// The task text
    text: String,
    /// Whether the task is completed
    completed: bool,
    /// The date the task belongs to (YYYY-MM-DD)
    date: String,
    /// Creation timestamp (UTC)
    created_at: DateTime<Utc>,
    /// Last update timestamp (UTC)
    updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().to_string(),
            text: task.text().to_string(),
            completed: task.completed(),
            date: task.date().to_string(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// One date's worth of tasks in the grouped listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskGroupJson {
    /// The date (YYYY-MM-DD)
    date: String,
    /// Tasks for that date, newest first
    tasks: Vec<TaskJson>,
}

impl From<TaskGroup> for TaskGroupJson {
    fn from(group: TaskGroup) -> Self {
        let (date, tasks) = group.into_parts();
        Self {
            date,
            tasks: tasks.into_iter().map(TaskJson::from).collect(),
        }
    }
}

/// Request body for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// The task text, 1 to 100 characters
    text: String,
    /// Initial completion flag, defaults to false
    #[serde(default)]
    completed: bool,
    /// The date the task belongs to (YYYY-MM-DD)
    date: String,
}

/// Request body for partially updating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    /// Replacement text, if any
    #[serde(default)]
    text: Option<String>,
    /// Replacement completion flag, if any
    #[serde(default)]
    completed: Option<bool>,
}

/// API response for task statistics.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsJson {
    /// Total number of tasks
    total: u64,
    /// Number of completed tasks
    completed: u64,
    /// Number of pending tasks
    pending: u64,
}

impl From<TaskStats> for StatsJson {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total,
            completed: stats.completed,
            pending: stats.pending,
        }
    }
}

/// JSON body returned with every error status.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// User-facing error message
    error: String,
}

/// Maps service errors onto HTTP responses.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TaskApiError(#[from] TaskServiceError);

impl axum::response::IntoResponse for TaskApiError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, user_facing_error_message) = match &self.0 {
            TaskServiceError::InvalidText(_)
            | TaskServiceError::EmptyDate
            | TaskServiceError::InvalidTaskId(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            TaskServiceError::TaskNotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            TaskServiceError::Database(_) | TaskServiceError::MissingAfterWrite(_) => {
                tracing::error!("Request failed: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your request. Please try again later."
                        .to_string(),
                )
            }
        };
        (
            status_code,
            Json(ErrorResponse {
                error: user_facing_error_message,
            }),
        )
            .into_response()
    }
}

/// Handler for POST /api/v1/tasks - Creates a new task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskJson>), TaskApiError> {
    let service = TaskService::new(&state.db);
    let task = service
        .create_task(request.text, request.completed, request.date)
        .await?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for GET /api/v1/tasks - Returns all tasks grouped by date.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    responses(
        (status = 200, description = "Tasks grouped by date, ascending", body = Vec<TaskGroupJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_all_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskGroupJson>>, TaskApiError> {
    let service = TaskService::new(&state.db);
    let groups = service.get_all_tasks().await?;
    Ok(Json(groups.into_iter().map(TaskGroupJson::from).collect()))
}

/// Handler for GET /api/v1/tasks/{date} - Returns the tasks for one date.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{date}",
    params(
        ("date" = String, Path, description = "Date to list tasks for (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Tasks for the date, newest first", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tasks_by_date_handler(
    State(state): State<Arc<TaskState>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.get_tasks_by_date(&date).await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for PUT /api/v1/tasks/{id} - Partially updates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    params(
        ("id" = String, Path, description = "ID of the task to update")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let id = parse_task_id(&id)?;
    let service = TaskService::new(&state.db);
    let task = service
        .update_task(id, request.text, request.completed)
        .await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /api/v1/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(
        ("id" = String, Path, description = "ID of the task to delete")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, TaskApiError> {
    let id = parse_task_id(&id)?;
    let service = TaskService::new(&state.db);
    service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/v1/stats - Returns task statistics.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses(
        (status = 200, description = "Task statistics", body = StatsJson),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_stats_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<StatsJson>, TaskApiError> {
    let service = TaskService::new(&state.db);
    let stats = service.get_stats().await?;
    Ok(Json(StatsJson::from(stats)))
}

/// Creates and returns the tasks API router.
///
/// GET on `/tasks/{...}` interprets the path segment as a date; PUT
/// and DELETE interpret it as a task ID.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", post(create_task_handler).get(get_all_tasks_handler))
        .route(
            "/tasks/{date_or_id}",
            get(get_tasks_by_date_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/stats", get(get_stats_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn response_parts(error: TaskServiceError) -> (StatusCode, serde_json::Value) {
        let response = axum::response::IntoResponse::into_response(TaskApiError::from(error));
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn can_map_validation_errors_to_bad_request() {
        let (status, body) = response_parts(TaskServiceError::InvalidText(0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Task text must be between 1 and 100 characters, got 0"
        );

        let (status, _) = response_parts(TaskServiceError::InvalidTaskId("abc".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn can_map_not_found_to_404() {
        let (status, _) = response_parts(TaskServiceError::TaskNotFound(Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn can_map_store_inconsistency_to_500_without_details() {
        let id = Uuid::new_v4();
        let (status, body) = response_parts(TaskServiceError::MissingAfterWrite(id)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(!message.contains(&id.to_string()));
    }
}
