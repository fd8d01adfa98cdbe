use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::task::TaskState;

/// OpenAPI document for the JSON API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::get_all_tasks_handler,
        crate::task::api::v1::get_tasks_by_date_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
        crate::task::api::v1::get_stats_handler,
    ),
    tags(
        (name = "Tasks", description = "Task management endpoints")
    )
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(task_state: Arc<TaskState>) -> Router {
    let tasks_router = crate::task::api::v1::create_api_router(task_state);
    Router::new().nest("/api/v1", tasks_router)
}
