//! Task endpoints.

use crate::request::{current_user_id, execute, fetch};
use crate::session::SessionManager;
use std::sync::Arc;
use taskdesk_core::Result;
use taskdesk_core::task::{NewTask, Task, TaskAttachment, TaskUpdate};
use taskdesk_interaction::{HttpClient, multipart};

/// Typed access to the backend's task endpoints for the signed-in user.
#[derive(Clone)]
pub struct TaskService {
    http: Arc<HttpClient>,
    session: SessionManager,
}

impl TaskService {
    pub fn new(http: Arc<HttpClient>, session: SessionManager) -> Self {
        Self { http, session }
    }

    /// `GET /users/{id}/tasks` for the signed-in user.
    pub async fn list_for_current_user(&self) -> Result<Vec<Task>> {
        let endpoint = format!("/users/{}/tasks", current_user_id(&self.session)?);
        fetch(&self.session, "list tasks", || self.http.get(&endpoint)).await
    }

    /// `POST /tasks`. The organisation defaults to the current user's.
    pub async fn create(&self, task: &NewTask) -> Result<Task> {
        let mut task = task.clone();
        if task.organisation_id.is_none() {
            task.organisation_id = self.session.session().organisation_id();
        }
        fetch(&self.session, "create task", || self.http.post("/tasks", &task)).await
    }

    /// `PUT /tasks/{id}` with the current user's organisation attached.
    pub async fn update(&self, id: i64, update: &TaskUpdate) -> Result<Task> {
        let update = TaskUpdate {
            organisation_id: self.session.session().organisation_id(),
            ..update.clone()
        };
        let endpoint = format!("/tasks/{id}");
        fetch(&self.session, "update task", || self.http.put(&endpoint, &update)).await
    }

    /// `DELETE /tasks/{id}`
    pub async fn delete(&self, id: i64) -> Result<()> {
        let endpoint = format!("/tasks/{id}");
        execute(&self.session, "delete task", || self.http.delete(&endpoint)).await
    }

    /// `POST /tasks/{id}/attachments` as multipart form data.
    pub async fn upload_attachment(
        &self,
        task_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<TaskAttachment> {
        let endpoint = format!("/tasks/{task_id}/attachments");
        // A form is consumed by sending, so every attempt builds its own.
        let form = || {
            let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.to_string());
            multipart::Form::new().part("file", part)
        };
        tracing::debug!(task_id, file_name, size = bytes.len(), "Uploading attachment");
        fetch(&self.session, "upload attachment", || {
            self.http.upload(&endpoint, form())
        })
        .await
    }
}
