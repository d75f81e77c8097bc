//! Mutation coordinator: one operation per user intent.
//!
//! Every failure is caught here and converted into the status slot; no
//! error escapes. The rest of the system reacts only to the store pushes
//! that follow a successful write, never to an operation's return value.

use std::sync::Arc;

use api_types::{CreateTaskRequest, DocumentId, ImageAttachment, TaskStatus};
use chrono::Utc;
use remote::{BlobStore, DocumentStore, server_timestamp, shapes};
use serde_json::json;
use tracing::info;

use crate::{
    directory::DirectoryCache,
    error::ServiceError,
    live::fields_of,
    session::SessionManager,
    status::StatusSlot,
    team::TeamContext,
};

/// Synchronous yes/no gate in front of destructive operations.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Gate that approves everything. Useful where no interactive surface
/// exists.
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

pub struct MutationCoordinator {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    session: Arc<SessionManager>,
    directory: Arc<DirectoryCache>,
    team: Arc<TeamContext>,
    status: StatusSlot,
    confirm: Arc<dyn Confirm>,
}

impl MutationCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        session: Arc<SessionManager>,
        directory: Arc<DirectoryCache>,
        team: Arc<TeamContext>,
        status: StatusSlot,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            store,
            blobs,
            session,
            directory,
            team,
            status,
            confirm,
        }
    }

    pub fn status(&self) -> &StatusSlot {
        &self.status
    }

    pub async fn register(&self, email: &str, password: &str, username: &str) {
        self.status.clear();
        match self.session.register(email, password, username).await {
            Ok(()) => self
                .status
                .success("Registration complete! You can sign in now."),
            Err(err) => self.status.error(err.user_message("Could not register")),
        }
    }

    pub async fn login(&self, email: &str, password: &str) {
        self.status.clear();
        if let Err(err) = self.session.login(email, password).await {
            self.status.error(err.user_message("Could not sign in"));
        }
    }

    pub async fn logout(&self) {
        self.status.clear();
        if let Err(err) = self.session.logout().await {
            self.status.error(err.user_message("Could not sign out"));
        }
    }

    pub async fn create_team(&self, name: &str) {
        self.status.clear();
        match self.try_create_team(name).await {
            Ok(()) => self.status.success("Team created successfully!"),
            Err(err) => self
                .status
                .error(err.user_message("Could not create the team")),
        }
    }

    async fn try_create_team(&self, name: &str) -> Result<(), ServiceError> {
        let user = self.session.current_user().ok_or(ServiceError::NotSignedIn)?;
        self.team.create_team(&user, name).await?;
        Ok(())
    }

    /// `user_id` is the picker selection; `None` means nothing was picked
    /// and fails validation before any network call.
    pub async fn add_member(&self, user_id: Option<&DocumentId>) {
        self.status.clear();
        match self.try_add_member(user_id).await {
            Ok(()) => self.status.success("User added to the team!"),
            Err(err) => self
                .status
                .error(err.user_message("Could not add the user")),
        }
    }

    async fn try_add_member(&self, user_id: Option<&DocumentId>) -> Result<(), ServiceError> {
        let user_id = user_id.ok_or(ServiceError::Validation("Select a user"))?;
        self.team.add_member(&self.directory, user_id).await
    }

    pub async fn create_task(&self, request: CreateTaskRequest, image: Option<ImageAttachment>) {
        self.status.clear();
        match self.try_create_task(request, image).await {
            Ok(()) => self.status.success("Task created successfully!"),
            Err(err) => self
                .status
                .error(err.user_message("Could not create the task")),
        }
    }

    /// The image upload gates the task write: no record is created unless
    /// the upload and URL resolution both succeed. A task write that fails
    /// after a successful upload orphans the blob; that is accepted.
    async fn try_create_task(
        &self,
        request: CreateTaskRequest,
        image: Option<ImageAttachment>,
    ) -> Result<(), ServiceError> {
        if request.title.is_empty() {
            return Err(ServiceError::Validation("Enter the task title"));
        }
        let user = self.session.current_user().ok_or(ServiceError::NotSignedIn)?;
        let team = self.team.active_team().ok_or(ServiceError::NoActiveTeam)?;

        let image_url = match image {
            Some(attachment) => {
                // Timestamped path; collisions are vanishingly unlikely and
                // unguarded.
                let path = format!(
                    "tasks/{}_{}",
                    Utc::now().timestamp_millis(),
                    attachment.file_name
                );
                let handle = self.blobs.upload(&path, &attachment.bytes).await?;
                Some(self.blobs.retrieval_url(&handle).await?)
            }
            None => None,
        };

        let fields = fields_of(json!({
            "title": request.title,
            "description": request.description,
            "deadline": request.deadline,
            "priority": request.priority,
            "assignedTo": user.id,
            "assignedToEmail": user.email,
            "status": TaskStatus::Pending,
            "imageUrl": image_url,
            "createdBy": user.id,
            "createdAt": server_timestamp(),
        }));
        let id = self
            .store
            .create(&shapes::team_tasks_path(&team.id), fields)
            .await?;
        info!(team = %team.id, task = %id, "task created");
        Ok(())
    }

    /// Single-field write. The caller derives the target status from its
    /// own checkbox transition, so any desired value is safe to pass.
    pub async fn update_task_status(&self, task_id: &DocumentId, status: TaskStatus) {
        self.status.clear();
        match self.try_update_task_status(task_id, status).await {
            Ok(()) => self.status.success("Task updated!"),
            Err(err) => self
                .status
                .error(err.user_message("Could not update the task")),
        }
    }

    async fn try_update_task_status(
        &self,
        task_id: &DocumentId,
        status: TaskStatus,
    ) -> Result<(), ServiceError> {
        let team = self.team.active_team().ok_or(ServiceError::NoActiveTeam)?;
        let mut fields = remote::Document::new();
        fields.insert(
            shapes::STATUS_FIELD.to_string(),
            serde_json::to_value(status).map_err(remote::StoreError::from)?,
        );
        self.store
            .update(&shapes::team_tasks_path(&team.id), task_id, fields)
            .await?;
        Ok(())
    }

    /// Blocks on the confirmation gate before issuing the destructive
    /// call; a "no" aborts with no side effects at all.
    pub async fn delete_task(&self, task_id: &DocumentId) {
        if !self
            .confirm
            .confirm("Are you sure you want to delete this task?")
        {
            return;
        }
        self.status.clear();
        match self.try_delete_task(task_id).await {
            Ok(()) => self.status.success("Task deleted!"),
            Err(err) => self
                .status
                .error(err.user_message("Could not delete the task")),
        }
    }

    async fn try_delete_task(&self, task_id: &DocumentId) -> Result<(), ServiceError> {
        let team = self.team.active_team().ok_or(ServiceError::NoActiveTeam)?;
        self.store
            .delete(&shapes::team_tasks_path(&team.id), task_id)
            .await?;
        Ok(())
    }
}
