//! In-memory project/task board.
//!
//! Deliberately small: enough state for the gated endpoints to have
//! something to act on. No pagination, sorting or audit trail.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskdesk_core::{DomainError, DomainResult, ProjectId, TaskId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    /// Username of the creator.
    pub manager: String,
    pub members: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub assignee: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub assignee: Option<UserId>,
}

#[derive(Debug, Default)]
struct Tables {
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, Task>,
}

#[derive(Debug, Default)]
pub struct Board {
    inner: RwLock<Tables>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_project(
        &self,
        new: NewProject,
        manager: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Project> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("project name is required"));
        }

        let project = Project {
            id: ProjectId::new(),
            name: name.to_string(),
            description: new.description,
            manager: manager.to_string(),
            members: BTreeSet::new(),
            created_at: now,
        };
        self.write().projects.insert(project.id, project.clone());
        Ok(project)
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.read().projects.values().cloned().collect()
    }

    pub fn get_project(&self, id: ProjectId) -> DomainResult<Project> {
        self.read().projects.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    /// Adding an existing member is a no-op.
    pub fn add_member(&self, project_id: ProjectId, user: UserId) -> DomainResult<Project> {
        let mut tables = self.write();
        let project = tables.projects.get_mut(&project_id).ok_or(DomainError::NotFound)?;
        project.members.insert(user);
        Ok(project.clone())
    }

    pub fn create_task(&self, new: NewTask, now: DateTime<Utc>) -> DomainResult<Task> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("task title is required"));
        }
        if new.deadline.is_some_and(|d| d <= now) {
            return Err(DomainError::validation("deadline must be in the future"));
        }

        let mut tables = self.write();
        if !tables.projects.contains_key(&new.project_id) {
            return Err(DomainError::NotFound);
        }

        let task = Task {
            id: TaskId::new(),
            project_id: new.project_id,
            title: title.to_string(),
            description: new.description,
            status: new.status,
            priority: new.priority,
            deadline: new.deadline,
            assignee: new.assignee,
            created_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    pub fn list_tasks(&self, project: Option<ProjectId>) -> Vec<Task> {
        self.read()
            .tasks
            .values()
            .filter(|t| project.is_none_or(|p| t.project_id == p))
            .cloned()
            .collect()
    }

    pub fn update_task_status(&self, id: TaskId, status: TaskStatus) -> DomainResult<Task> {
        let mut tables = self.write();
        let task = tables.tasks.get_mut(&id).ok_or(DomainError::NotFound)?;
        task.status = status;
        Ok(task.clone())
    }
}
