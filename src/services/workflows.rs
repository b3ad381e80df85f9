use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::filter::FilterData;
use crate::store::models::Workflow;
use crate::store::repository::to_row;
use crate::store::{CredentialStore, Repository, Table};

use super::ServiceError;

pub const MAX_CONDITIONS: usize = 5;
pub const MAX_ACTIONS_PER_CONDITION: usize = 1;
const DEFAULT_NAME: &str = "Untitled Workflow";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowInput {
    pub name: Option<String>,
    pub trigger: Option<String>,
    pub conditions: Option<Value>,
}

impl WorkflowInput {
    fn into_workflow(self, username: &str) -> Result<Workflow, ServiceError> {
        let conditions = self.conditions.unwrap_or_else(|| json!([]));
        validate_conditions(&conditions)?;
        Ok(Workflow {
            id: None,
            user_name: username.to_string(),
            name: self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            trigger: self.trigger.unwrap_or_default(),
            conditions,
            created_at: None,
        })
    }
}

/// At most five conditions, each carrying at most one action
pub fn validate_conditions(conditions: &Value) -> Result<(), ServiceError> {
    let conditions = conditions
        .as_array()
        .ok_or_else(|| ServiceError::Validation("conditions must be an array".to_string()))?;

    if conditions.len() > MAX_CONDITIONS {
        return Err(ServiceError::Validation("At most 5 conditions allowed".to_string()));
    }

    let too_many_actions = conditions.iter().any(|condition| {
        condition
            .get("actions")
            .and_then(Value::as_array)
            .is_some_and(|actions| actions.len() > MAX_ACTIONS_PER_CONDITION)
    });
    if too_many_actions {
        return Err(ServiceError::Validation("Only 1 action allowed per condition".to_string()));
    }

    Ok(())
}

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn CredentialStore>,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    fn workflows(&self) -> Repository<Workflow> {
        Repository::new(Table::Workflows, self.store.clone())
    }

    fn owned(username: &str, id: i64) -> Value {
        json!({ "id": id, "user_name": username })
    }

    /// The caller's workflows, newest first
    pub async fn list(&self, username: &str) -> Result<Vec<Workflow>, ServiceError> {
        Ok(self
            .workflows()
            .select_any(FilterData::matching(json!({ "user_name": username })).order_by("created_at desc, id desc"))
            .await?)
    }

    pub async fn create(&self, username: &str, input: WorkflowInput) -> Result<Workflow, ServiceError> {
        let workflow = self.workflows().insert(&input.into_workflow(username)?).await?;
        info!(%username, id = ?workflow.id, "workflow created");
        Ok(workflow)
    }

    /// Replaces name, trigger and conditions, applying the same defaults as create
    pub async fn update(&self, username: &str, id: i64, input: WorkflowInput) -> Result<(), ServiceError> {
        let workflow = input.into_workflow(username)?;
        let mut changes = to_row(&workflow)?;
        changes.retain(|column, _| matches!(column.as_str(), "name" | "trigger" | "conditions"));

        let updated = self.workflows().update_where(Self::owned(username, id), changes).await?;
        if updated == 0 {
            return Err(ServiceError::NotFound("Workflow not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, username: &str, id: i64) -> Result<(), ServiceError> {
        let removed = self.workflows().delete_where(Self::owned(username, id)).await?;
        info!(%username, id, removed, "workflow delete");
        Ok(())
    }
}
