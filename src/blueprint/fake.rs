//! A scripted, deterministic `BlueprintContainer` standing in for the
//! out-of-scope blueprint loader library, used by this crate's own
//! integration tests (spec.md §8).

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::{
    BlueprintContainer, BlueprintContainerFactory, ChangeStagingChannels,
    ChangeStagingCompleteMessage, ChildChangesMessage, ChildMessage, ContainerError,
    DeployChannels, DeploymentUpdateMessage, FinishMessage, LinkChangesMessage, LinkMessage,
    ResourceChangesMessage, ResourceMessage, ValidateOutcome,
};

#[derive(Clone)]
pub enum StageOutcome {
    Complete(serde_json::Value),
    Error(String),
}

#[derive(Clone, Default)]
pub struct StageChangesScript {
    pub resource_changes: Vec<serde_json::Value>,
    pub child_changes: Vec<serde_json::Value>,
    pub link_changes: Vec<serde_json::Value>,
    pub outcome: Option<StageOutcome>,
}

#[derive(Clone)]
pub enum DeployOutcome {
    Finish {
        instance_id: String,
        status: String,
        exports: serde_json::Value,
    },
    Error(String),
}

#[derive(Clone, Default)]
pub struct DeployScript {
    /// First message on the deployment-update channel, consumed by the
    /// Orchestrator to adopt a fresh instance id (spec.md §4.2, §9).
    pub preparing_instance_id: Option<String>,
    pub resources: Vec<(String, String)>,
    pub links: Vec<(String, String)>,
    pub children: Vec<(String, String)>,
    pub outcome: Option<DeployOutcome>,
}

#[derive(Clone, Default)]
pub struct FakeBlueprintContainer {
    pub validate_outcome: Option<Result<Vec<crate::models::Diagnostic>, String>>,
    pub stage_changes: StageChangesScript,
    pub deploy: DeployScript,
    pub destroy: DeployScript,
}

#[async_trait]
impl BlueprintContainer for FakeBlueprintContainer {
    async fn validate(
        &self,
        _source: &str,
        _format: &str,
        _params: &serde_json::Value,
    ) -> Result<ValidateOutcome, ContainerError> {
        match self.validate_outcome.clone() {
            Some(Ok(diagnostics)) => Ok(ValidateOutcome { diagnostics }),
            Some(Err(message)) => Err(ContainerError::plain(message)),
            None => Ok(ValidateOutcome {
                diagnostics: Vec::new(),
            }),
        }
    }

    async fn stage_changes(
        &self,
        _instance_id: Option<Uuid>,
        _destroy: bool,
    ) -> ChangeStagingChannels {
        let (resource_tx, resource_changes) = mpsc::channel(32);
        let (child_tx, child_changes) = mpsc::channel(32);
        let (link_tx, link_changes) = mpsc::channel(32);
        let (complete_tx, complete) = oneshot::channel();
        let (error_tx, error) = oneshot::channel();

        let script = self.stage_changes.clone();
        tokio::spawn(async move {
            for value in script.resource_changes {
                let _ = resource_tx
                    .send(ResourceChangesMessage {
                        resource_name: "resource".into(),
                        changes: value,
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            for value in script.child_changes {
                let _ = child_tx
                    .send(ChildChangesMessage {
                        child_name: "child".into(),
                        changes: value,
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            for value in script.link_changes {
                let _ = link_tx
                    .send(LinkChangesMessage {
                        link_name: "link".into(),
                        changes: value,
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            match script.outcome {
                Some(StageOutcome::Complete(changes)) => {
                    let _ = complete_tx.send(ChangeStagingCompleteMessage {
                        changes,
                        timestamp: Utc::now(),
                    });
                }
                Some(StageOutcome::Error(message)) => {
                    let _ = error_tx.send(ContainerError::plain(message));
                }
                None => {
                    let _ = complete_tx.send(ChangeStagingCompleteMessage {
                        changes: serde_json::json!({}),
                        timestamp: Utc::now(),
                    });
                }
            }
        });

        ChangeStagingChannels {
            resource_changes,
            child_changes,
            link_changes,
            complete,
            error,
        }
    }

    async fn deploy(
        &self,
        _instance_id: Option<Uuid>,
        _changes: serde_json::Value,
        _rollback: bool,
    ) -> DeployChannels {
        run_deploy_script(self.deploy.clone())
    }

    async fn destroy(&self, instance_id: Uuid) -> DeployChannels {
        let mut script = self.destroy.clone();
        script.preparing_instance_id = None;
        if script.outcome.is_none() {
            script.outcome = Some(DeployOutcome::Finish {
                instance_id: instance_id.to_string(),
                status: "destroyed".into(),
                exports: serde_json::json!({}),
            });
        }
        run_deploy_script(script)
    }
}

fn run_deploy_script(script: DeployScript) -> DeployChannels {
    let (resource_tx, resource) = mpsc::channel(32);
    let (link_tx, link) = mpsc::channel(32);
    let (child_tx, child) = mpsc::channel(32);
    let (update_tx, deployment_update) = mpsc::channel(32);
    let (finish_tx, finish) = oneshot::channel();
    let (error_tx, error) = oneshot::channel();

    tokio::spawn(async move {
        if let Some(instance_id) = script.preparing_instance_id.clone() {
            let _ = update_tx
                .send(DeploymentUpdateMessage {
                    instance_id,
                    status: "preparing".into(),
                    timestamp: Utc::now(),
                })
                .await;
        }
        for (name, status) in script.resources {
            let _ = resource_tx
                .send(ResourceMessage {
                    resource_name: name,
                    status,
                    data: serde_json::json!({}),
                    timestamp: Utc::now(),
                })
                .await;
        }
        for (name, status) in script.links {
            let _ = link_tx
                .send(LinkMessage {
                    link_name: name,
                    status,
                    timestamp: Utc::now(),
                })
                .await;
        }
        for (name, status) in script.children {
            let _ = child_tx
                .send(ChildMessage {
                    child_name: name,
                    status,
                    timestamp: Utc::now(),
                })
                .await;
        }
        match script.outcome {
            Some(DeployOutcome::Finish {
                instance_id,
                status,
                exports,
            }) => {
                let _ = finish_tx.send(FinishMessage {
                    instance_id,
                    status,
                    exports,
                    timestamp: Utc::now(),
                });
            }
            Some(DeployOutcome::Error(message)) => {
                let _ = error_tx.send(ContainerError::plain(message));
            }
            None => {
                let _ = finish_tx.send(FinishMessage {
                    instance_id: String::new(),
                    status: "deployed".into(),
                    exports: serde_json::json!({}),
                    timestamp: Utc::now(),
                });
            }
        }
    });

    DeployChannels {
        resource,
        link,
        child,
        deployment_update,
        finish,
        error,
    }
}

pub struct FakeBlueprintContainerFactory {
    pub container: FakeBlueprintContainer,
}

#[async_trait]
impl BlueprintContainerFactory for FakeBlueprintContainerFactory {
    async fn load(
        &self,
        _source: &str,
        _format: &str,
    ) -> Result<Box<dyn BlueprintContainer>, ContainerError> {
        Ok(Box::new(self.container.clone()))
    }

    async fn load_placeholder(&self) -> Result<Box<dyn BlueprintContainer>, ContainerError> {
        Ok(Box::new(self.container.clone()))
    }
}
