//! Shared application state injected into handlers via `axum::Extension`,
//! generalizing the model service's single `Extension<PgPool>` convention
//! to this core's several collaborators.

use std::sync::Arc;

use crate::blueprint::BlueprintContainerFactory;
use crate::events::store::EventStore;
use crate::resolver::Resolver;
use crate::stores::changesets::ChangesetStore;
use crate::stores::instances::InstanceStore;
use crate::stores::validations::ValidationStore;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub validations: Arc<dyn ValidationStore>,
    pub changesets: Arc<dyn ChangesetStore>,
    pub instances: Arc<dyn InstanceStore>,
    pub resolver: Arc<Resolver>,
    pub containers: Arc<dyn BlueprintContainerFactory>,
}
