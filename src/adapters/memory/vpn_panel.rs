//! In-memory VPN panel.
//!
//! Keeps accounts in a map and logs every write so tests can assert how
//! many entitlement grants happened.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::foundation::{ExternalId, Timestamp};
use crate::ports::{CreatePanelUser, PanelError, PanelUser, UpdatePanelUser, VpnPanel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCall {
    Create(CreatePanelUser),
    Update(UpdatePanelUser),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryVpnPanel {
    inner: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<ExternalId, PanelUser>,
    calls: Vec<PanelCall>,
    next_error: Option<PanelError>,
}

impl InMemoryVpnPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        // a poisoned lock only means another test thread panicked
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seeds an existing account.
    pub fn seed_user(
        &self,
        external_id: ExternalId,
        expire_at: Timestamp,
        device_limit: Option<u32>,
    ) {
        let user = PanelUser {
            uuid: format!("uuid-{}", external_id),
            username: username(external_id),
            external_id: Some(external_id),
            expire_at,
            device_limit,
            traffic_limit_bytes: 0,
        };
        self.state().users.insert(external_id, user);
    }

    pub fn user(&self, external_id: ExternalId) -> Option<PanelUser> {
        self.state().users.get(&external_id).cloned()
    }

    pub fn calls(&self) -> Vec<PanelCall> {
        self.state().calls.clone()
    }

    /// Number of create/update calls, i.e. entitlement grants.
    pub fn write_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Fails the next panel call.
    pub fn fail_next(&self, error: PanelError) {
        self.state().next_error = Some(error);
    }
}

fn username(external_id: ExternalId) -> String {
    format!("tg_{}", external_id)
}

#[async_trait]
impl VpnPanel for InMemoryVpnPanel {
    async fn find_user(&self, external_id: ExternalId) -> Result<Option<PanelUser>, PanelError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        Ok(state.users.get(&external_id).cloned())
    }

    async fn create_user(&self, request: CreatePanelUser) -> Result<PanelUser, PanelError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        let user = PanelUser {
            uuid: format!("uuid-{}", request.external_id),
            username: request.username.clone(),
            external_id: Some(request.external_id),
            expire_at: request.expire_at,
            device_limit: request.device_limit,
            traffic_limit_bytes: request.traffic_limit_bytes,
        };
        state.users.insert(request.external_id, user.clone());
        state.calls.push(PanelCall::Create(request));
        Ok(user)
    }

    async fn update_user(&self, request: UpdatePanelUser) -> Result<PanelUser, PanelError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        let user = state
            .users
            .values_mut()
            .find(|u| u.uuid == request.uuid)
            .ok_or_else(|| PanelError::Api {
                status: 404,
                message: format!("user {} not found", request.uuid),
            })?;
        user.expire_at = request.expire_at;
        user.traffic_limit_bytes = request.traffic_limit_bytes;
        if request.device_limit.is_some() {
            user.device_limit = request.device_limit;
        }
        let updated = user.clone();
        state.calls.push(PanelCall::Update(request));
        Ok(updated)
    }
}
