//! Server-side directory of registered connections.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::events::EndpointObserver;

/// Tracks registered endpoints by connection id.
///
/// Attach it to accepted endpoints as an observer; entries appear when
/// registration completes and disappear when the endpoint closes.
#[derive(Default)]
pub struct ConnectionRegistry {
    endpoints: RwLock<HashMap<String, Endpoint>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, connection_id: &str) -> Option<Endpoint> {
        self.read().get(connection_id).cloned()
    }

    /// All live connections for `user_id`.
    pub fn by_user(&self, user_id: Uuid) -> Vec<Endpoint> {
        self.read()
            .values()
            .filter(|endpoint| endpoint.user_id() == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn by_device(&self, device_id: &str) -> Vec<Endpoint> {
        self.read()
            .values()
            .filter(|endpoint| endpoint.device_id() == device_id)
            .cloned()
            .collect()
    }

    /// Registered connection ids, sorted.
    pub fn connection_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Endpoint>> {
        self.endpoints.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Endpoint>> {
        self.endpoints.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EndpointObserver for ConnectionRegistry {
    fn on_connection_registered(&self, endpoint: &Endpoint, _old_id: &str, new_id: &str) {
        let mut endpoints = self.write();
        endpoints.retain(|_, known| !known.ptr_eq(endpoint));
        endpoints.insert(new_id.to_string(), endpoint.clone());
    }

    fn on_connection_closed(&self, endpoint: &Endpoint) {
        self.write().retain(|_, known| !known.ptr_eq(endpoint));
    }
}
