use crate::crypto::bcrypt_cost_of;
use crate::errors::AsError;
use crate::models::ClientRegistration;
use std::collections::HashMap;

/// Registered OAuth clients, keyed by `client_id`.
#[derive(Debug, Default, Clone)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientRegistration>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registrations(registrations: Vec<ClientRegistration>) -> Result<Self, AsError> {
        let mut registry = Self::new();
        for client in registrations {
            if client.client_id.is_empty() {
                return Err(AsError::InvalidRequest(
                    "Client registration with empty client_id".to_string(),
                ));
            }
            if registry.clients.contains_key(&client.client_id) {
                return Err(AsError::InvalidRequest(format!(
                    "Duplicate client registration: {}",
                    client.client_id
                )));
            }
            registry.insert(client);
        }
        Ok(registry)
    }

    /// Reject secret hashes that are not bcrypt or use a cost below `min_cost`.
    pub fn check_secret_hash_cost(&self, min_cost: u32) -> Result<(), AsError> {
        for client in self.clients.values() {
            let Some(hash) = client.client_secret_hash.as_deref() else {
                continue;
            };
            match bcrypt_cost_of(hash) {
                Some(cost) if cost >= min_cost => {}
                Some(cost) => {
                    return Err(AsError::InvalidRequest(format!(
                        "Client {} secret hash cost {} is below the minimum {}",
                        client.client_id, cost, min_cost
                    )))
                }
                None => {
                    return Err(AsError::InvalidRequest(format!(
                        "Client {} secret hash is not a bcrypt hash",
                        client.client_id
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, client: ClientRegistration) {
        self.clients.insert(client.client_id.clone(), client);
    }

    pub fn get(&self, client_id: &str) -> Option<&ClientRegistration> {
        self.clients.get(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
