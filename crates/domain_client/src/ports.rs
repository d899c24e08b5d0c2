//! Client Domain Ports

use async_trait::async_trait;

use core_kernel::{ClientId, DomainPort, HealthCheckable, PortError};

use crate::client::Client;

/// Client storage
///
/// Phone number and national ID are unique: `save_client` returns
/// `PortError::Conflict` when another client already holds either.
#[async_trait]
pub trait ClientPort: DomainPort + HealthCheckable {
    async fn get_client(&self, id: ClientId) -> Result<Client, PortError>;

    async fn save_client(&self, client: &Client) -> Result<(), PortError>;

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<Client>, PortError>;

    /// Only clients with no loan history may be removed
    async fn delete_client(&self, id: ClientId) -> Result<(), PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory clients
    #[derive(Debug, Default)]
    pub struct MockClientPort {
        clients: Arc<RwLock<HashMap<ClientId, Client>>>,
    }

    impl MockClientPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_clients(clients: Vec<Client>) -> Self {
            let port = Self::new();
            for client in clients {
                port.clients.write().await.insert(client.id, client);
            }
            port
        }
    }

    impl DomainPort for MockClientPort {}

    #[async_trait]
    impl HealthCheckable for MockClientPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-client-port")
        }
    }

    #[async_trait]
    impl ClientPort for MockClientPort {
        async fn get_client(&self, id: ClientId) -> Result<Client, PortError> {
            self.clients
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Client", id))
        }

        async fn save_client(&self, client: &Client) -> Result<(), PortError> {
            let mut clients = self.clients.write().await;
            for other in clients.values().filter(|c| c.id != client.id) {
                if other.phone_number == client.phone_number {
                    return Err(PortError::conflict(format!(
                        "Phone number {} is already registered",
                        client.phone_number
                    )));
                }
                if other.national_id == client.national_id {
                    return Err(PortError::conflict(format!(
                        "National ID {} is already registered",
                        client.national_id
                    )));
                }
            }
            clients.insert(client.id, client.clone());
            Ok(())
        }

        async fn find_by_national_id(&self, national_id: &str) -> Result<Option<Client>, PortError> {
            Ok(self
                .clients
                .read()
                .await
                .values()
                .find(|c| c.national_id == national_id)
                .cloned())
        }

        async fn delete_client(&self, id: ClientId) -> Result<(), PortError> {
            self.clients
                .write()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Client", id))
        }
    }
}
