//! Clients - clientes para el backend externo
//!
//! Este módulo contiene el contrato del cliente de entidades con sus
//! implementaciones (REST y memoria) y el cliente de integraciones de IA.

pub mod ai_client;
pub mod entity_client;
pub mod memory_entity_client;
pub mod rest_entity_client;

pub use ai_client::{AiError, AiIntegration, AiIntegrationClient, ExtractionResult};
pub use entity_client::{
    ChangeKind, Collection, EntityChange, EntityClient, EntityError, EntityQuery, EntityResult,
    Sort,
};
pub use memory_entity_client::InMemoryEntityClient;
pub use rest_entity_client::RestEntityClient;
