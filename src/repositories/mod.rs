//! Repositorios
//!
//! Acceso tipado a las colecciones del backend de entidades.

pub mod entity_repository;
pub mod machine_repository;
pub mod part_request_repository;
pub mod user_repository;

pub use entity_repository::{Entity, EntityRepository};
pub use machine_repository::MachineRepository;
pub use part_request_repository::PartRequestRepository;
pub use user_repository::UserRepository;

use crate::models::{Notification, ServiceOrder};

pub type ServiceOrderRepository = EntityRepository<ServiceOrder>;
pub type NotificationRepository = EntityRepository<Notification>;
