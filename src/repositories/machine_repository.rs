use super::EntityRepository;
use crate::clients::Sort;
use crate::models::Machine;
use crate::utils::errors::AppError;

pub type MachineRepository = EntityRepository<Machine>;

impl EntityRepository<Machine> {
    /// Varrimento completo, mais recentes primeiro; a série não é única no backend
    pub async fn list_all(&self) -> Result<Vec<Machine>, AppError> {
        self.list(Some(&Sort::newest_first())).await
    }
}
