use super::EntityRepository;
use crate::clients::{EntityQuery, Sort};
use crate::models::{PartRequest, PartRequestStatus};
use crate::utils::errors::AppError;

pub type PartRequestRepository = EntityRepository<PartRequest>;

impl EntityRepository<PartRequest> {
    pub async fn pending_for_machine(&self, maquina_id: &str) -> Result<Vec<PartRequest>, AppError> {
        let query = EntityQuery::new()
            .eq("maquinaId", maquina_id)
            .eq("status", "pendente");
        Ok(self
            .filter(&query, None, None)
            .await?
            .into_iter()
            .filter(|p| p.status == PartRequestStatus::Pendente)
            .collect())
    }

    /// Próximo número sequencial de pedido
    pub async fn next_numero(&self) -> Result<String, AppError> {
        let max = self
            .list(Some(&Sort::newest_first()))
            .await?
            .iter()
            .filter_map(|p| p.numero_pedido.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok((max + 1).to_string())
    }
}
