//! Controlador de pedidos de peças
//!
//! Criar um pedido marca a máquina como `aguardaPecas`; concluir ou eliminar
//! o último pedido pendente limpa a marca, e só a conclusão avisa o técnico.

use chrono::Utc;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::dto::part_request_dto::{CreatePartRequestRequest, PartRequestListQuery};
use crate::middleware::ensure_allowed;
use crate::models::{
    Machine, Notification, NotificationKind, NotificationTarget, PartRequest, PartRequestStatus,
    SessionContext,
};
use crate::repositories::{MachineRepository, PartRequestRepository};
use crate::services::notification_service::NotificationHub;
use crate::services::permission_service::permissions_for;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct PartRequestController {
    repository: PartRequestRepository,
    machines: MachineRepository,
    notifications: NotificationHub,
}

impl PartRequestController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.part_requests(),
            machines: state.machines(),
            notifications: state.notifications.clone(),
        }
    }

    pub async fn list(&self, query: &PartRequestListQuery) -> AppResult<Vec<PartRequest>> {
        let mut requests: Vec<PartRequest> = self
            .repository
            .list(None)
            .await?
            .into_iter()
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                query
                    .maquina_id
                    .as_deref()
                    .map_or(true, |id| r.maquina_id == id)
            })
            .collect();
        // Pendentes primeiro, mais recentes no topo
        requests.sort_by(|a, b| {
            b.is_pending()
                .cmp(&a.is_pending())
                .then_with(|| b.created_date.cmp(&a.created_date))
        });
        Ok(requests)
    }

    pub async fn create(
        &self,
        session: &SessionContext,
        request: CreatePartRequestRequest,
    ) -> AppResult<PartRequest> {
        request.validate()?;
        let machine = self.machines.get(&request.maquina_id).await?;
        let numero_pedido = match request.numero_pedido.map(|n| n.trim().to_string()) {
            Some(numero) if !numero.is_empty() => numero,
            _ => self.repository.next_numero().await?,
        };

        let part_request = PartRequest {
            numero_pedido,
            maquina_id: machine.id.clone(),
            maquina_serie: machine.serie.clone(),
            maquina_modelo: machine.modelo.clone(),
            tecnico: session
                .technician
                .clone()
                .or_else(|| machine.estado.technician().map(str::to_string))
                .or_else(|| machine.tecnico.clone()),
            status: PartRequestStatus::Pendente,
            ..Default::default()
        };
        let created = self.repository.create(&part_request).await?;

        if !machine.aguarda_pecas {
            self.machines
                .update(&machine.id, json!({ "aguardaPecas": true }))
                .await?;
        }
        info!("🔧 Pedido {} criado para a máquina {}", created.numero_pedido, machine.serie);
        Ok(created)
    }

    pub async fn complete(&self, session: &SessionContext, id: &str) -> AppResult<PartRequest> {
        ensure_allowed(
            permissions_for(session).capabilities.complete_part_requests,
            "complete part request",
        )?;
        let request = self.repository.get(id).await?;
        if !request.is_pending() {
            return Ok(request);
        }

        let completed = self
            .repository
            .update(
                &request.id,
                json!({ "status": PartRequestStatus::Concluido, "dataConclusao": Utc::now().to_rfc3339() }),
            )
            .await?;
        info!("📦 Pedido {} concluído", completed.numero_pedido);

        let machine = match self.release_machine(&completed.maquina_id).await? {
            Some(machine) => machine,
            None => return Ok(completed),
        };

        let target = completed
            .tecnico
            .clone()
            .or_else(|| machine.estado.technician().map(str::to_string))
            .map(NotificationTarget::Technician)
            .unwrap_or(NotificationTarget::All);
        self.notifications
            .notify(
                Notification::new(
                    target,
                    NotificationKind::PecasChegaram,
                    format!(
                        "Chegaram as peças do pedido {} para a máquina {}",
                        completed.numero_pedido, machine.serie
                    ),
                )
                .about_machine(&machine),
            )
            .await;
        Ok(completed)
    }

    pub async fn delete(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        ensure_allowed(
            permissions_for(session).capabilities.complete_part_requests,
            "delete part request",
        )?;
        let request = self.repository.get(id).await?;
        self.repository.delete(&request.id).await?;
        info!("🗑️ Pedido {} eliminado", request.numero_pedido);
        if request.is_pending() {
            self.release_machine(&request.maquina_id).await?;
        }
        Ok(())
    }

    /// Limpa `aguardaPecas` quando a máquina já não tem pedidos pendentes.
    /// Devolve a máquina só nesse caso.
    async fn release_machine(&self, maquina_id: &str) -> AppResult<Option<Machine>> {
        let pending = self.repository.pending_for_machine(maquina_id).await?;
        if !pending.is_empty() {
            return Ok(None);
        }
        let machine = match self.machines.find_by_id(maquina_id).await? {
            Some(machine) => machine,
            None => return Ok(None),
        };
        if machine.aguarda_pecas {
            self.machines
                .update(&machine.id, json!({ "aguardaPecas": false }))
                .await?;
        }
        Ok(Some(machine))
    }
}
