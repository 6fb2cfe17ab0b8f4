//! Controlador de ordens de serviço
//!
//! Quadro de 5 colunas ordenado por prioridade e data de entrega. Cada
//! alteração acrescenta uma entrada ao `historico` da O.S.

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::config::EnvironmentConfig;
use crate::dto::service_order_dto::{
    CreateServiceOrderRequest, OrderColumn, ServiceOrderListQuery, UpdateServiceOrderRequest,
};
use crate::middleware::ensure_allowed;
use crate::models::service_order::{OrderHistoryEntry, OrderTask};
use crate::models::{
    Notification, NotificationKind, NotificationTarget, OrderStatus, ServiceOrder, SessionContext,
};
use crate::repositories::{MachineRepository, ServiceOrderRepository};
use crate::services::notification_service::NotificationHub;
use crate::services::permission_service::permissions_for;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct ServiceOrderController {
    repository: ServiceOrderRepository,
    machines: MachineRepository,
    notifications: NotificationHub,
    config: Arc<EnvironmentConfig>,
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Serialização falhou: {}", e)))
}

/// Admin mexe em todas; o técnico só nas que lhe estão atribuídas
fn ensure_can_work_on(session: &SessionContext, order: &ServiceOrder) -> AppResult<()> {
    let own = order
        .tecnico
        .as_deref()
        .map_or(false, |t| session.is_technician(t));
    ensure_allowed(
        permissions_for(session).capabilities.manage_service_orders || own,
        "change service order",
    )
}

impl ServiceOrderController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.service_orders(),
            machines: state.machines(),
            notifications: state.notifications.clone(),
            config: Arc::clone(&state.config),
        }
    }

    async fn update_with_entry(
        &self,
        order: &ServiceOrder,
        mut patch: Value,
        entry: OrderHistoryEntry,
    ) -> AppResult<ServiceOrder> {
        let mut historico = order.historico.clone();
        historico.push(entry);
        patch["historico"] = to_json(&historico)?;
        self.repository.update(&order.id, patch).await
    }

    async fn notify_assignment(&self, order: &ServiceOrder, tecnico: &str) {
        self.notifications
            .notify(
                Notification::new(
                    NotificationTarget::Technician(tecnico.to_string()),
                    NotificationKind::OsAtribuida,
                    format!(
                        "Foi-lhe atribuída a O.S. {} {} ({})",
                        order.modelo, order.serie, order.cliente
                    ),
                )
                .by_technician(tecnico),
            )
            .await;
    }

    fn check_technician(&self, tecnico: &str) -> AppResult<String> {
        let tecnico = tecnico.trim().to_lowercase();
        if !self.config.technicians.is_empty() && !self.config.is_known_technician(&tecnico) {
            return Err(AppError::BadRequest(format!("Técnico '{}' desconhecido", tecnico)));
        }
        Ok(tecnico)
    }

    pub async fn list(&self, query: &ServiceOrderListQuery) -> AppResult<Vec<ServiceOrder>> {
        let mut orders: Vec<ServiceOrder> = self
            .repository
            .list(None)
            .await?
            .into_iter()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| {
                query
                    .tecnico
                    .as_deref()
                    .map_or(true, |t| o.tecnico.as_deref() == Some(t))
            })
            .collect();
        orders.sort_by(|a, b| a.board_cmp(b));
        Ok(orders)
    }

    pub async fn board(&self) -> AppResult<Vec<OrderColumn>> {
        let orders = self.list(&ServiceOrderListQuery::default()).await?;
        Ok(OrderStatus::ALL
            .into_iter()
            .map(|status| OrderColumn {
                status,
                ordens: orders.iter().filter(|o| o.status == status).cloned().collect(),
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> AppResult<ServiceOrder> {
        self.repository.get(id).await
    }

    pub async fn create(
        &self,
        session: &SessionContext,
        request: CreateServiceOrderRequest,
    ) -> AppResult<ServiceOrder> {
        ensure_allowed(
            permissions_for(session).capabilities.manage_service_orders,
            "create service order",
        )?;
        request.validate()?;

        if let Some(machine_id) = request.acp_machine_id.as_deref().filter(|id| !id.is_empty()) {
            self.machines.get(machine_id).await?;
        }
        let tecnico = request
            .tecnico
            .as_deref()
            .map(|t| self.check_technician(t))
            .transpose()?;

        let order = ServiceOrder {
            modelo: request.modelo.trim().to_string(),
            serie: request.serie.trim().to_string(),
            ano: request.ano,
            cliente: request.cliente.trim().to_string(),
            data_entrega: request.data_entrega,
            prioridade: request.prioridade,
            tipo_trabalho: request.tipo_trabalho,
            observacoes: request.observacoes,
            acessorios: request.acessorios,
            tasks: request.tasks,
            status: OrderStatus::AFazer,
            acp_machine_id: request.acp_machine_id.filter(|id| !id.is_empty()),
            historico: vec![OrderHistoryEntry::new("criada", &session.display_name, Utc::now())],
            tecnico,
            ..Default::default()
        };

        let created = self.repository.create(&order).await?;
        info!("📋 O.S. criada: {} {} para {}", created.modelo, created.serie, created.cliente);
        if let Some(tecnico) = &created.tecnico {
            self.notify_assignment(&created, tecnico).await;
        }
        Ok(created)
    }

    pub async fn update(
        &self,
        session: &SessionContext,
        id: &str,
        request: UpdateServiceOrderRequest,
    ) -> AppResult<ServiceOrder> {
        ensure_allowed(
            permissions_for(session).capabilities.manage_service_orders,
            "edit service order",
        )?;
        request.validate()?;
        let order = self.repository.get(id).await?;

        let mut patch = Map::new();
        if let Some(modelo) = &request.modelo {
            patch.insert("modelo".into(), json!(modelo.trim()));
        }
        if let Some(serie) = &request.serie {
            patch.insert("serie".into(), json!(serie.trim()));
        }
        if let Some(ano) = request.ano {
            patch.insert("ano".into(), json!(ano));
        }
        if let Some(cliente) = &request.cliente {
            patch.insert("cliente".into(), json!(cliente.trim()));
        }
        if let Some(data_entrega) = request.data_entrega {
            patch.insert("dataEntrega".into(), json!(data_entrega.to_rfc3339()));
        }
        if let Some(prioridade) = request.prioridade {
            patch.insert("prioridade".into(), json!(prioridade));
        }
        if let Some(tipo_trabalho) = &request.tipo_trabalho {
            patch.insert("tipoTrabalho".into(), json!(tipo_trabalho));
        }
        if let Some(observacoes) = &request.observacoes {
            patch.insert("observacoes".into(), json!(observacoes));
        }
        if let Some(acessorios) = &request.acessorios {
            patch.insert("acessorios".into(), to_json(acessorios)?);
        }
        if patch.is_empty() {
            return Ok(order);
        }

        let fields: Vec<&str> = patch.keys().map(String::as_str).collect();
        let entry = OrderHistoryEntry::new("editada", &session.display_name, Utc::now())
            .with_details(fields.join(", "));
        self.update_with_entry(&order, Value::Object(patch), entry).await
    }

    pub async fn delete(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        ensure_allowed(
            permissions_for(session).capabilities.delete_service_order,
            "delete service order",
        )?;
        let order = self.repository.get(id).await?;
        self.repository.delete(&order.id).await?;
        info!("🗑️ O.S. eliminada: {} ({})", order.serie, order.id);
        Ok(())
    }

    /// Mudar de coluna
    pub async fn move_to(
        &self,
        session: &SessionContext,
        id: &str,
        status: OrderStatus,
    ) -> AppResult<ServiceOrder> {
        let order = self.repository.get(id).await?;
        ensure_can_work_on(session, &order)?;
        if order.status == status {
            return Ok(order);
        }

        let entry = OrderHistoryEntry::new("estado", &session.display_name, Utc::now())
            .with_details(format!("{} -> {}", order.status.as_str(), status.as_str()));
        let updated = self
            .update_with_entry(&order, json!({ "status": status }), entry)
            .await?;
        info!("🔀 O.S. {}: {} -> {}", updated.id, order.status.as_str(), status.as_str());
        Ok(updated)
    }

    pub async fn assign(&self, session: &SessionContext, id: &str, tecnico: &str) -> AppResult<ServiceOrder> {
        ensure_allowed(
            permissions_for(session).capabilities.manage_service_orders,
            "assign service order",
        )?;
        let tecnico = self.check_technician(tecnico)?;
        let order = self.repository.get(id).await?;
        if order.tecnico.as_deref() == Some(tecnico.as_str()) {
            return Ok(order);
        }

        let entry = OrderHistoryEntry::new("atribuida", &session.display_name, Utc::now())
            .with_details(tecnico.clone());
        let updated = self
            .update_with_entry(&order, json!({ "tecnico": tecnico }), entry)
            .await?;
        self.notify_assignment(&updated, &tecnico).await;
        Ok(updated)
    }

    pub async fn add_task(&self, session: &SessionContext, id: &str, text: &str) -> AppResult<ServiceOrder> {
        let order = self.repository.get(id).await?;
        ensure_can_work_on(session, &order)?;

        let mut tasks = order.tasks.clone();
        tasks.push(OrderTask {
            text: text.trim().to_string(),
            completed: false,
        });
        let entry = OrderHistoryEntry::new("tarefa adicionada", &session.display_name, Utc::now())
            .with_details(text.trim());
        self.update_with_entry(&order, json!({ "tasks": to_json(&tasks)? }), entry)
            .await
    }

    pub async fn toggle_task(&self, session: &SessionContext, id: &str, index: usize) -> AppResult<ServiceOrder> {
        let order = self.repository.get(id).await?;
        ensure_can_work_on(session, &order)?;

        let mut tasks = order.tasks.clone();
        let task = tasks
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("Tarefa {} não existe", index)))?;
        task.completed = !task.completed;
        let entry = OrderHistoryEntry::new(
            if task.completed { "tarefa concluída" } else { "tarefa reaberta" },
            &session.display_name,
            Utc::now(),
        )
        .with_details(task.text.clone());
        self.update_with_entry(&order, json!({ "tasks": to_json(&tasks)? }), entry)
            .await
    }
}
