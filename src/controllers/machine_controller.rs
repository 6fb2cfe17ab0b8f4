//! Controlador de máquinas
//!
//! Toda mudança de coluna passa por `status_service::transition`. Cada
//! operação que muda o estado da máquina escreve o evento no `historico` e
//! emite a notificação correspondente depois da escrita.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::config::EnvironmentConfig;
use crate::dto::machine_dto::{
    CreateMachineOutcome, CreateMachineRequest, MachineBoard, ReconditioningRequest,
    ReservationRequest, TechnicianColumn, UpdateMachineRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::ensure_allowed;
use crate::models::machine::{
    derive_categoria, MovimentoHistorico, Observacao, Reserva, Tarefa, TipoMovimento,
};
use crate::models::{
    Machine, MachineState, Notification, NotificationKind, NotificationTarget, SessionContext,
};
use crate::repositories::MachineRepository;
use crate::services::duplicate_guard::{check_serial, lineage, return_from_rental_patch, SerialCheck};
use crate::services::notification_service::NotificationHub;
use crate::services::permission_service::permissions_for;
use crate::services::search_service::MachineFilters;
use crate::services::status_service::transition;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::normalize_serie;

pub struct MachineController {
    repository: MachineRepository,
    notifications: NotificationHub,
    config: Arc<EnvironmentConfig>,
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Serialização falhou: {}", e)))
}

/// Técnico a quem notificar sobre a máquina, se houver
fn machine_technician(machine: &Machine) -> Option<String> {
    machine
        .estado
        .technician()
        .map(str::to_string)
        .or_else(|| machine.tecnico.clone())
}

impl MachineController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.machines(),
            notifications: state.notifications.clone(),
            config: Arc::clone(&state.config),
        }
    }

    async fn load(&self, id: &str) -> AppResult<Machine> {
        self.repository.get(id).await
    }

    /// Escreve `patch` mais o evento no histórico
    async fn update_with_event(
        &self,
        machine: &Machine,
        mut patch: Value,
        event: MovimentoHistorico,
    ) -> AppResult<Machine> {
        let mut historico = machine.historico.clone();
        historico.push(event);
        patch["historico"] = to_json(&historico)?;
        self.repository.update(&machine.id, patch).await
    }

    pub async fn list(&self, filters: &MachineFilters) -> AppResult<Vec<Machine>> {
        Ok(filters.apply(self.repository.list_all().await?))
    }

    /// Quadro: a-fazer, uma coluna por técnico, concluída geral e o resto
    pub async fn board(&self, filters: &MachineFilters) -> AppResult<MachineBoard> {
        let machines = filters.apply(self.repository.list_all().await?);

        let mut technicians = self.config.technicians.clone();
        let extra: BTreeSet<String> = machines
            .iter()
            .filter_map(|m| m.estado.technician())
            .filter(|t| !technicians.iter().any(|known| known == t))
            .map(str::to_string)
            .collect();
        technicians.extend(extra);

        let mut board = MachineBoard {
            a_fazer: Vec::new(),
            tecnicos: technicians
                .into_iter()
                .map(|tecnico| TechnicianColumn {
                    tecnico,
                    em_preparacao: Vec::new(),
                    concluidas: Vec::new(),
                })
                .collect(),
            concluida_geral: Vec::new(),
            outros: Vec::new(),
        };

        for machine in machines {
            let done = machine.estado.is_done();
            match machine.estado.technician().map(str::to_string) {
                Some(tecnico) => {
                    if let Some(column) = board.tecnicos.iter_mut().find(|c| c.tecnico == tecnico) {
                        if done {
                            column.concluidas.push(machine);
                        } else {
                            column.em_preparacao.push(machine);
                        }
                    }
                }
                None if matches!(machine.estado, MachineState::Todo) => board.a_fazer.push(machine),
                None if matches!(machine.estado, MachineState::DoneGeneral) => {
                    board.concluida_geral.push(machine)
                }
                None => board.outros.push(machine),
            }
        }
        Ok(board)
    }

    pub async fn get(&self, id: &str) -> AppResult<Machine> {
        self.load(id).await
    }

    /// Criar com controlo de série duplicada
    pub async fn create(
        &self,
        session: &SessionContext,
        request: CreateMachineRequest,
    ) -> AppResult<ApiResponse<CreateMachineOutcome>> {
        ensure_allowed(permissions_for(session).capabilities.create_machine, "create machine")?;
        request.validate()?;

        let existing = self.repository.list_all().await?;
        let historico_criacoes = match check_serial(&existing, &request.serie) {
            SerialCheck::Unique => Vec::new(),
            SerialCheck::ReturnFromRental(rented) => {
                let mensagem = format!(
                    "A máquina {} ({}) está Em Aluguer. Confirmar o regresso de aluguer?",
                    rented.serie, rented.origem
                );
                info!("↩️ Série {} corresponde a máquina em aluguer {}", request.serie, rented.id);
                return Ok(ApiResponse::success_with_message(
                    CreateMachineOutcome::ConfirmarRetorno {
                        maquina: *rented,
                        mensagem: mensagem.clone(),
                    },
                    mensagem,
                ));
            }
            SerialCheck::Duplicate(duplicates) if request.permitir_duplicado => lineage(&duplicates),
            SerialCheck::Duplicate(duplicates) => {
                return Err(AppError::Conflict(format!(
                    "Já existe {} máquina(s) com a série '{}'",
                    duplicates.len(),
                    request.serie.trim()
                )))
            }
        };

        let now = Utc::now();
        let estado = request
            .estado
            .as_deref()
            .map(MachineState::parse)
            .unwrap_or_default();
        let modelo = request.modelo.trim().to_string();
        let categoria = request
            .categoria
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| derive_categoria(&modelo).to_string());

        let mut criacao = MovimentoHistorico::new(TipoMovimento::Criacao, &session.display_name, now);
        criacao.para = Some(estado.to_string());
        if !historico_criacoes.is_empty() {
            criacao = criacao.with_details(format!(
                "Série duplicada autorizada ({} registo(s) anterior(es))",
                historico_criacoes.len()
            ));
        }

        let machine = Machine {
            serie: request.serie.trim().to_string(),
            ano: request.ano,
            origem: request.origem,
            categoria: Some(categoria),
            tecnico: estado.technician().map(str::to_string),
            data_atribuicao: estado.technician().map(|_| now),
            data_conclusao: estado.is_done().then_some(now),
            data_inicio_aluguer: if estado.is_in_rental() {
                request.data_inicio_aluguer.or(Some(now))
            } else {
                None
            },
            caracteristicas: request.caracteristicas.unwrap_or_default(),
            tarefas: request.tarefas,
            prioridade: request.prioridade,
            historico: vec![criacao],
            historico_criacoes,
            estado,
            modelo,
            ..Default::default()
        };

        let created = self.repository.create(&machine).await?;
        info!("🏗️ Máquina criada: {} {} ({})", created.modelo, created.serie, created.id);

        self.notifications
            .notify(
                Notification::new(
                    NotificationTarget::All,
                    NotificationKind::NovaMaquina,
                    format!("Nova máquina {} ({}) na frota", created.modelo, created.serie),
                )
                .about_machine(&created),
            )
            .await;

        Ok(ApiResponse::success_with_message(
            CreateMachineOutcome::Criada { maquina: created },
            "Máquina criada".to_string(),
        ))
    }

    /// Confirmar o regresso de aluguer de uma máquina STS/UTS
    pub async fn confirm_return(&self, session: &SessionContext, id: &str) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_rentals, "confirm rental return")?;
        let machine = self.load(id).await?;
        if !machine.is_rental_return_candidate() {
            return Err(AppError::Conflict(format!(
                "A máquina {} não está Em Aluguer na frota STS/UTS",
                machine.serie
            )));
        }

        let patch = return_from_rental_patch(&machine, &session.display_name, Utc::now());
        let updated = self.repository.update(&machine.id, patch).await?;
        info!("↩️ Regresso de aluguer confirmado: {}", updated.serie);
        Ok(updated)
    }

    pub async fn update(
        &self,
        session: &SessionContext,
        id: &str,
        request: UpdateMachineRequest,
    ) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.edit_machine, "edit machine")?;
        request.validate()?;
        let machine = self.load(id).await?;

        let mut patch = Map::new();
        if let Some(modelo) = &request.modelo {
            patch.insert("modelo".into(), json!(modelo.trim()));
            if request.categoria.is_none() {
                patch.insert("categoria".into(), json!(derive_categoria(modelo)));
            }
        }
        if let Some(serie) = &request.serie {
            let serie = serie.trim();
            if normalize_serie(serie) != normalize_serie(&machine.serie) {
                let others: Vec<Machine> = self
                    .repository
                    .list_all()
                    .await?
                    .into_iter()
                    .filter(|m| m.id != machine.id)
                    .collect();
                if !matches!(check_serial(&others, serie), SerialCheck::Unique) {
                    return Err(AppError::Conflict(format!("Já existe uma máquina com a série '{}'", serie)));
                }
            }
            patch.insert("serie".into(), json!(serie));
        }
        if let Some(ano) = request.ano {
            patch.insert("ano".into(), json!(ano));
        }
        if let Some(origem) = request.origem {
            patch.insert("origem".into(), json!(origem));
        }
        if let Some(categoria) = &request.categoria {
            patch.insert("categoria".into(), json!(categoria));
        }
        if let Some(caracteristicas) = &request.caracteristicas {
            patch.insert("caracteristicas".into(), to_json(caracteristicas)?);
        }
        if patch.is_empty() {
            return Ok(machine);
        }

        let fields: Vec<&str> = patch.keys().map(String::as_str).collect();
        let event = MovimentoHistorico::new(TipoMovimento::Edicao, &session.display_name, Utc::now())
            .with_details(fields.join(", "));
        self.update_with_event(&machine, Value::Object(patch), event).await
    }

    pub async fn delete(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        ensure_allowed(permissions_for(session).capabilities.delete_machine, "delete machine")?;
        let machine = self.load(id).await?;
        self.repository.delete(&machine.id).await?;
        info!("🗑️ Máquina eliminada: {} ({})", machine.serie, machine.id);
        Ok(())
    }

    /// Aplica a transição autorizada e notifica
    async fn apply_transition(
        &self,
        session: &SessionContext,
        machine: Machine,
        target: MachineState,
    ) -> AppResult<Machine> {
        let result = transition(&machine, &target, session, Utc::now());
        if !result.allowed {
            return Err(AppError::Forbidden(
                result
                    .reason
                    .unwrap_or_else(|| "Transição não permitida".to_string()),
            ));
        }
        let Some(next) = result.next else {
            return Ok(machine);
        };

        let updated = self.repository.update(&machine.id, next.to_patch()).await?;
        info!("🔀 Máquina {}: {} -> {}", updated.serie, machine.estado, updated.estado);
        self.notify_transition(session, &updated).await;
        Ok(updated)
    }

    async fn notify_transition(&self, session: &SessionContext, machine: &Machine) {
        let notification = match &machine.estado {
            MachineState::InPreparation(tecnico) if !session.is_technician(tecnico) => Notification::new(
                NotificationTarget::Technician(tecnico.clone()),
                NotificationKind::MaquinaAtribuida,
                format!("Foi-lhe atribuída a máquina {} ({})", machine.modelo, machine.serie),
            )
            .by_technician(tecnico.clone()),
            MachineState::DoneByTechnician(tecnico) => Notification::new(
                NotificationTarget::Admin,
                NotificationKind::MaquinaConcluida,
                format!("{} concluiu a máquina {} ({})", tecnico, machine.modelo, machine.serie),
            )
            .by_technician(tecnico.clone()),
            _ => return,
        };
        self.notifications.notify(notification.about_machine(machine)).await;
    }

    /// Mover para qualquer estado (drag-and-drop)
    pub async fn move_to(&self, session: &SessionContext, id: &str, estado: &str) -> AppResult<Machine> {
        let target = MachineState::parse(estado);
        if target.is_in_rental() {
            return self.start_rental(session, id, None).await;
        }
        let machine = self.load(id).await?;
        self.apply_transition(session, machine, target).await
    }

    pub async fn assign(&self, session: &SessionContext, id: &str, tecnico: &str) -> AppResult<Machine> {
        let tecnico = tecnico.trim().to_lowercase();
        if !self.config.technicians.is_empty() && !self.config.is_known_technician(&tecnico) {
            return Err(AppError::BadRequest(format!("Técnico '{}' desconhecido", tecnico)));
        }
        let machine = self.load(id).await?;
        self.apply_transition(session, machine, MachineState::InPreparation(tecnico))
            .await
    }

    pub async fn complete(&self, session: &SessionContext, id: &str, geral: bool) -> AppResult<Machine> {
        let machine = self.load(id).await?;
        let target = if geral {
            MachineState::DoneGeneral
        } else {
            match &machine.estado {
                MachineState::InPreparation(tecnico) => MachineState::DoneByTechnician(tecnico.clone()),
                MachineState::DoneByTechnician(_) => return Ok(machine),
                _ => {
                    return Err(AppError::BadRequest(
                        "Só máquinas em preparação podem ser concluídas".to_string(),
                    ))
                }
            }
        };
        self.apply_transition(session, machine, target).await
    }

    pub async fn return_to_queue(&self, session: &SessionContext, id: &str) -> AppResult<Machine> {
        let machine = self.load(id).await?;
        self.apply_transition(session, machine, MachineState::Todo).await
    }

    /// Iniciar aluguer (frota STS/UTS)
    pub async fn start_rental(
        &self,
        session: &SessionContext,
        id: &str,
        data_inicio: Option<DateTime<Utc>>,
    ) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_rentals, "start rental")?;
        let machine = self.load(id).await?;
        if !machine.origem.is_rental_fleet() {
            return Err(AppError::BadRequest(
                "Apenas máquinas da frota STS/UTS podem ir para aluguer".to_string(),
            ));
        }
        if machine.estado.is_in_rental() {
            return Ok(machine);
        }

        let now = Utc::now();
        let target = MachineState::rental();
        let event = MovimentoHistorico::new(TipoMovimento::InicioAluguer, &session.display_name, now)
            .between(machine.estado.to_string(), target.to_string());
        let patch = json!({
            "estado": target,
            "tecnico": Value::Null,
            "dataInicioAluguer": data_inicio.unwrap_or(now).to_rfc3339(),
        });
        let updated = self.update_with_event(&machine, patch, event).await?;
        info!("🚚 Máquina {} em aluguer", updated.serie);
        Ok(updated)
    }

    pub async fn add_task(&self, session: &SessionContext, id: &str, texto: &str) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_tasks, "add task")?;
        let machine = self.load(id).await?;
        let mut tarefas = machine.tarefas.clone();
        tarefas.push(Tarefa {
            texto: texto.trim().to_string(),
            concluida: false,
        });
        self.repository
            .update(&machine.id, json!({ "tarefas": to_json(&tarefas)? }))
            .await
    }

    pub async fn toggle_task(&self, session: &SessionContext, id: &str, index: usize) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_tasks, "toggle task")?;
        let machine = self.load(id).await?;
        let mut tarefas = machine.tarefas.clone();
        let tarefa = tarefas
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("Tarefa {} não existe", index)))?;
        tarefa.concluida = !tarefa.concluida;
        self.repository
            .update(&machine.id, json!({ "tarefas": to_json(&tarefas)? }))
            .await
    }

    pub async fn remove_task(&self, session: &SessionContext, id: &str, index: usize) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_tasks, "remove task")?;
        let machine = self.load(id).await?;
        if index >= machine.tarefas.len() {
            return Err(AppError::NotFound(format!("Tarefa {} não existe", index)));
        }
        let mut tarefas = machine.tarefas.clone();
        tarefas.remove(index);
        self.repository
            .update(&machine.id, json!({ "tarefas": to_json(&tarefas)? }))
            .await
    }

    pub async fn add_observation(&self, session: &SessionContext, id: &str, texto: &str) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.add_observations, "add observation")?;
        let machine = self.load(id).await?;
        let mut observacoes = machine.observacoes.clone();
        observacoes.push(Observacao {
            texto: texto.trim().to_string(),
            autor: session.display_name.clone(),
            data: Some(Utc::now()),
        });
        let updated = self
            .repository
            .update(&machine.id, json!({ "observacoes": to_json(&observacoes)? }))
            .await?;

        // Admin escreve ao técnico da máquina; o técnico escreve ao admin
        let target = if session.is_admin() {
            machine_technician(&updated).map(NotificationTarget::Technician)
        } else {
            Some(NotificationTarget::Admin)
        };
        if let Some(target) = target {
            self.notifications
                .notify(
                    Notification::new(
                        target,
                        NotificationKind::NovaObservacao,
                        format!("{} comentou na máquina {}", session.display_name, updated.serie),
                    )
                    .about_machine(&updated),
                )
                .await;
        }
        Ok(updated)
    }

    pub async fn set_priority(&self, session: &SessionContext, id: &str, prioridade: bool) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.set_priority, "set priority")?;
        let machine = self.load(id).await?;
        if machine.prioridade == prioridade {
            return Ok(machine);
        }

        let event = MovimentoHistorico::new(TipoMovimento::Prioridade, &session.display_name, Utc::now())
            .with_details(if prioridade { "ativada" } else { "desativada" });
        let updated = self
            .update_with_event(&machine, json!({ "prioridade": prioridade }), event)
            .await?;

        let target = machine_technician(&updated)
            .map(NotificationTarget::Technician)
            .unwrap_or(NotificationTarget::All);
        let message = if prioridade {
            format!("A máquina {} passou a prioritária", updated.serie)
        } else {
            format!("A máquina {} deixou de ser prioritária", updated.serie)
        };
        self.notifications
            .notify(Notification::new(target, NotificationKind::PrioridadeAlterada, message).about_machine(&updated))
            .await;
        Ok(updated)
    }

    pub async fn set_awaiting_parts(
        &self,
        session: &SessionContext,
        id: &str,
        aguarda_pecas: bool,
    ) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_tasks, "flag awaiting parts")?;
        let machine = self.load(id).await?;
        if machine.aguarda_pecas == aguarda_pecas {
            return Ok(machine);
        }
        let event = MovimentoHistorico::new(TipoMovimento::AguardaPecas, &session.display_name, Utc::now())
            .with_details(if aguarda_pecas { "a aguardar peças" } else { "peças recebidas" });
        self.update_with_event(&machine, json!({ "aguardaPecas": aguarda_pecas }), event)
            .await
    }

    pub async fn set_reservation(
        &self,
        session: &SessionContext,
        id: &str,
        request: ReservationRequest,
    ) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_reservations, "reserve machine")?;
        request.validate()?;
        let machine = self.load(id).await?;

        let reserva = Reserva {
            cliente: request.cliente.trim().to_string(),
            data: request.data,
            comercial: request.comercial.filter(|c| !c.trim().is_empty()),
        };
        let event = MovimentoHistorico::new(TipoMovimento::Reserva, &session.display_name, Utc::now())
            .with_details(format!("Reservada para {}", reserva.cliente));
        let updated = self
            .update_with_event(&machine, json!({ "reserva": to_json(&reserva)? }), event)
            .await?;

        self.notify_reservation(&updated, format!("Máquina {} reservada para {}", updated.serie, reserva.cliente))
            .await;
        Ok(updated)
    }

    pub async fn clear_reservation(&self, session: &SessionContext, id: &str) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_reservations, "clear reservation")?;
        let machine = self.load(id).await?;
        if machine.reserva.is_none() {
            return Ok(machine);
        }
        let event = MovimentoHistorico::new(TipoMovimento::Reserva, &session.display_name, Utc::now())
            .with_details("Reserva removida");
        let updated = self
            .update_with_event(&machine, json!({ "reserva": Value::Null }), event)
            .await?;

        self.notify_reservation(&updated, format!("Reserva da máquina {} removida", updated.serie))
            .await;
        Ok(updated)
    }

    async fn notify_reservation(&self, machine: &Machine, message: String) {
        self.notifications
            .notify(
                Notification::new(NotificationTarget::All, NotificationKind::ReservaAlterada, message)
                    .about_machine(machine),
            )
            .await;
    }

    pub async fn set_reconditioning(
        &self,
        session: &SessionContext,
        id: &str,
        request: ReconditioningRequest,
    ) -> AppResult<Machine> {
        ensure_allowed(permissions_for(session).capabilities.manage_tasks, "set reconditioning")?;
        let machine = self.load(id).await?;
        let recondicao = request.apply(&machine.recondicao);
        if recondicao == machine.recondicao {
            return Ok(machine);
        }
        let event = MovimentoHistorico::new(TipoMovimento::Recondicao, &session.display_name, Utc::now())
            .with_details(format!("bronze: {}, prata: {}", recondicao.bronze, recondicao.prata));
        self.update_with_event(&machine, json!({ "recondicao": to_json(&recondicao)? }), event)
            .await
    }
}
