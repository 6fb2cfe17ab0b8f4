//! Transiciones de estado de las máquinas
//!
//! Única función autorizada para mover una máquina entre columnas. La usan
//! mover, atribuir, concluir y devolver à fila.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::models::machine::{Machine, MachineState, MovimentoHistorico, TipoMovimento};
use crate::models::SessionContext;
use crate::services::permission_service::permissions_for;
use crate::utils::dates;

/// Campos que cambian con la transición
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextFields {
    pub estado: MachineState,
    pub tecnico: Option<String>,
    #[serde(with = "dates::option_flexible")]
    pub data_atribuicao: Option<DateTime<Utc>>,
    #[serde(with = "dates::option_flexible")]
    pub data_conclusao: Option<DateTime<Utc>>,
    pub historico: Vec<MovimentoHistorico>,
}

impl NextFields {
    /// Patch parcial para `update`
    pub fn to_patch(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub allowed: bool,
    pub reason: Option<String>,
    /// `None` cuando no hay nada que escribir (denegada o mismo estado)
    pub next: Option<NextFields>,
}

impl Transition {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            next: None,
        }
    }

    fn no_op() -> Self {
        Self {
            allowed: true,
            reason: None,
            next: None,
        }
    }
}

/// ¿Puede `session` mover una máquina de `current` a `target`?
fn check(current: &MachineState, target: &MachineState, session: &SessionContext) -> Result<(), String> {
    if session.is_admin() {
        return Ok(());
    }
    let own = match session.technician.as_deref() {
        Some(t) => t,
        None => return Err("Sessão de técnico sem identificação".to_string()),
    };

    match target {
        MachineState::DoneGeneral => Err("Apenas o administrador pode concluir em geral".to_string()),
        MachineState::Other(estado) => Err(format!("Apenas o administrador pode mover para '{}'", estado)),
        MachineState::Todo => match current {
            MachineState::InPreparation(t) if t == own => Ok(()),
            _ => Err("Só pode devolver à fila as suas próprias máquinas em preparação".to_string()),
        },
        _ if !permissions_for(session).can_move_machine_to(target.technician(), target) => {
            Err("Não pode mover máquinas para a coluna de outro técnico".to_string())
        }
        MachineState::InPreparation(_) => match current {
            MachineState::Todo => Ok(()),
            MachineState::DoneByTechnician(t) if t == own => Ok(()),
            _ => Err("Não pode mover máquinas de outro técnico".to_string()),
        },
        MachineState::DoneByTechnician(_) => match current {
            MachineState::InPreparation(t) if t == own => Ok(()),
            _ => Err("Só pode concluir máquinas que tem em preparação".to_string()),
        },
    }
}

/// Calcula la transición de `machine` hacia `target` para el actor `session`
pub fn transition(
    machine: &Machine,
    target: &MachineState,
    session: &SessionContext,
    now: DateTime<Utc>,
) -> Transition {
    let current = &machine.estado;
    if current == target {
        return Transition::no_op();
    }
    if let Err(reason) = check(current, target, session) {
        return Transition::denied(reason);
    }

    let tecnico = target.technician().map(str::to_string);
    let data_atribuicao = match (&tecnico, machine.data_atribuicao) {
        (_, Some(first)) => Some(first),
        (Some(_), None) => Some(now),
        (None, None) => None,
    };
    let data_conclusao = match target {
        MachineState::DoneByTechnician(_) | MachineState::DoneGeneral => {
            machine.data_conclusao.filter(|_| current.is_done()).or(Some(now))
        }
        MachineState::Todo | MachineState::InPreparation(_) => None,
        MachineState::Other(_) => machine.data_conclusao,
    };

    let mut historico = machine.historico.clone();
    historico.push(
        MovimentoHistorico::new(TipoMovimento::MudancaEstado, &session.display_name, now)
            .between(current.to_string(), target.to_string()),
    );

    Transition {
        allowed: true,
        reason: None,
        next: Some(NextFields {
            estado: target.clone(),
            tecnico,
            data_atribuicao,
            data_conclusao,
            historico,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn admin() -> SessionContext {
        SessionContext {
            user_id: "a".into(),
            email: "admin@oficina.pt".into(),
            role: Role::Admin,
            technician: None,
            display_name: "Admin".into(),
        }
    }

    fn tech(name: &str) -> SessionContext {
        SessionContext {
            user_id: name.into(),
            email: format!("{}@oficina.pt", name),
            role: Role::Tecnico,
            technician: Some(name.into()),
            display_name: name.into(),
        }
    }

    fn machine(estado: &str) -> Machine {
        Machine {
            id: "m1".into(),
            serie: "S1".into(),
            estado: MachineState::parse(estado),
            tecnico: MachineState::parse(estado).technician().map(str::to_string),
            ..Default::default()
        }
    }

    fn apply(machine: &Machine, next: &NextFields) -> Machine {
        Machine {
            estado: next.estado.clone(),
            tecnico: next.tecnico.clone(),
            data_atribuicao: next.data_atribuicao,
            data_conclusao: next.data_conclusao,
            historico: next.historico.clone(),
            ..machine.clone()
        }
    }

    #[test]
    fn test_self_assign_sets_technician_and_assignment_date() {
        let now = Utc::now();
        let t = transition(&machine("a-fazer"), &MachineState::InPreparation("nuno".into()), &tech("nuno"), now);
        assert!(t.allowed);
        let next = t.next.unwrap();
        assert_eq!(next.estado.to_string(), "em-preparacao-nuno");
        assert_eq!(next.tecnico.as_deref(), Some("nuno"));
        assert_eq!(next.data_atribuicao, Some(now));
        assert_eq!(next.historico.len(), 1);
        assert_eq!(next.historico[0].de.as_deref(), Some("a-fazer"));
    }

    #[test]
    fn test_technician_cannot_assign_to_someone_else() {
        let t = transition(&machine("a-fazer"), &MachineState::InPreparation("joao".into()), &tech("nuno"), Utc::now());
        assert!(!t.allowed);
        assert!(t.reason.is_some());
        assert!(t.next.is_none());
    }

    #[test]
    fn test_completion_sets_and_return_clears_conclusion_date() {
        let now = Utc::now();
        let nuno = tech("nuno");
        let prep = machine("em-preparacao-nuno");

        let done = transition(&prep, &MachineState::DoneByTechnician("nuno".into()), &nuno, now);
        let done_next = done.next.unwrap();
        assert!(done_next.data_conclusao.is_some());
        assert_eq!(done_next.tecnico.as_deref(), Some("nuno"));

        let completed = apply(&prep, &done_next);
        let back = transition(&completed, &MachineState::Todo, &admin(), now);
        let back_next = back.next.unwrap();
        assert_eq!(back_next.data_conclusao, None);
        assert_eq!(back_next.tecnico, None);
        assert_eq!(back_next.historico.len(), 2);
    }

    #[test]
    fn test_assignment_date_is_set_once() {
        let first = Utc::now() - chrono::Duration::days(3);
        let mut m = machine("concluida-nuno");
        m.data_atribuicao = Some(first);
        let t = transition(&m, &MachineState::InPreparation("nuno".into()), &tech("nuno"), Utc::now());
        assert_eq!(t.next.unwrap().data_atribuicao, Some(first));
    }

    #[test]
    fn test_return_to_queue_rules() {
        let now = Utc::now();
        assert!(transition(&machine("em-preparacao-nuno"), &MachineState::Todo, &tech("nuno"), now).allowed);
        assert!(!transition(&machine("em-preparacao-joao"), &MachineState::Todo, &tech("nuno"), now).allowed);
        assert!(!transition(&machine("concluida-nuno"), &MachineState::Todo, &tech("nuno"), now).allowed);
        assert!(transition(&machine("concluida-joao"), &MachineState::Todo, &admin(), now).allowed);
    }

    #[test]
    fn test_general_completion_is_admin_only() {
        let now = Utc::now();
        let m = machine("concluida-nuno");
        assert!(!transition(&m, &MachineState::DoneGeneral, &tech("nuno"), now).allowed);
        let t = transition(&m, &MachineState::DoneGeneral, &admin(), now);
        let next = t.next.unwrap();
        assert_eq!(next.tecnico, None);
        assert!(next.data_conclusao.is_some());
    }

    #[test]
    fn test_completion_requires_being_assigned() {
        let now = Utc::now();
        assert!(!transition(&machine("a-fazer"), &MachineState::DoneByTechnician("nuno".into()), &tech("nuno"), now).allowed);
        assert!(!transition(&machine("em-preparacao-joao"), &MachineState::DoneByTechnician("nuno".into()), &tech("nuno"), now).allowed);
    }

    #[test]
    fn test_reopen_own_completed_card() {
        let t = transition(&machine("concluida-nuno"), &MachineState::InPreparation("nuno".into()), &tech("nuno"), Utc::now());
        assert!(t.allowed);
        assert_eq!(t.next.unwrap().data_conclusao, None);
    }

    #[test]
    fn test_same_state_is_noop() {
        let t = transition(&machine("em-preparacao-joao"), &MachineState::InPreparation("joao".into()), &tech("nuno"), Utc::now());
        assert!(t.allowed);
        assert!(t.next.is_none());
    }

    #[test]
    fn test_suffix_and_field_agree_after_transition() {
        let now = Utc::now();
        for target in ["em-preparacao-nuno", "concluida-nuno", "a-fazer", "concluida-geral", "Em Aluguer"] {
            let target = MachineState::parse(target);
            let next = transition(&machine("em-preparacao-joao"), &target, &admin(), now).next.unwrap();
            assert_eq!(next.tecnico.as_deref(), target.technician());
        }
    }

    #[test]
    fn test_patch_clears_conclusion_with_null() {
        let next = transition(&machine("concluida-nuno"), &MachineState::Todo, &admin(), Utc::now()).next.unwrap();
        let patch = next.to_patch();
        assert_eq!(patch["estado"], "a-fazer");
        assert!(patch["dataConclusao"].is_null());
        assert!(patch["tecnico"].is_null());
    }
}
