//! Relatório de utilização
//!
//! Agregação pura sobre as listas completas de máquinas, ordens de serviço e
//! pedidos, dentro de um período.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::machine::{Machine, MachineState, Origem};
use crate::models::report::{
    FleetSummary, PartRequestSummary, RentalStats, ReportPeriod, ServiceOrderSummary, StateBuckets,
    TechnicianStats, UtilizationReport,
};
use crate::models::{PartRequest, ServiceOrder};

pub const DEFAULT_PERIOD_DAYS: i64 = 30;

pub struct ReportInput<'a> {
    pub machines: &'a [Machine],
    pub orders: &'a [ServiceOrder],
    pub part_requests: &'a [PartRequest],
    /// Técnicos configurados, na ordem do quadro
    pub technicians: &'a [String],
}

fn in_period(date: Option<DateTime<Utc>>, period: &ReportPeriod) -> bool {
    date.map_or(false, |d| d >= period.desde && d <= period.ate)
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn fleet_summary(machines: &[&Machine]) -> FleetSummary {
    let mut summary = FleetSummary {
        total: machines.len(),
        ..Default::default()
    };
    for origem in Origem::ALL {
        summary.por_origem.insert(origem.to_string(), 0);
    }

    let mut buckets = StateBuckets::default();
    for m in machines {
        *summary.por_origem.entry(m.origem.to_string()).or_insert(0) += 1;
        match &m.estado {
            MachineState::Todo => buckets.a_fazer += 1,
            MachineState::InPreparation(_) => buckets.em_preparacao += 1,
            MachineState::DoneByTechnician(_) | MachineState::DoneGeneral => buckets.concluida += 1,
            state if state.is_in_rental() => buckets.em_aluguer += 1,
            state if state.is_available() => buckets.disponivel += 1,
            MachineState::Other(_) => buckets.outros += 1,
        }
        summary.prioritarias += usize::from(m.prioridade);
        summary.aguardam_pecas += usize::from(m.aguarda_pecas);
        summary.reservadas += usize::from(m.reservada());
    }
    summary.por_estado = buckets;
    summary
}

fn technician_stats(tecnico: &str, machines: &[&Machine], period: &ReportPeriod) -> TechnicianStats {
    let assigned = |m: &&&Machine| {
        m.estado.technician() == Some(tecnico) || m.tecnico.as_deref() == Some(tecnico)
    };

    let completed: Vec<&&Machine> = machines
        .iter()
        .filter(assigned)
        .filter(|m| m.estado.is_done() && in_period(m.data_conclusao, period))
        .collect();
    let hours: Vec<f64> = completed
        .iter()
        .filter_map(|m| match (m.data_atribuicao, m.data_conclusao) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_minutes() as f64 / 60.0),
            _ => None,
        })
        .collect();

    TechnicianStats {
        tecnico: tecnico.to_string(),
        atribuidas: machines.iter().filter(assigned).count(),
        em_preparacao: machines
            .iter()
            .filter(|m| matches!(&m.estado, MachineState::InPreparation(t) if t == tecnico))
            .count(),
        concluidas_no_periodo: completed.len(),
        media_horas_preparacao: average(&hours),
    }
}

fn rental_stats(origem: Origem, machines: &[&Machine], now: DateTime<Utc>) -> RentalStats {
    let fleet: Vec<&&Machine> = machines.iter().filter(|m| m.origem == origem).collect();
    let rented: Vec<&&Machine> = fleet.iter().copied().filter(|m| m.estado.is_in_rental()).collect();
    let days: Vec<f64> = rented
        .iter()
        .filter_map(|m| m.data_inicio_aluguer)
        .map(|start| (now - start).num_hours() as f64 / 24.0)
        .collect();

    RentalStats {
        origem: origem.to_string(),
        total: fleet.len(),
        em_aluguer: rented.len(),
        media_dias_aluguer: average(&days),
        taxa_utilizacao: if fleet.is_empty() {
            0.0
        } else {
            rented.len() as f64 / fleet.len() as f64
        },
    }
}

fn order_summary(orders: &[ServiceOrder]) -> ServiceOrderSummary {
    let mut por_status = BTreeMap::new();
    let mut por_prioridade = BTreeMap::new();
    for order in orders {
        *por_status.entry(order.status.as_str().to_string()).or_insert(0) += 1;
        *por_prioridade.entry(order.prioridade.as_str().to_string()).or_insert(0) += 1;
    }
    ServiceOrderSummary {
        total: orders.len(),
        por_status,
        por_prioridade,
    }
}

fn part_request_summary(requests: &[PartRequest], period: &ReportPeriod) -> PartRequestSummary {
    PartRequestSummary {
        pendentes: requests.iter().filter(|r| r.is_pending()).count(),
        concluidos: requests.iter().filter(|r| !r.is_pending()).count(),
        concluidos_no_periodo: requests
            .iter()
            .filter(|r| !r.is_pending() && in_period(r.data_conclusao, period))
            .count(),
    }
}

/// Período pedido ou os últimos 30 dias
pub fn resolve_period(desde: Option<DateTime<Utc>>, ate: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ReportPeriod {
    let ate = ate.unwrap_or(now);
    let desde = desde.unwrap_or(ate - Duration::days(DEFAULT_PERIOD_DAYS));
    ReportPeriod { desde, ate }
}

pub fn build_report(
    input: &ReportInput<'_>,
    period: ReportPeriod,
    origem: Option<Origem>,
    now: DateTime<Utc>,
) -> UtilizationReport {
    let machines: Vec<&Machine> = input
        .machines
        .iter()
        .filter(|m| origem.map_or(true, |o| m.origem == o))
        .collect();

    // Técnicos configurados primeiro, depois os que só aparecem nos dados
    let mut technicians: Vec<String> = input.technicians.to_vec();
    let known: BTreeSet<String> = technicians.iter().cloned().collect();
    let extra: BTreeSet<String> = machines
        .iter()
        .filter_map(|m| m.estado.technician().map(str::to_string).or_else(|| m.tecnico.clone()))
        .filter(|t| !known.contains(t))
        .collect();
    technicians.extend(extra);

    let tecnicos = technicians
        .iter()
        .map(|t| technician_stats(t, &machines, &period))
        .collect();

    let rental_origins: Vec<Origem> = Origem::ALL
        .into_iter()
        .filter(|o| o.is_rental_fleet() && origem.map_or(true, |f| f == *o))
        .collect();
    let aluguer = rental_origins
        .into_iter()
        .map(|o| rental_stats(o, &machines, now))
        .collect();

    UtilizationReport {
        frota: fleet_summary(&machines),
        tecnicos,
        aluguer,
        ordens_servico: order_summary(input.orders),
        pedidos: part_request_summary(input.part_requests, &period),
        origem: origem.map(|o| o.to_string()),
        periodo: period,
        gerado_em: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderPriority, OrderStatus, PartRequestStatus};

    fn machine(estado: &str, origem: Origem) -> Machine {
        let estado = MachineState::parse(estado);
        Machine {
            tecnico: estado.technician().map(str::to_string),
            estado,
            origem,
            ..Default::default()
        }
    }

    #[test]
    fn test_report_aggregates() {
        let now = Utc::now();
        let mut done = machine("concluida-nuno", Origem::Nova);
        done.data_atribuicao = Some(now - Duration::hours(10));
        done.data_conclusao = Some(now - Duration::hours(4));
        let mut rented = machine("Em Aluguer", Origem::Sts);
        rented.data_inicio_aluguer = Some(now - Duration::days(10));

        let machines = vec![
            done,
            machine("em-preparacao-nuno", Origem::Nova),
            machine("em-preparacao-joao", Origem::Uts),
            machine("a-fazer", Origem::Nova),
            rented,
            machine("Disponível", Origem::Sts),
        ];
        let orders = vec![
            ServiceOrder {
                status: OrderStatus::Concluido,
                prioridade: OrderPriority::Urgente,
                ..Default::default()
            },
            ServiceOrder::default(),
        ];
        let requests = vec![
            PartRequest::default(),
            PartRequest {
                status: PartRequestStatus::Concluido,
                data_conclusao: Some(now - Duration::days(1)),
                ..Default::default()
            },
        ];
        let technicians = vec!["nuno".to_string()];

        let input = ReportInput {
            machines: &machines,
            orders: &orders,
            part_requests: &requests,
            technicians: &technicians,
        };
        let report = build_report(&input, resolve_period(None, None, now), None, now);

        assert_eq!(report.frota.total, 6);
        assert_eq!(report.frota.por_origem["sts"], 2);
        assert_eq!(report.frota.por_estado.em_preparacao, 2);
        assert_eq!(report.frota.por_estado.em_aluguer, 1);
        assert_eq!(report.frota.por_estado.disponivel, 1);

        let nuno = &report.tecnicos[0];
        assert_eq!(nuno.tecnico, "nuno");
        assert_eq!(nuno.atribuidas, 2);
        assert_eq!(nuno.em_preparacao, 1);
        assert_eq!(nuno.concluidas_no_periodo, 1);
        assert_eq!(nuno.media_horas_preparacao, Some(6.0));
        assert_eq!(report.tecnicos[1].tecnico, "joao");

        let sts = report.aluguer.iter().find(|r| r.origem == "sts").unwrap();
        assert_eq!(sts.total, 2);
        assert_eq!(sts.em_aluguer, 1);
        assert!((sts.taxa_utilizacao - 0.5).abs() < f64::EPSILON);
        assert_eq!(sts.media_dias_aluguer, Some(10.0));

        assert_eq!(report.ordens_servico.por_status["concluido"], 1);
        assert_eq!(report.ordens_servico.por_prioridade["normal"], 1);
        assert_eq!(report.pedidos.pendentes, 1);
        assert_eq!(report.pedidos.concluidos_no_periodo, 1);
    }

    #[test]
    fn test_origin_filter() {
        let now = Utc::now();
        let machines = vec![machine("a-fazer", Origem::Nova), machine("Em Aluguer", Origem::Uts)];
        let input = ReportInput {
            machines: &machines,
            orders: &[],
            part_requests: &[],
            technicians: &[],
        };
        let report = build_report(&input, resolve_period(None, None, now), Some(Origem::Uts), now);
        assert_eq!(report.frota.total, 1);
        assert_eq!(report.aluguer.len(), 1);
        assert_eq!(report.aluguer[0].origem, "uts");
    }
}
