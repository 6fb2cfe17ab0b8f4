use chrono::Utc;

use crate::dto::report_dto::ReportQuery;
use crate::models::report::UtilizationReport;
use crate::services::report_service::{build_report, resolve_period, ReportInput};
use crate::state::AppState;
use crate::utils::dates::parse_flexible;
use crate::utils::errors::{bad_request_error, AppResult};

pub struct ReportController {
    state: AppState,
}

impl ReportController {
    pub fn new(state: &AppState) -> Self {
        Self { state: state.clone() }
    }

    pub async fn utilization(&self, query: &ReportQuery) -> AppResult<UtilizationReport> {
        let parse = |raw: &Option<String>| match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => parse_flexible(value)
                .map(Some)
                .ok_or_else(|| bad_request_error("Data inválida no período do relatório")),
            None => Ok(None),
        };
        let now = Utc::now();
        let period = resolve_period(parse(&query.desde)?, parse(&query.ate)?, now);
        if period.desde > period.ate {
            return Err(bad_request_error("'desde' é posterior a 'ate'"));
        }

        let machines = self.state.machines().list_all().await?;
        let orders = self.state.service_orders().list(None).await?;
        let part_requests = self.state.part_requests().list(None).await?;
        let input = ReportInput {
            machines: &machines,
            orders: &orders,
            part_requests: &part_requests,
            technicians: &self.state.config.technicians,
        };
        Ok(build_report(&input, period, query.origem, now))
    }
}
