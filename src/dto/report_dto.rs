use serde::Deserialize;

use crate::models::Origem;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub desde: Option<String>,
    pub ate: Option<String>,
    pub origem: Option<Origem>,
}
