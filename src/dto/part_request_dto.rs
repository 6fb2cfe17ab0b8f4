use serde::Deserialize;
use validator::Validate;

use crate::models::PartRequestStatus;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartRequestRequest {
    #[validate(length(min = 1))]
    pub maquina_id: String,
    #[validate(length(min = 1, max = 40))]
    pub numero_pedido: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRequestListQuery {
    pub status: Option<PartRequestStatus>,
    pub maquina_id: Option<String>,
}
