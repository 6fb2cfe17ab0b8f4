use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::extraction_service::MachineDraft;

fn first_attempt() -> u8 {
    1
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageExtractionRequest {
    #[validate(length(min = 1))]
    pub imagem_base64: String,
    #[validate(length(min = 1, max = 200))]
    pub nome_ficheiro: String,
    #[serde(default = "first_attempt")]
    #[validate(range(min = 1))]
    pub tentativa: u8,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TextExtractionRequest {
    #[validate(length(min = 3, max = 10000))]
    pub texto: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResponse {
    pub sucesso: bool,
    pub rascunho: Option<MachineDraft>,
    pub detalhes: Option<String>,
    pub tentativas_restantes: u8,
}
