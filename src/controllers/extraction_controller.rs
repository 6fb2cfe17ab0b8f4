use base64::{engine::general_purpose::STANDARD, Engine as _};
use validator::Validate;

use crate::dto::extraction_dto::{ExtractionResponse, ImageExtractionRequest, TextExtractionRequest};
use crate::services::extraction_service::{extract_from_image, extract_from_text};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppResult};

pub struct ExtractionController {
    state: AppState,
}

/// Aceita base64 puro ou um data URL (`data:image/jpeg;base64,...`)
fn decode_image(raw: &str) -> AppResult<Vec<u8>> {
    let payload = match raw.split_once(";base64,") {
        Some((_, data)) => data,
        None => raw,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|_| bad_request_error("imagemBase64 não é base64 válido"))
}

impl ExtractionController {
    pub fn new(state: &AppState) -> Self {
        Self { state: state.clone() }
    }

    pub async fn from_image(&self, request: ImageExtractionRequest) -> AppResult<ExtractionResponse> {
        request.validate()?;
        let bytes = decode_image(&request.imagem_base64)?;
        // O cliente só pode adiantar o contador, nunca recuá-lo
        let attempt = self
            .state
            .extraction_attempts
            .register(&bytes)
            .await
            .max(request.tentativa);
        let outcome = extract_from_image(
            self.state.ai.as_ref(),
            &request.nome_ficheiro,
            bytes,
            attempt,
        )
        .await?;

        Ok(ExtractionResponse {
            sucesso: outcome.draft.is_some(),
            rascunho: outcome.draft,
            detalhes: outcome.details,
            tentativas_restantes: outcome.remaining_attempts,
        })
    }

    pub async fn from_text(&self, request: TextExtractionRequest) -> AppResult<ExtractionResponse> {
        request.validate()?;
        let draft = extract_from_text(self.state.ai.as_ref(), &request.texto).await?;
        Ok(ExtractionResponse {
            sucesso: true,
            rascunho: Some(draft),
            detalhes: None,
            tentativas_restantes: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        assert_eq!(decode_image("data:image/png;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_image("AQID").unwrap(), vec![1, 2, 3]);
        assert!(decode_image("não é base64").is_err());
    }
}
