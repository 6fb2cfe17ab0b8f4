//! Extracção de dados de máquinas por IA
//!
//! A partir de uma fotografia da chapa de características (upload + extracção
//! estruturada) ou de texto livre (`InvokeLLM`) obtém-se um rascunho de
//! máquina. As tentativas sobre a mesma imagem estão limitadas.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::clients::{AiIntegration, ExtractionResult};
use crate::models::machine::{derive_categoria, Caracteristicas, Origem};
use crate::utils::errors::{AppError, AppResult};

pub const MAX_ATTEMPTS: u8 = 3;

/// Tras este tiempo sin intentos la misma imagen vuelve a empezar
const ATTEMPT_TTL: Duration = Duration::from_secs(3600);

lazy_static! {
    static ref MACHINE_SCHEMA: Value = json!({
        "type": "object",
        "properties": {
            "modelo": {"type": "string", "description": "Modelo do empilhador"},
            "serie": {"type": "string", "description": "Número de série"},
            "ano": {"type": "integer", "description": "Ano de fabrico"},
            "origem": {"type": "string", "enum": ["nova", "sts", "uts"]},
            "caracteristicas": {
                "type": "object",
                "properties": {
                    "mastro": {"type": "string"},
                    "viasMastro": {"type": "string"},
                    "corPneus": {"type": "string"},
                    "joystick": {"type": "boolean"},
                    "acessorio": {"type": "string"}
                }
            }
        },
        "required": ["modelo", "serie"]
    });
}

/// Rascunho de máquina extraído
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineDraft {
    pub modelo: Option<String>,
    pub serie: Option<String>,
    pub ano: Option<i32>,
    pub origem: Option<Origem>,
    pub categoria: Option<String>,
    pub caracteristicas: Option<Caracteristicas>,
}

impl MachineDraft {
    fn from_output(output: Value) -> Result<Self, String> {
        let mut draft: MachineDraft =
            serde_json::from_value(output).map_err(|e| format!("Resposta inesperada: {}", e))?;
        draft.modelo = draft.modelo.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
        draft.serie = draft.serie.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        if draft.modelo.is_none() && draft.serie.is_none() {
            return Err("Nem modelo nem série foram reconhecidos".to_string());
        }
        draft.categoria = draft.modelo.as_deref().map(|m| derive_categoria(m).to_string());
        Ok(draft)
    }
}

/// Resultado de uma tentativa de extracção
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub draft: Option<MachineDraft>,
    pub details: Option<String>,
    pub remaining_attempts: u8,
}

fn outcome_from(result: ExtractionResult, attempt: u8) -> ExtractionOutcome {
    let remaining_attempts = MAX_ATTEMPTS.saturating_sub(attempt);
    let parsed = if result.is_success() {
        result
            .output
            .ok_or_else(|| "Extracção sem resultado".to_string())
            .and_then(MachineDraft::from_output)
    } else {
        Err(result
            .details
            .unwrap_or_else(|| format!("Extracção falhou ({})", result.status)))
    };

    match parsed {
        Ok(draft) => ExtractionOutcome {
            draft: Some(draft),
            details: None,
            remaining_attempts,
        },
        Err(details) => ExtractionOutcome {
            draft: None,
            details: Some(details),
            remaining_attempts,
        },
    }
}

/// Intentos por imagen, contados en el servidor por md5 del contenido
#[derive(Clone)]
pub struct AttemptTracker {
    attempts: Arc<RwLock<HashMap<String, (u8, Instant)>>>,
    ttl: Duration,
}

impl Default for AttemptTracker {
    fn default() -> Self {
        Self::new(ATTEMPT_TTL)
    }
}

impl AttemptTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Regista um intento sobre `bytes` e devolve o seu número (1, 2, ...)
    pub async fn register(&self, bytes: &[u8]) -> u8 {
        let key = format!("{:x}", md5::compute(bytes));
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, (_, last)| now.duration_since(*last) < self.ttl);

        let entry = attempts.entry(key).or_insert((0, now));
        entry.0 = entry.0.saturating_add(1);
        entry.1 = now;
        entry.0
    }
}

/// Fotografia -> rascunho
pub async fn extract_from_image(
    ai: &dyn AiIntegration,
    file_name: &str,
    bytes: Vec<u8>,
    attempt: u8,
) -> AppResult<ExtractionOutcome> {
    if attempt == 0 || attempt > MAX_ATTEMPTS {
        return Err(AppError::BadRequest(format!(
            "Limite de {} tentativas de extracção atingido",
            MAX_ATTEMPTS
        )));
    }

    info!("🤖 Extracção por imagem '{}' (tentativa {}/{})", file_name, attempt, MAX_ATTEMPTS);
    let file_url = ai.upload_file(file_name, bytes).await?;
    let result = ai.extract_data(&file_url, &MACHINE_SCHEMA).await?;
    let outcome = outcome_from(result, attempt);
    if let Some(details) = &outcome.details {
        warn!("⚠️ Extracção falhou na tentativa {}: {}", attempt, details);
    }
    Ok(outcome)
}

/// Texto livre -> rascunho
pub async fn extract_from_text(ai: &dyn AiIntegration, text: &str) -> AppResult<MachineDraft> {
    let prompt = format!(
        "Extrai os dados do empilhador descrito no texto seguinte. \
         Responde apenas com os campos do esquema.\n\n{}",
        text
    );
    let output = ai.invoke_llm(&prompt, &MACHINE_SCHEMA).await?;
    MachineDraft::from_output(output).map_err(AppError::BadRequest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::AiError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedAi {
        extraction: Mutex<Option<ExtractionResult>>,
        llm: Value,
    }

    #[async_trait]
    impl AiIntegration for ScriptedAi {
        async fn upload_file(&self, file_name: &str, _bytes: Vec<u8>) -> Result<String, AiError> {
            Ok(format!("https://files.example/{}", file_name))
        }

        async fn extract_data(&self, _file_url: &str, _schema: &Value) -> Result<ExtractionResult, AiError> {
            self.extraction
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| AiError::Timeout("ExtractDataFromUploadedFile".into()))
        }

        async fn invoke_llm(&self, _prompt: &str, _schema: &Value) -> Result<Value, AiError> {
            Ok(self.llm.clone())
        }
    }

    fn ai(extraction: ExtractionResult) -> ScriptedAi {
        ScriptedAi {
            extraction: Mutex::new(Some(extraction)),
            llm: json!({"modelo": "R14", "serie": "RS-77", "origem": "uts"}),
        }
    }

    #[tokio::test]
    async fn test_image_extraction_success() {
        let ai = ai(ExtractionResult {
            status: "success".into(),
            output: Some(json!({"modelo": " E16 ", "serie": "ABC123", "ano": 2019})),
            details: None,
        });
        let outcome = extract_from_image(&ai, "chapa.jpg", vec![1, 2, 3], 1).await.unwrap();
        let draft = outcome.draft.unwrap();
        assert_eq!(draft.modelo.as_deref(), Some("E16"));
        assert_eq!(draft.categoria.as_deref(), Some("Empilhador Elétrico"));
        assert_eq!(outcome.remaining_attempts, 2);
    }

    #[tokio::test]
    async fn test_image_extraction_failure_reports_details() {
        let ai = ai(ExtractionResult {
            status: "error".into(),
            output: None,
            details: Some("Imagem desfocada".into()),
        });
        let outcome = extract_from_image(&ai, "chapa.jpg", vec![1], 3).await.unwrap();
        assert!(outcome.draft.is_none());
        assert_eq!(outcome.details.as_deref(), Some("Imagem desfocada"));
        assert_eq!(outcome.remaining_attempts, 0);
    }

    #[tokio::test]
    async fn test_attempts_are_capped() {
        let ai = ai(ExtractionResult {
            status: "success".into(),
            output: None,
            details: None,
        });
        let err = extract_from_image(&ai, "chapa.jpg", vec![1], 4).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_typed() {
        let ai = ScriptedAi {
            extraction: Mutex::new(None),
            llm: Value::Null,
        };
        let err = extract_from_image(&ai, "chapa.jpg", vec![1], 1).await.unwrap_err();
        assert!(matches!(err, AppError::GatewayTimeout(_)));
    }

    #[tokio::test]
    async fn test_text_extraction() {
        let ai = ai(ExtractionResult {
            status: "success".into(),
            output: None,
            details: None,
        });
        let draft = extract_from_text(&ai, "Retrátil R14 série RS-77 vindo da UTS").await.unwrap();
        assert_eq!(draft.origem, Some(Origem::Uts));
        assert_eq!(draft.categoria.as_deref(), Some("Retrátil"));
    }

    #[tokio::test]
    async fn test_attempts_are_counted_per_image() {
        let tracker = AttemptTracker::default();
        assert_eq!(tracker.register(b"chapa-a").await, 1);
        assert_eq!(tracker.register(b"chapa-a").await, 2);
        assert_eq!(tracker.register(b"chapa-b").await, 1);
        assert_eq!(tracker.register(b"chapa-a").await, 3);
    }

    #[tokio::test]
    async fn test_attempts_expire() {
        let tracker = AttemptTracker::new(Duration::from_millis(20));
        assert_eq!(tracker.register(b"chapa").await, 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(tracker.register(b"chapa").await, 1);
    }
}
