//! Utilidades de validación
//!
//! Validadores usados por los `#[derive(Validate)]` de los DTOs
//! y helpers de normalización de texto.

use validator::ValidationError;

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Número de série: alfanumérico com separadores, 3 a 40 caracteres
pub fn validate_serie(value: &str) -> Result<(), ValidationError> {
    let clean = value.trim();
    let valid_chars = clean
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.' | ' '));
    if clean.len() < 3 || clean.len() > 40 || !valid_chars {
        let mut error = ValidationError::new("serie");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Identificador de técnico: minúsculas, dígitos e hífen
pub fn validate_technician_id(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        let mut error = ValidationError::new("tecnico");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Minúsculas sem acentos, para comparar texto em português
pub fn fold_text(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Normalizar um número de série para comparação
pub fn normalize_serie(value: &str) -> String {
    value.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_serie() {
        assert!(validate_serie("ABC123").is_ok());
        assert!(validate_serie("516214-A/01").is_ok());
        assert!(validate_serie("AB").is_err());
        assert!(validate_serie("ABC;DROP").is_err());
    }

    #[test]
    fn test_validate_technician_id() {
        assert!(validate_technician_id("nuno").is_ok());
        assert!(validate_technician_id("joao-2").is_ok());
        assert!(validate_technician_id("João").is_err());
        assert!(validate_technician_id("").is_err());
    }

    #[test]
    fn test_fold_text() {
        assert_eq!(fold_text("Preparação Concluída"), "preparacao concluida");
        assert_eq!(fold_text("DISPONÍVEL"), "disponivel");
    }

    #[test]
    fn test_normalize_serie() {
        assert_eq!(normalize_serie("  abc123 "), "ABC123");
    }
}
