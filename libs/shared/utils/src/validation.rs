// =====================================================================================
// FORM VALIDATION - synchronous checks run before any submit action is enabled
// =====================================================================================

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use shared_models::error::{FieldError, PortalError};

use crate::format::digits_only;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

const PASSWORD_MIN_LENGTH: usize = 8;
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordStrength {
    Weak,
    Fair,
    Good,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordStrengthResult {
    pub strength: PasswordStrength,
    pub score: u8,
    /// Unmet requirements; the password is accepted only when this is empty.
    pub issues: Vec<String>,
}

impl PasswordStrengthResult {
    pub fn is_acceptable(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email) && email.len() <= 254
}

pub fn password_strength(password: &str) -> PasswordStrengthResult {
    let mut score = 0u8;
    let mut issues = Vec::new();

    let length = password.chars().count();
    if length >= 12 {
        score += 40;
    } else if length >= PASSWORD_MIN_LENGTH {
        score += 25;
    } else {
        issues.push(format!("A senha deve ter pelo menos {} caracteres", PASSWORD_MIN_LENGTH));
    }

    if password.chars().any(|c| c.is_lowercase()) {
        score += 15;
    } else {
        issues.push("A senha deve conter letras minúsculas".to_string());
    }

    if password.chars().any(|c| c.is_uppercase()) {
        score += 15;
    } else {
        issues.push("A senha deve conter letras maiúsculas".to_string());
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 15;
    } else {
        issues.push("A senha deve conter números".to_string());
    }

    if password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        score += 15;
    } else {
        issues.push("A senha deve conter caracteres especiais".to_string());
    }

    let strength = match score {
        0..=25 => PasswordStrength::Weak,
        26..=50 => PasswordStrength::Fair,
        51..=75 => PasswordStrength::Good,
        _ => PasswordStrength::Strong,
    };

    PasswordStrengthResult { strength, score, issues }
}

/// CPF check-digit validation. Accepts masked or bare input.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = digits_only(cpf).chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 { 0 } else { rest }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}

/// Brazilian landline (10 digits) or mobile (11 digits) number with area code.
pub fn validate_phone(phone: &str) -> bool {
    matches!(digits_only(phone).len(), 10 | 11)
}

/// Collects inline field errors for one form.
#[derive(Debug, Default)]
pub struct FormValidator {
    errors: Vec<FieldError>,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "Campo obrigatório"));
        }
        self
    }

    pub fn email(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "Campo obrigatório"));
        } else if !validate_email(value.trim()) {
            self.errors.push(FieldError::new(field, "E-mail inválido"));
        }
        self
    }

    pub fn password(mut self, field: &str, value: &str) -> Self {
        let result = password_strength(value);
        if let Some(issue) = result.issues.into_iter().next() {
            self.errors.push(FieldError::new(field, issue));
        }
        self
    }

    pub fn matches(mut self, field: &str, value: &str, other: &str) -> Self {
        if value != other {
            self.errors.push(FieldError::new(field, "As senhas não coincidem"));
        }
        self
    }

    pub fn cpf(mut self, field: &str, value: &str) -> Self {
        if !validate_cpf(value) {
            self.errors.push(FieldError::new(field, "CPF inválido"));
        }
        self
    }

    pub fn optional_phone(mut self, field: &str, value: Option<&str>) -> Self {
        if let Some(phone) = value.filter(|p| !p.trim().is_empty()) {
            if !validate_phone(phone) {
                self.errors.push(FieldError::new(field, "Telefone inválido"));
            }
        }
        self
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn finish(self) -> Result<(), PortalError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(PortalError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_cpf_checksum() {
        assert!(validate_cpf("529.982.247-25"));
        assert!(validate_cpf("52998224725"));
        assert!(!validate_cpf("529.982.247-24"));
        assert!(!validate_cpf("111.111.111-11"));
        assert!(!validate_cpf("1234"));
    }

    #[test]
    fn test_email_format() {
        assert!(validate_email("maria@clinica.com.br"));
        assert!(!validate_email("maria@clinica"));
        assert!(!validate_email("not an email"));
    }

    #[test]
    fn test_password_requirements() {
        let weak = password_strength("abc");
        assert!(!weak.is_acceptable());
        assert_eq!(weak.strength, PasswordStrength::Weak);

        let ok = password_strength("Senha@2024");
        assert!(ok.is_acceptable(), "unexpected issues: {:?}", ok.issues);
        assert_eq!(ok.strength, PasswordStrength::Strong);
    }

    #[test]
    fn test_form_validator_collects_every_field() {
        let result = FormValidator::new()
            .required("name", " ")
            .email("email", "bad")
            .cpf("cpf", "000.000.000-00")
            .matches("confirm_password", "a", "b")
            .optional_phone("phone", None)
            .finish();

        assert_matches!(result, Err(PortalError::Validation(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["name", "email", "cpf", "confirm_password"]);
        });
    }
}
