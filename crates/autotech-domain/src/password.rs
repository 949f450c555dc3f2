//! Reglas de credenciales para los formularios de autenticación.
//!
//! La autenticación en sí la resuelve un colaborador externo; aquí sólo viven
//! los predicados que se aplican antes de llamarlo.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const MIN_PASSWORD_LEN: usize = 8;
/// Cantidad mínima de requisitos cumplidos para aceptar un registro.
pub const SIGN_UP_MIN_PASSED: usize = 4;

static UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").unwrap());
static LOWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").unwrap());
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());
static SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Special,
}

impl Requirement {
    pub const ALL: [Requirement; 5] = [Requirement::MinLength,
                                       Requirement::Uppercase,
                                       Requirement::Lowercase,
                                       Requirement::Digit,
                                       Requirement::Special];

    pub fn label(&self) -> &'static str {
        match self {
            Requirement::MinLength => "At least 8 characters",
            Requirement::Uppercase => "One uppercase letter",
            Requirement::Lowercase => "One lowercase letter",
            Requirement::Digit => "One number",
            Requirement::Special => "One special character (!@#$%^&*)",
        }
    }

    pub fn is_met(&self, password: &str) -> bool {
        match self {
            Requirement::MinLength => password.chars().count() >= MIN_PASSWORD_LEN,
            Requirement::Uppercase => UPPER.is_match(password),
            Requirement::Lowercase => LOWER.is_match(password),
            Requirement::Digit => DIGIT.is_match(password),
            Requirement::Special => SPECIAL.is_match(password),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthReport {
    pub strength: PasswordStrength,
    pub passed: Vec<Requirement>,
}

pub fn evaluate(password: &str) -> StrengthReport {
    let passed: Vec<Requirement> = Requirement::ALL.iter().copied().filter(|r| r.is_met(password)).collect();
    // umbrales 0.8 / 0.6 sobre 5 requisitos => 4 / 3
    let strength = match passed.len() {
        n if n * 5 >= Requirement::ALL.len() * 4 => PasswordStrength::Strong,
        n if n * 5 >= Requirement::ALL.len() * 3 => PasswordStrength::Medium,
        _ => PasswordStrength::Weak,
    };
    StrengthReport { strength, passed }
}

/// Validación de registro: longitud mínima y al menos 4 de 5 requisitos.
pub fn validate_sign_up_password(password: &str) -> Result<(), DomainError> {
    validate_password_length(password)?;
    if evaluate(password).passed.len() < SIGN_UP_MIN_PASSED {
        return Err(DomainError::validation("Password must meet at least 4 of the 5 requirements"));
    }
    Ok(())
}

pub fn validate_password_length(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation("Password must be at least 8 characters"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    if !EMAIL.is_match(email.trim()) {
        return Err(DomainError::validation("Please enter a valid email address"));
    }
    Ok(())
}
