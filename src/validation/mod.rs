use bigdecimal::BigDecimal;
use std::fmt;

pub const IDENTIFIER_MAX_LEN: usize = 255;
pub const CURRENCY_CODE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Opaque identifiers (transaction and account ids): present and bounded.
pub fn validate_identifier(field: &'static str, value: &str) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, IDENTIFIER_MAX_LEN)
}

/// Checks a currency code and returns its upper-cased form.
pub fn validate_currency_code(currency: &str) -> Result<String, ValidationError> {
    validate_required("currency", currency)?;

    if currency.chars().count() != CURRENCY_CODE_LEN {
        return Err(ValidationError::new(
            "currency",
            format!("must be exactly {} characters", CURRENCY_CODE_LEN),
        ));
    }

    if !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ValidationError::new("currency", "must contain only letters"));
    }

    Ok(currency.to_ascii_uppercase())
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}
