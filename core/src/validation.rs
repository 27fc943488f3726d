//! Structural validation of subscription requests.
//!
//! Every rule is checked independently; a result lists all violations at
//! once so callers can report them together.

use crate::provider::ProviderRegistry;
use crate::types::CreateSubscriptionRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Stable error codes, one per validation rule.
pub mod codes {
    /// Owning user id is missing.
    pub const USER_ID_REQUIRED: u16 = 100;
    /// Display name is missing or empty.
    pub const NAME_REQUIRED: u16 = 101;
    /// Provider is missing or unknown.
    pub const PROVIDER_INVALID: u16 = 102;
    /// Expiration date is missing or not in the future.
    pub const EXPIRATION_DATE_INVALID: u16 = 103;
}

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationError {
    /// Stable rule code, see [`codes`].
    pub code: u16,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error.
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Accumulated outcome of validating one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create an empty (passing) result.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record a violation.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Returns `true` if any rule was violated.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Violations in the order they were recorded.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Codes of every violation.
    #[must_use]
    pub fn codes(&self) -> Vec<u16> {
        self.errors.iter().map(|e| e.code).collect()
    }

    /// Consume the result, returning its violations.
    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

static VALIDATOR: LazyLock<RequestValidator> =
    LazyLock::new(|| RequestValidator::new(ProviderRegistry::global()));

/// Validator for [`CreateSubscriptionRequest`].
///
/// | Code | Rule |
/// |---|---|
/// | 100 | user id present |
/// | 101 | name present and non-empty |
/// | 102 | provider present and known |
/// | 103 | expiration date present and strictly after "now" |
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    registry: &'static ProviderRegistry,
}

impl RequestValidator {
    /// Create a validator resolving providers through `registry`.
    #[must_use]
    pub const fn new(registry: &'static ProviderRegistry) -> Self {
        Self { registry }
    }

    /// The process-wide validator instance.
    #[must_use]
    pub fn global() -> &'static Self {
        &VALIDATOR
    }

    /// Validate against the current system time.
    #[must_use]
    pub fn validate(&self, request: &CreateSubscriptionRequest) -> ValidationResult {
        self.validate_at(request, Utc::now())
    }

    /// Validate with `now` as the reference instant for the expiration rule.
    #[must_use]
    pub fn validate_at(
        &self,
        request: &CreateSubscriptionRequest,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if request.user_id.is_none() {
            result.add(ValidationError::new(
                codes::USER_ID_REQUIRED,
                "user id is required",
            ));
        }

        if request.name.as_deref().is_none_or(str::is_empty) {
            result.add(ValidationError::new(codes::NAME_REQUIRED, "name is required"));
        }

        if self.registry.try_resolve(request.provider.as_deref()).is_none() {
            result.add(ValidationError::new(
                codes::PROVIDER_INVALID,
                "provider is missing or unknown",
            ));
        }

        if request.expiration_date.is_none_or(|expires| expires <= now) {
            result.add(ValidationError::new(
                codes::EXPIRATION_DATE_INVALID,
                "expiration date must be in the future",
            ));
        }

        result
    }
}
