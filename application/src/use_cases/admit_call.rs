//! Admission controller
//!
//! Four ordered gates, stopping at the first failure:
//!
//! 1. schema validation of the raw arguments
//! 2. sanitization, then validation again on the cleaned arguments
//! 3. permission check on the sanitized arguments
//! 4. rate limit (user → tool → global), then the cost quota
//!
//! A call that clears all four comes out as an [`AdmittedCall`] carrying the
//! sanitized arguments and the cost already charged.

use crate::services::{PermissionChecker, QuotaTracker, RateLimiter};
use std::sync::Arc;
use toolgate_domain::{InputSanitizer, ToolCall, ToolError, ToolSpec};
use tracing::{debug, warn};

/// Operation checked when the caller does not name one.
pub const DEFAULT_OPERATION: &str = "execute";

/// A call cleared for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedCall {
    pub call: ToolCall,
    pub charged_cost: f64,
}

pub struct AdmissionController {
    permissions: Arc<PermissionChecker>,
    rate_limiter: Arc<RateLimiter>,
    quota: Arc<QuotaTracker>,
    sanitizer: InputSanitizer,
    operation: String,
}

impl AdmissionController {
    pub fn new(
        permissions: Arc<PermissionChecker>,
        rate_limiter: Arc<RateLimiter>,
        quota: Arc<QuotaTracker>,
    ) -> Self {
        Self {
            permissions,
            rate_limiter,
            quota,
            sanitizer: InputSanitizer::default(),
            operation: DEFAULT_OPERATION.to_string(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: InputSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    pub fn permissions(&self) -> &Arc<PermissionChecker> {
        &self.permissions
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    pub async fn admit(
        &self,
        user_id: &str,
        spec: &ToolSpec,
        call: ToolCall,
    ) -> Result<AdmittedCall, ToolError> {
        if let Err(fields) = spec.parameters.validate(&call.arguments_value()) {
            debug!(
                "Call {} to {} failed validation ({} field errors)",
                call.id,
                spec.name,
                fields.len()
            );
            return Err(ToolError::validation(fields));
        }

        let arguments = self.sanitizer.sanitize_arguments(&call.arguments);
        let call = call.with_arguments(arguments);

        // Sanitizing can drop keys or empty strings; the handler only ever
        // sees arguments that still satisfy the schema.
        if let Err(fields) = spec.parameters.validate(&call.arguments_value()) {
            debug!(
                "Call {} to {} failed validation after sanitization ({} field errors)",
                call.id,
                spec.name,
                fields.len()
            );
            return Err(ToolError::validation(fields));
        }

        if !self
            .permissions
            .can_execute(user_id, &spec.name, &self.operation, &call.arguments)
        {
            warn!(
                "Permission denied: {} may not {} {}",
                user_id, self.operation, spec.name
            );
            return Err(ToolError::permission_denied(&spec.name, &self.operation));
        }

        self.rate_limiter.check(user_id, &spec.name).await?;

        let charged_cost = match spec.estimated_cost {
            Some(cost) => {
                self.quota.check_and_charge(user_id, cost).await?;
                cost
            }
            None => 0.0,
        };

        Ok(AdmittedCall { call, charged_cost })
    }
}
