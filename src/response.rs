use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn rejected(data: T, message: String) -> Self {
        Self {
            success: false,
            data: Some(data),
            message: Some(message),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Field name -> messages, in a stable order for clients.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// A create/edit form as shown to the client.
///
/// GET handlers return it with no errors. POST handlers return it with the
/// submitted input and the field errors when validation fails, so the client
/// can redisplay the form without losing what the user typed.
#[derive(Debug, Serialize)]
pub struct FormView<F> {
    pub form: F,
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
}

impl<F: Serialize> FormView<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            errors: FieldErrors::new(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<F: Serialize> IntoResponse for FormView<F> {
    fn into_response(self) -> axum::response::Response {
        if self.is_valid() {
            return ApiResponse::ok(self).into_response();
        }
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiResponse::rejected(self, "Validation failed".to_string()),
        )
            .into_response()
    }
}

/// Flatten `validator` output into per-field messages.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
            .collect::<Vec<_>>();
        out.entry(field.to_string()).or_default().extend(messages);
    }
    out
}

/// Run the derived checks of a form, collecting per-field messages.
pub fn validate_form<F: Validate>(form: &F) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => field_errors(&e),
    }
}

pub fn add_field_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}
