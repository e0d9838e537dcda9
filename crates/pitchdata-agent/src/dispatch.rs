use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::{ToolArgs, ToolRegistry, ToolSpec};

/// Structured dispatch failure; one error shape at the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool '{name}'")]
    NotFound { name: String },

    #[error("invalid parameter '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("data access failed: {message}")]
    DataAccess { message: String },
}

impl ToolError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::DataAccess { .. } => "data_access",
        }
    }
}

/// Structured result payload returned to the tool caller.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub tool: String,
    pub row_count: usize,
    pub data: Value,
}

impl ToolRegistry {
    /// Validates the request against the tool's declared parameter schema and
    /// invokes the bound data-access function. Read-only; never mutates
    /// ingested data, and each call is independent of others in flight.
    pub fn dispatch(
        &self,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<ToolResponse, ToolError> {
        let spec = self.tools.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_owned(),
        })?;

        validate_params(spec, params)?;

        let args = ToolArgs::new(params.clone());
        let data =
            (spec.handler)(&self.warehouse, &args).map_err(|error| ToolError::DataAccess {
                message: error.to_string(),
            })?;

        let row_count = match &data {
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };

        Ok(ToolResponse {
            tool: name.to_owned(),
            row_count,
            data,
        })
    }
}

fn validate_params(spec: &ToolSpec, params: &Map<String, Value>) -> Result<(), ToolError> {
    for name in params.keys() {
        if !spec.params.iter().any(|param| param.name == name) {
            return Err(ToolError::Validation {
                field: name.clone(),
                message: String::from("unknown parameter"),
            });
        }
    }

    for param in &spec.params {
        let value = params.get(param.name).filter(|value| !value.is_null());
        match value {
            None => {
                if param.required {
                    return Err(ToolError::Validation {
                        field: param.name.to_owned(),
                        message: String::from("required parameter is missing"),
                    });
                }
            }
            Some(value) => {
                if !param.param_type.matches(value) {
                    return Err(ToolError::Validation {
                        field: param.name.to_owned(),
                        message: format!(
                            "expected {}, got {}",
                            param.param_type.as_str(),
                            value_type_name(value)
                        ),
                    });
                }

                if let (Some(allowed), Some(text)) = (param.allowed, value.as_str()) {
                    if !allowed.contains(&text) {
                        return Err(ToolError::Validation {
                            field: param.name.to_owned(),
                            message: format!(
                                "'{text}' is not one of: {}",
                                allowed.join(", ")
                            ),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
