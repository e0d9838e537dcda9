use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use pitchdata_warehouse::{Warehouse, WarehouseError};

use crate::tools;

/// Parameter types a tool can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub required: bool,
    /// Closed value set for enum-like string parameters.
    pub allowed: Option<&'static [&'static str]>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(
        name: &'static str,
        param_type: ParamType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type,
            required: true,
            allowed: None,
            description,
        }
    }

    pub const fn optional(
        name: &'static str,
        param_type: ParamType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type,
            required: false,
            allowed: None,
            description,
        }
    }

    pub const fn with_allowed(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Validated parameters handed to a tool handler.
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }
}

pub type ToolHandler =
    Arc<dyn Fn(&Warehouse, &ToolArgs) -> Result<Value, WarehouseError> + Send + Sync>;

/// A named, schema-validated read operation bound to a data-access function.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub(crate) handler: ToolHandler,
}

impl ToolSpec {
    pub fn new(
        name: &'static str,
        description: &'static str,
        params: Vec<ParamSpec>,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name,
            description,
            params,
            handler,
        }
    }
}

/// Serializable view of a tool for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<&'static str>>,
    pub description: &'static str,
}

/// Registry mapping tool names to their specs; the table is fixed at
/// construction.
pub struct ToolRegistry {
    pub(crate) warehouse: Warehouse,
    pub(crate) tools: BTreeMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    pub fn new(warehouse: Warehouse) -> Self {
        Self {
            warehouse,
            tools: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the built-in tool table.
    pub fn with_builtin_tools(warehouse: Warehouse) -> Self {
        let mut registry = Self::new(warehouse);
        tools::install(&mut registry);
        registry
    }

    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name, spec);
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|spec| ToolDescriptor {
                name: spec.name,
                description: spec.description,
                params: spec
                    .params
                    .iter()
                    .map(|param| ParamDescriptor {
                        name: param.name,
                        r#type: param.param_type.as_str(),
                        required: param.required,
                        allowed: param.allowed.map(|values| values.to_vec()),
                        description: param.description,
                    })
                    .collect(),
            })
            .collect()
    }
}
