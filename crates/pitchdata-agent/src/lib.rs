//! Agent-facing tool surface for pitchdata.
//!
//! A [`ToolRegistry`] holds the declared tool table; [`ToolRegistry::dispatch`]
//! validates an incoming call against the tool's parameter schema, routes it to
//! the bound data-access function, and returns a structured result or a
//! structured error. All tools are read-only against the warehouse.

pub mod dispatch;
pub mod registry;
mod tools;

pub use dispatch::{ToolError, ToolResponse};
pub use registry::{
    ParamDescriptor, ParamSpec, ParamType, ToolArgs, ToolDescriptor, ToolRegistry, ToolSpec,
};
