use super::{BuildableResource, LayerVersion};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// A Lambda function resource and the layers it uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Function {
    /// Logical id
    pub(crate) name: String,
    /// `FunctionName` property, falls back to the logical id
    pub(crate) function_name: String,
    pub(crate) runtime: Option<String>,
    pub(crate) handler: Option<String>,
    /// Local code location, `None` for inline or S3 code
    pub(crate) codeuri: Option<PathBuf>,
    pub(crate) layers: Vec<LayerVersion>,
    pub(crate) metadata: Option<Value>,
    pub(crate) stack_path: String,
}

impl Function {
    pub(crate) fn build_method(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("BuildMethod"))
            .and_then(Value::as_str)
    }
}

impl BuildableResource for Function {
    fn stack_path(&self) -> &str {
        &self.stack_path
    }

    fn name(&self) -> &str {
        &self.name
    }
}
