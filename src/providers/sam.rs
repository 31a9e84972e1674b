use super::{
    BuildableResource, Function, LayerVersion, ResourcesToBuildCollector, Stack, LAMBDA_FUNCTION,
    LAMBDA_LAYER, SERVERLESS_FUNCTION, SERVERLESS_LAYER,
};
use crate::errors::{Error, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Functions and layers of a stack tree, keyed by full path in template order.
#[derive(Debug, Default)]
pub(crate) struct SamProvider {
    functions: IndexMap<String, Function>,
    layers: IndexMap<String, LayerVersion>,
}

impl SamProvider {
    pub(crate) fn new(stacks: &[Stack]) -> Result<Self> {
        let mut provider = SamProvider::default();

        for stack in stacks {
            let Some(resources) = stack.resources() else {
                continue;
            };
            let stack_path = stack.stack_path();

            // layers first: functions resolve `Ref`s against them
            let mut stack_layers = IndexMap::new();
            for (logical_id, resource) in resources {
                if let Some(layer) = convert_layer_resource(stack, &stack_path, logical_id, resource)? {
                    stack_layers.insert(logical_id.clone(), layer);
                }
            }

            for (logical_id, resource) in resources {
                if let Some(function) =
                    convert_function_resource(stack, &stack_path, logical_id, resource, &stack_layers)?
                {
                    provider.functions.insert(function.full_path(), function);
                }
            }

            for layer in stack_layers.into_values() {
                provider.layers.insert(layer.full_path(), layer);
            }
        }

        log::info!(
            "found {} function(s) and {} layer(s)",
            provider.functions.len(),
            provider.layers.len()
        );
        Ok(provider)
    }

    /// Looks a function up by logical id or full path.
    pub(crate) fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions
            .get(name)
            .or_else(|| self.functions.values().find(|f| f.name == name))
    }

    /// Looks a template-defined layer up by logical id or full path.
    pub(crate) fn get_layer(&self, name: &str) -> Option<&LayerVersion> {
        self.layers
            .get(name)
            .or_else(|| self.layers.values().find(|l| l.name() == name))
    }

    pub(crate) fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub(crate) fn layers(&self) -> impl Iterator<Item = &LayerVersion> {
        self.layers.values()
    }

    /// Everything that has local code: functions and template-defined layers
    /// with a local code location.
    pub(crate) fn resources_to_build(&self) -> ResourcesToBuildCollector {
        let mut collector = ResourcesToBuildCollector::new();
        for function in self.functions().filter(|f| f.codeuri.is_some()) {
            collector.add_function(function.clone());
        }
        for layer in self.layers().filter(|l| l.codeuri().is_some()) {
            collector.add_layer(layer.clone());
        }
        collector
    }
}

fn properties(resource: &Value) -> Map<String, Value> {
    resource
        .get("Properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn convert_layer_resource(
    stack: &Stack,
    stack_path: &str,
    logical_id: &str,
    resource: &Value,
) -> Result<Option<LayerVersion>> {
    let content_key = match resource.get("Type").and_then(Value::as_str) {
        Some(SERVERLESS_LAYER) => "ContentUri",
        Some(LAMBDA_LAYER) => "Content",
        _ => return Ok(None),
    };
    let properties = properties(resource);

    let codeuri = local_code_path(stack, properties.get(content_key));
    if codeuri.is_none() {
        log::warn!(
            "layer {} has no local {}, it will not be built",
            logical_id,
            content_key
        );
    }

    let compatible_runtimes = properties
        .get("CompatibleRuntimes")
        .and_then(Value::as_array)
        .map(|runtimes| {
            runtimes
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut layer = LayerVersion::from_template(logical_id, codeuri)?
        .with_compatible_runtimes(compatible_runtimes)
        .with_stack_path(stack_path);
    if let Some(metadata) = resource.get("Metadata") {
        layer = layer.with_metadata(metadata);
    }
    Ok(Some(layer))
}

fn convert_function_resource(
    stack: &Stack,
    stack_path: &str,
    logical_id: &str,
    resource: &Value,
    stack_layers: &IndexMap<String, LayerVersion>,
) -> Result<Option<Function>> {
    let code_key = match resource.get("Type").and_then(Value::as_str) {
        Some(SERVERLESS_FUNCTION) => "CodeUri",
        Some(LAMBDA_FUNCTION) => "Code",
        _ => return Ok(None),
    };
    let properties = properties(resource);
    let string_property = |key: &str| {
        properties
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let layers = match properties.get("Layers").and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .map(|entry| parse_layer_entry(entry, stack_path, stack_layers))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Some(Function {
        name: logical_id.to_string(),
        function_name: string_property("FunctionName").unwrap_or_else(|| logical_id.to_string()),
        runtime: string_property("Runtime"),
        handler: string_property("Handler"),
        codeuri: local_code_path(stack, properties.get(code_key)),
        layers,
        metadata: resource.get("Metadata").cloned(),
        stack_path: stack_path.to_string(),
    }))
}

/// One entry of a function's `Layers` list: an ARN, or a `Ref` to a layer
/// defined in the same template.
fn parse_layer_entry(
    entry: &Value,
    stack_path: &str,
    stack_layers: &IndexMap<String, LayerVersion>,
) -> Result<LayerVersion> {
    if let Some(logical_id) = entry.get("Ref").and_then(Value::as_str) {
        return stack_layers
            .get(logical_id)
            .cloned()
            .ok_or_else(|| Error::UnsupportedIntrinsic(entry.to_string()));
    }
    Ok(LayerVersion::new(entry, None)?.with_stack_path(stack_path))
}

/// Resolves a code property to a local path. S3 locations, `{Bucket, Key}`
/// mappings and inline code have no local path.
fn local_code_path(stack: &Stack, value: Option<&Value>) -> Option<PathBuf> {
    let uri = value?.as_str()?;
    if uri.starts_with("s3://") {
        return None;
    }
    Some(stack.base_dir().join(uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::path::Path;

    const ARN: &str = "arn:aws:lambda:us-east-1:123456789012:layer:shared:3";

    fn stack(dir: &Path, parent: &str, name: &str, template: Value) -> Stack {
        Stack {
            parent_stack_path: parent.to_string(),
            name: name.to_string(),
            location: dir.join("template.yaml"),
            template,
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("layer")).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        dir
    }

    #[test]
    fn test_extracts_functions_and_layers() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Deps": {
                    "Type": "AWS::Serverless::LayerVersion",
                    "Properties": {
                        "ContentUri": "layer",
                        "CompatibleRuntimes": ["python3.12"]
                    },
                    "Metadata": {"BuildMethod": "python3.12"}
                },
                "Hello": {
                    "Type": "AWS::Serverless::Function",
                    "Properties": {
                        "CodeUri": "src",
                        "Handler": "app.handler",
                        "Runtime": "python3.12",
                        "Layers": [{"Ref": "Deps"}, ARN]
                    }
                },
                "Bucket": {"Type": "AWS::S3::Bucket"}
            }
        });
        let provider = SamProvider::new(&[stack(dir.path(), "", "", template)]).unwrap();

        let function = provider.get_function("Hello").unwrap();
        assert_eq!(function.function_name, "Hello");
        assert_eq!(function.handler.as_deref(), Some("app.handler"));
        assert_eq!(function.codeuri, Some(dir.path().join("src")));
        assert_eq!(function.layers.len(), 2);
        assert_eq!(function.layers[0].name(), "Deps");
        assert!(function.layers[0].is_defined_within_template());
        assert!(function.layers[1].name().starts_with("shared-3-"));
        assert_eq!(function.layers[1].layer_arn(), Some("arn:aws:lambda:us-east-1:123456789012:layer:shared"));
    }

    #[test]
    fn test_layer_metadata_and_runtimes() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Deps": {
                    "Type": "AWS::Lambda::LayerVersion",
                    "Properties": {
                        "Content": "layer",
                        "CompatibleRuntimes": ["nodejs20.x", "nodejs22.x"]
                    },
                    "Metadata": {"BuildMethod": "nodejs20.x"}
                }
            }
        });
        let provider = SamProvider::new(&[stack(dir.path(), "", "", template)]).unwrap();

        let layer = provider.get_layer("Deps").unwrap();
        assert_eq!(layer.build_method(), Some("nodejs20.x"));
        assert_eq!(layer.compatible_runtimes(), &["nodejs20.x", "nodejs22.x"]);
        assert_eq!(layer.codeuri(), Some(dir.path().join("layer").as_path()));
    }

    #[test]
    fn test_remote_layer_content_is_not_built() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Remote": {
                    "Type": "AWS::Serverless::LayerVersion",
                    "Properties": {"ContentUri": "s3://bucket/layer.zip"}
                },
                "Mapping": {
                    "Type": "AWS::Lambda::LayerVersion",
                    "Properties": {"Content": {"S3Bucket": "bucket", "S3Key": "layer.zip"}}
                }
            }
        });
        let provider = SamProvider::new(&[stack(dir.path(), "", "", template)]).unwrap();
        assert_eq!(provider.layers().count(), 2);
        assert_eq!(provider.get_layer("Remote").unwrap().codeuri(), None);
        assert!(provider.resources_to_build().layers().is_empty());
    }

    #[test]
    fn test_ref_to_remote_layer_resolves() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Remote": {
                    "Type": "AWS::Serverless::LayerVersion",
                    "Properties": {"ContentUri": "s3://bucket/layer.zip"}
                },
                "Hello": {
                    "Type": "AWS::Serverless::Function",
                    "Properties": {"CodeUri": "src", "Layers": [{"Ref": "Remote"}]}
                }
            }
        });
        let provider = SamProvider::new(&[stack(dir.path(), "", "", template)]).unwrap();

        let function = provider.get_function("Hello").unwrap();
        assert_eq!(function.layers.len(), 1);
        assert_eq!(function.layers[0].name(), "Remote");
        assert!(function.layers[0].is_defined_within_template());

        let to_build = provider.resources_to_build();
        assert_eq!(to_build.functions().len(), 1);
        assert!(to_build.layers().is_empty());
    }

    #[test]
    fn test_intrinsic_layer_entry_is_rejected() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Hello": {
                    "Type": "AWS::Serverless::Function",
                    "Properties": {
                        "CodeUri": "src",
                        "Layers": [{"Fn::Sub": "arn:aws:lambda:${AWS::Region}:123456789012:layer:x:1"}]
                    }
                }
            }
        });
        assert!(matches!(
            SamProvider::new(&[stack(dir.path(), "", "", template)]),
            Err(Error::UnsupportedIntrinsic(_))
        ));
    }

    #[test]
    fn test_ref_to_missing_layer_is_rejected() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Hello": {
                    "Type": "AWS::Serverless::Function",
                    "Properties": {"CodeUri": "src", "Layers": [{"Ref": "Nope"}]}
                }
            }
        });
        assert!(matches!(
            SamProvider::new(&[stack(dir.path(), "", "", template)]),
            Err(Error::UnsupportedIntrinsic(_))
        ));
    }

    #[test]
    fn test_invalid_layer_arn_is_rejected() {
        let dir = project();
        let template = json!({
            "Resources": {
                "Hello": {
                    "Type": "AWS::Lambda::Function",
                    "Properties": {"Code": "src", "Layers": ["arn:aws:lambda:us-east-1:1:layer:x"]}
                }
            }
        });
        assert!(matches!(
            SamProvider::new(&[stack(dir.path(), "", "", template)]),
            Err(Error::InvalidLayerVersionArn(_))
        ));
    }

    #[test]
    fn test_nested_stack_resources_and_build_dirs() {
        let dir = project();
        let root = json!({"Resources": {}});
        let child = json!({
            "Resources": {
                "Deps": {
                    "Type": "AWS::Serverless::LayerVersion",
                    "Properties": {"ContentUri": "layer"}
                },
                "Hello": {
                    "Type": "AWS::Serverless::Function",
                    "Properties": {"CodeUri": "src", "FunctionName": "hello-world"}
                },
                "Inline": {
                    "Type": "AWS::Lambda::Function",
                    "Properties": {"Code": {"ZipFile": "def handler(e, c): pass"}}
                }
            }
        });
        let provider = SamProvider::new(&[
            stack(dir.path(), "", "", root),
            stack(dir.path(), "", "Child", child),
        ])
        .unwrap();

        let function = provider.get_function("Child/Hello").unwrap();
        assert_eq!(function.function_name, "hello-world");
        assert_eq!(
            function.build_dir(Path::new("build")),
            Path::new("build").join("Child").join("Hello")
        );
        assert_eq!(
            provider.get_layer("Deps").unwrap().full_path(),
            "Child/Deps"
        );

        let to_build = provider.resources_to_build();
        let names: Vec<String> = to_build.functions().iter().map(|f| f.full_path()).collect();
        assert_eq!(names, vec!["Child/Hello"]);
        assert_eq!(to_build.layers().len(), 1);
    }
}
