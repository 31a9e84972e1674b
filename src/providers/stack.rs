use super::{posix_join, CLOUDFORMATION_STACK, SERVERLESS_APPLICATION};
use crate::errors::Result;
use crate::template::load_template;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// A template together with its position in the nested stack tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stack {
    /// `stack_path` of the parent stack, empty for the root stack and its children
    pub(crate) parent_stack_path: String,
    /// Logical id of the stack resource, empty for the root stack
    pub(crate) name: String,
    pub(crate) location: PathBuf,
    pub(crate) template: Value,
}

impl Stack {
    /// Path of logical ids from the root stack: `""`, `"StackX"`, `"StackX/StackY"`.
    pub(crate) fn stack_path(&self) -> String {
        if self.name.is_empty() {
            self.parent_stack_path.clone()
        } else {
            posix_join(&self.parent_stack_path, &self.name)
        }
    }

    pub(crate) fn is_root_stack(&self) -> bool {
        self.stack_path().is_empty()
    }

    pub(crate) fn resources(&self) -> Option<&Map<String, Value>> {
        self.template.get("Resources").and_then(Value::as_object)
    }

    /// Directory that relative paths inside this template are resolved against.
    pub(crate) fn base_dir(&self) -> &Path {
        self.location.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Loads the template at `template_path` and every nested stack whose template
/// lives on the local filesystem, root stack first.
pub(crate) fn load_stacks(template_path: &Path) -> Result<Vec<Stack>> {
    let root = Stack {
        parent_stack_path: String::new(),
        name: String::new(),
        location: template_path.to_path_buf(),
        template: load_template(template_path)?,
    };

    let mut stacks = Vec::new();
    let mut ancestors = Vec::new();
    collect_stacks(root, &mut ancestors, &mut stacks)?;
    log::debug!("found {} stack(s) under {}", stacks.len(), template_path.display());
    Ok(stacks)
}

fn collect_stacks(stack: Stack, ancestors: &mut Vec<PathBuf>, stacks: &mut Vec<Stack>) -> Result<()> {
    let stack_path = stack.stack_path();
    let children: Vec<(String, PathBuf)> = stack
        .resources()
        .map(|resources| {
            resources
                .iter()
                .filter_map(|(logical_id, resource)| {
                    child_template_location(resource)
                        .map(|location| (logical_id.clone(), stack.base_dir().join(location)))
                })
                .collect()
        })
        .unwrap_or_default();

    if !stack.is_root_stack() {
        log::debug!("nested stack {} at {}", stack_path, stack.location.display());
    }
    ancestors.push(canonical(&stack.location));
    stacks.push(stack);

    for (logical_id, location) in children {
        if ancestors.contains(&canonical(&location)) {
            log::warn!(
                "skipping nested stack {}: {} is already being loaded",
                logical_id,
                location.display()
            );
            continue;
        }
        let child = Stack {
            parent_stack_path: stack_path.clone(),
            name: logical_id,
            template: load_template(&location)?,
            location,
        };
        collect_stacks(child, ancestors, stacks)?;
    }

    ancestors.pop();
    Ok(())
}

/// `sub/../template.yaml` and `./template.yaml` name the same file. Paths that
/// cannot be resolved are compared as written.
fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Local template location of a nested application or stack resource, if any.
fn child_template_location(resource: &Value) -> Option<String> {
    let resource_type = resource.get("Type").and_then(Value::as_str)?;
    let properties = resource.get("Properties")?;

    let location = match resource_type {
        SERVERLESS_APPLICATION => {
            // a mapping here is a Serverless Application Repository reference
            let location = properties.get("Location").and_then(Value::as_str)?;
            if location.starts_with("s3://") || location.starts_with("https://") {
                log::debug!("skipping remote application {}", location);
                return None;
            }
            location
        }
        CLOUDFORMATION_STACK => {
            let url = properties.get("TemplateURL").and_then(Value::as_str)?;
            if !url.starts_with("file://") {
                log::debug!("skipping remote stack template {}", url);
                return None;
            }
            url
        }
        _ => return None,
    };

    Some(location.trim_start_matches("file://").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_stack_path() {
        let stack = |parent: &str, name: &str| Stack {
            parent_stack_path: parent.to_string(),
            name: name.to_string(),
            location: PathBuf::from("template.yaml"),
            template: Value::Null,
        };

        assert_eq!(stack("", "").stack_path(), "");
        assert!(stack("", "").is_root_stack());
        assert_eq!(stack("", "StackX").stack_path(), "StackX");
        assert_eq!(stack("StackX", "StackY").stack_path(), "StackX/StackY");
        assert!(!stack("StackX", "StackY").is_root_stack());
    }

    #[test]
    fn test_load_nested_stacks() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("child")).unwrap();
        fs::write(
            dir.path().join("template.yaml"),
            r#"
Resources:
  Child:
    Type: AWS::Serverless::Application
    Properties:
      Location: child/template.yaml
  Remote:
    Type: AWS::Serverless::Application
    Properties:
      Location: s3://bucket/template.yaml
  Repo:
    Type: AWS::Serverless::Application
    Properties:
      Location:
        ApplicationId: arn:aws:serverlessrepo:us-east-1:123456789012:applications/app
        SemanticVersion: 1.0.0
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("child/template.yaml"),
            r#"
Resources:
  Grand:
    Type: AWS::CloudFormation::Stack
    Properties:
      TemplateURL: file://grand.json
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("child/grand.json"),
            r#"{"Resources": {}}"#,
        )
        .unwrap();

        let stacks = load_stacks(&dir.path().join("template.yaml")).unwrap();
        let paths: Vec<String> = stacks.iter().map(Stack::stack_path).collect();
        assert_eq!(paths, vec!["", "Child", "Child/Grand"]);
        assert_eq!(stacks[2].location, dir.path().join("child").join("grand.json"));
    }

    #[test]
    fn test_self_referencing_stack_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("template.yaml"),
            r#"
Resources:
  Again:
    Type: AWS::Serverless::Application
    Properties:
      Location: template.yaml
"#,
        )
        .unwrap();

        let stacks = load_stacks(&dir.path().join("template.yaml")).unwrap();
        assert_eq!(stacks.len(), 1);
    }

    #[test]
    fn test_self_reference_through_other_spelling_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(
            dir.path().join("template.yaml"),
            r#"
Resources:
  Dotted:
    Type: AWS::Serverless::Application
    Properties:
      Location: ./template.yaml
  Detour:
    Type: AWS::CloudFormation::Stack
    Properties:
      TemplateURL: file://sub/../template.yaml
"#,
        )
        .unwrap();

        let stacks = load_stacks(&dir.path().join("template.yaml")).unwrap();
        assert_eq!(stacks.len(), 1);
    }

    #[test]
    fn test_cycle_between_two_stacks_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("child")).unwrap();
        fs::write(
            dir.path().join("template.yaml"),
            r#"
Resources:
  Child:
    Type: AWS::Serverless::Application
    Properties:
      Location: child/template.yaml
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("child/template.yaml"),
            r#"
Resources:
  Back:
    Type: AWS::Serverless::Application
    Properties:
      Location: ../template.yaml
"#,
        )
        .unwrap();

        let stacks = load_stacks(&dir.path().join("template.yaml")).unwrap();
        let paths: Vec<String> = stacks.iter().map(Stack::stack_path).collect();
        assert_eq!(paths, vec!["", "Child"]);
    }
}
