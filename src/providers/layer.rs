use super::BuildableResource;
use crate::errors::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const LAYER_NAME_DELIMITER: &str = "-";
const NAME_HASH_LENGTH: usize = 10;

/// A Lambda layer referenced from a template, either by literal ARN or as a
/// `LayerVersion` resource of the template itself.
///
/// A layer version ARN looks like
/// `arn:aws:lambda:region:account-id:layer:layer-name:version`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct LayerVersion {
    arn: String,
    codeuri: Option<PathBuf>,
    is_defined_within_template: bool,
    name: String,
    /// Digits of the ARN's last segment, kept as written
    version: Option<String>,
    build_method: Option<String>,
    compatible_runtimes: Vec<String>,
    stack_path: String,
}

impl LayerVersion {
    /// Layer referenced by ARN. `identifier` must be a string: layers computed
    /// through intrinsic functions (`Fn::Sub`, `Fn::Join`, ...) are not supported.
    pub(crate) fn new(identifier: &Value, codeuri: Option<PathBuf>) -> Result<Self> {
        let arn = match identifier {
            Value::String(arn) => arn.clone(),
            other => return Err(Error::UnsupportedIntrinsic(other.to_string())),
        };

        let parsed = parse_layer_arn(&arn)?;
        if let Some(path) = &codeuri {
            check_content_uri(path)?;
        }

        Ok(LayerVersion {
            name: compute_layer_name(&arn, parsed.name, parsed.version),
            version: Some(parsed.version.to_string()),
            is_defined_within_template: codeuri.is_some(),
            arn,
            codeuri,
            build_method: None,
            compatible_runtimes: Vec::new(),
            stack_path: String::new(),
        })
    }

    /// Layer defined as a resource in the template. Its name is the logical id
    /// and it carries no version until it is published. `codeuri` is `None`
    /// when the content lives on S3; such a layer can be referenced but not built.
    pub(crate) fn from_template(logical_id: &str, codeuri: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = &codeuri {
            check_content_uri(path)?;
        }

        Ok(LayerVersion {
            arn: logical_id.to_string(),
            codeuri,
            is_defined_within_template: true,
            name: logical_id.to_string(),
            version: None,
            build_method: None,
            compatible_runtimes: Vec::new(),
            stack_path: String::new(),
        })
    }

    pub(crate) fn with_compatible_runtimes(mut self, runtimes: Vec<String>) -> Self {
        self.compatible_runtimes = runtimes;
        self
    }

    /// Picks `BuildMethod` out of the resource's `Metadata` section.
    pub(crate) fn with_metadata(mut self, metadata: &Value) -> Self {
        self.build_method = metadata
            .get("BuildMethod")
            .and_then(Value::as_str)
            .map(str::to_string);
        self
    }

    pub(crate) fn with_stack_path(mut self, stack_path: &str) -> Self {
        self.stack_path = stack_path.to_string();
        self
    }

    /// The ARN, or the logical id for layers defined within the template.
    pub(crate) fn arn(&self) -> &str {
        &self.arn
    }

    /// The ARN without its trailing `:version`.
    pub(crate) fn layer_arn(&self) -> Option<&str> {
        self.version.as_ref()?;
        self.arn.rsplit_once(':').map(|(layer_arn, _)| layer_arn)
    }

    /// The version segment of the ARN. Any number of digits is accepted, so
    /// it stays a string.
    pub(crate) fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn codeuri(&self) -> Option<&Path> {
        self.codeuri.as_deref()
    }

    /// Replaces the code location. Unlike construction this does not check
    /// that the path exists; the build step points it at its output directory.
    pub(crate) fn set_codeuri(&mut self, codeuri: impl Into<PathBuf>) {
        self.codeuri = Some(codeuri.into());
    }

    pub(crate) fn is_defined_within_template(&self) -> bool {
        self.is_defined_within_template
    }

    pub(crate) fn build_method(&self) -> Option<&str> {
        self.build_method.as_deref()
    }

    pub(crate) fn compatible_runtimes(&self) -> &[String] {
        &self.compatible_runtimes
    }
}

impl BuildableResource for LayerVersion {
    fn stack_path(&self) -> &str {
        &self.stack_path
    }

    /// `<layer-name>-<version>-<hash>` for ARNs, the logical id otherwise.
    fn name(&self) -> &str {
        &self.name
    }
}

struct ParsedLayerArn<'a> {
    name: &'a str,
    version: &'a str,
}

fn parse_layer_arn(arn: &str) -> Result<ParsedLayerArn<'_>> {
    let invalid = || Error::InvalidLayerVersionArn(arn.to_string());

    let segments: Vec<&str> = arn.split(':').collect();
    let [prefix, _partition, service, _region, _account, resource, name, version] =
        segments.as_slice()
    else {
        return Err(invalid());
    };

    if *prefix != "arn" || *service != "lambda" || *resource != "layer" || name.is_empty() {
        return Err(invalid());
    }
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    Ok(ParsedLayerArn {
        name: *name,
        version: *version,
    })
}

fn compute_layer_name(arn: &str, layer_name: &str, version: &str) -> String {
    let digest = hex::encode(Sha256::digest(arn.as_bytes()));
    [layer_name, version, &digest[..NAME_HASH_LENGTH]].join(LAYER_NAME_DELIMITER)
}

fn check_content_uri(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::InvalidLayerVersionContentUri(
            path.display().to_string(),
        ))
    }
}
