//! Resource models read from SAM templates and the providers that extract them.

mod function;
mod layer;
mod sam;
mod stack;

pub(crate) use function::Function;
pub(crate) use layer::LayerVersion;
pub(crate) use sam::SamProvider;
pub(crate) use stack::{load_stacks, Stack};

use std::path::{Path, PathBuf};

pub(crate) const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";
pub(crate) const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
pub(crate) const SERVERLESS_LAYER: &str = "AWS::Serverless::LayerVersion";
pub(crate) const LAMBDA_LAYER: &str = "AWS::Lambda::LayerVersion";
pub(crate) const SERVERLESS_APPLICATION: &str = "AWS::Serverless::Application";
pub(crate) const CLOUDFORMATION_STACK: &str = "AWS::CloudFormation::Stack";

/// A template resource that gets its own build artifact directory.
pub(crate) trait BuildableResource {
    /// `/`-separated logical ids of the enclosing nested stacks, empty for the root stack.
    fn stack_path(&self) -> &str;

    fn name(&self) -> &str;

    /// Identifier that stays unique across nested stacks, e.g. `ChildStack/MyLayer`.
    fn full_path(&self) -> String {
        get_full_path(self.stack_path(), self.name())
    }

    fn build_dir(&self, build_root: &Path) -> PathBuf {
        build_dir(self, build_root)
    }
}

/// Posix-style join of a stack path and a logical id.
pub(crate) fn get_full_path(stack_path: &str, logical_id: &str) -> String {
    posix_join(stack_path, logical_id)
}

pub(crate) fn posix_join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Directory the build artifacts of `resource` go to: the build root, then one
/// directory per nested stack, then the resource name. Pure path arithmetic,
/// the filesystem is never touched.
pub(crate) fn build_dir<R: BuildableResource + ?Sized>(resource: &R, build_root: &Path) -> PathBuf {
    let mut dir = build_root.to_path_buf();
    for segment in resource.stack_path().split('/').filter(|s| !s.is_empty()) {
        dir.push(segment);
    }
    dir.push(resource.name());
    dir
}

/// Functions and layers that need to be built, in template order.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ResourcesToBuildCollector {
    functions: Vec<Function>,
    layers: Vec<LayerVersion>,
}

impl ResourcesToBuildCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub(crate) fn add_layer(&mut self, layer: LayerVersion) {
        self.layers.push(layer);
    }

    pub(crate) fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub(crate) fn layers(&self) -> &[LayerVersion] {
        &self.layers
    }

    /// Points every layer's code location at its build directory, which is
    /// where the code lives once it has been built.
    pub(crate) fn use_build_artifacts(&mut self, build_root: &Path) {
        for layer in &mut self.layers {
            let dir = layer.build_dir(build_root);
            layer.set_codeuri(dir);
        }
    }
}
