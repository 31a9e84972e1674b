use atty::Stream;
use clap::{ArgAction, Args, Parser, Subcommand};
use console::style;
use serde_json::{json, Value};
use std::error::Error;
use std::path::{Path, PathBuf};

mod cicd;
mod errors;
mod pipeline;
mod providers;
mod template;

use cicd::CicdPlatform;
use pipeline::{GuidedContext, GuidedOutcome, TermPrompter};
use providers::{load_stacks, BuildableResource, Function, LayerVersion, SamProvider};

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the functions and layers of a template and where they get built
    Resources(ResourcesArgs),
    /// Print the CI/CD platform this process runs in
    Cicd,
    /// Pipeline setup
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommand,
    },
}

#[derive(Args, Debug)]
struct ResourcesArgs {
    /// Template file, nested stacks next to it are followed
    #[arg(short, long, default_value = "template.yaml")]
    template: PathBuf,

    /// Root directory of the build artifacts
    #[arg(short, long, env = "SAM_BUILD_DIR", default_value = ".aws-sam/build")]
    build_dir: PathBuf,

    /// Only show the function or layer with this logical id or full path
    #[arg(short, long)]
    name: Option<String>,

    /// Show layer code locations as they are after a build
    #[arg(long)]
    built: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum PipelineCommand {
    /// Interactively collect the resources a pipeline stage needs
    Bootstrap(BootstrapArgs),
}

#[derive(Args, Debug)]
struct BootstrapArgs {
    /// Account the resources get bootstrapped in
    #[arg(long, env = "AWS_ACCOUNT_ID")]
    account_id: String,

    #[arg(long)]
    stage: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    #[arg(long)]
    pipeline_user: Option<String>,

    #[arg(long)]
    pipeline_execution_role: Option<String>,

    #[arg(long)]
    cloudformation_execution_role: Option<String>,

    /// Artifacts bucket ARN
    #[arg(long)]
    bucket: Option<String>,

    #[arg(long)]
    image_repository: Option<String>,

    #[arg(long)]
    pipeline_ip_range: Option<String>,
}

/// Process-wide facts, computed once at startup.
struct Context {
    cicd: Option<CicdPlatform>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    console::set_colors_enabled(atty::is(Stream::Stdout));

    let context = Context {
        cicd: cicd::detect_from_process(),
    };
    log::debug!("CI/CD platform: {:?}", context.cicd);

    match cli.command {
        Command::Resources(args) => list_resources(&args)?,
        Command::Cicd => print_cicd(&context),
        Command::Pipeline {
            command: PipelineCommand::Bootstrap(args),
        } => bootstrap(&context, args).await?,
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("sam_rs", level)
        .parse_default_env()
        .init();
}

fn list_resources(args: &ResourcesArgs) -> Result<(), Box<dyn Error>> {
    let build_root = args.build_dir.as_path();
    let stacks = load_stacks(&args.template)?;
    let provider = SamProvider::new(&stacks)?;

    if let Some(name) = &args.name {
        return show_resource(&provider, name, build_root, args.json);
    }

    let mut to_build = provider.resources_to_build();
    if args.built {
        to_build.use_build_artifacts(build_root);
    }

    if args.json {
        let functions: Vec<_> = provider
            .functions()
            .map(|function| function_json(function, build_root))
            .collect();
        let layers: Vec<_> = provider
            .layers()
            .map(|layer| layer_json(layer, build_root))
            .collect();
        let build = json!({
            "functions": to_build.functions().iter().map(|f| f.full_path()).collect::<Vec<_>>(),
            "layers": to_build.layers(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "functions": functions,
                "layers": layers,
                "build": build,
            }))?
        );
        return Ok(());
    }

    println!("{}", style("Functions").bold());
    for function in provider.functions() {
        print_function(function, build_root);
    }

    println!("{}", style("Layers").bold());
    for layer in to_build.layers() {
        print_layer(layer, build_root);
    }

    println!(
        "{} function(s) and {} layer(s) to build",
        to_build.functions().len(),
        to_build.layers().len()
    );
    Ok(())
}

fn show_resource(
    provider: &SamProvider,
    name: &str,
    build_root: &Path,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if let Some(function) = provider.get_function(name) {
        if as_json {
            println!("{}", serde_json::to_string_pretty(&function_json(function, build_root))?);
        } else {
            print_function(function, build_root);
        }
        return Ok(());
    }
    if let Some(layer) = provider.get_layer(name) {
        if as_json {
            println!("{}", serde_json::to_string_pretty(&layer_json(layer, build_root))?);
        } else {
            print_layer(layer, build_root);
        }
        return Ok(());
    }
    Err(format!("No function or layer named {}", name).into())
}

fn function_json(function: &Function, build_root: &Path) -> Value {
    json!({
        "full_path": function.full_path(),
        "function_name": function.function_name,
        "runtime": function.runtime,
        "handler": function.handler,
        "build_method": function.build_method(),
        "build_dir": function.codeuri.as_ref().map(|_| function.build_dir(build_root)),
        "layers": function.layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
    })
}

fn layer_json(layer: &LayerVersion, build_root: &Path) -> Value {
    json!({
        "full_path": layer.full_path(),
        "layer": layer,
        "build_dir": layer.codeuri().map(|_| layer.build_dir(build_root)),
    })
}

fn print_function(function: &Function, build_root: &Path) {
    let target = match &function.codeuri {
        Some(_) => function.build_dir(build_root).display().to_string(),
        None => style("not built locally").dim().to_string(),
    };
    println!("  {} -> {}", style(function.full_path()).green(), target);
    for layer in &function.layers {
        println!("      layer {}", describe_layer(layer));
    }
}

fn print_layer(layer: &LayerVersion, build_root: &Path) {
    let Some(source) = layer.codeuri() else {
        println!(
            "  {} -> {}",
            style(layer.full_path()).green(),
            style("not built locally").dim()
        );
        return;
    };
    println!(
        "  {} ({}) -> {}",
        style(layer.full_path()).green(),
        source.display(),
        layer.build_dir(build_root).display()
    );
    if let Some(build_method) = layer.build_method() {
        println!("      build method {}", build_method);
    }
    if !layer.compatible_runtimes().is_empty() {
        println!("      runtimes {}", layer.compatible_runtimes().join(", "));
    }
}

fn describe_layer(layer: &LayerVersion) -> String {
    if layer.is_defined_within_template() {
        return format!("{} (defined in template)", layer.name());
    }
    match (layer.layer_arn(), layer.version()) {
        (Some(layer_arn), Some(version)) => {
            format!("{} ({} version {})", layer.name(), layer_arn, version)
        }
        _ => format!("{} ({})", layer.name(), layer.arn()),
    }
}

fn print_cicd(context: &Context) {
    match context.cicd {
        Some(platform) => println!("{}", platform),
        None => println!("none"),
    }
}

async fn bootstrap(context: &Context, args: BootstrapArgs) -> Result<(), Box<dyn Error>> {
    if let Some(platform) = context.cicd {
        log::warn!(
            "running inside {}, the guided bootstrap needs an interactive terminal",
            platform
        );
    }

    let default_region = default_region().await;
    let mut guided = GuidedContext {
        stage_name: args.stage,
        pipeline_user_arn: args.pipeline_user,
        pipeline_execution_role_arn: args.pipeline_execution_role,
        cloudformation_execution_role_arn: args.cloudformation_execution_role,
        artifacts_bucket_arn: args.bucket,
        create_image_repository: false,
        image_repository_arn: args.image_repository,
        pipeline_ip_range: args.pipeline_ip_range,
        region: args.region,
    };

    let mut prompter = TermPrompter::new();
    match guided.run(&mut prompter, &args.account_id, &default_region)? {
        GuidedOutcome::Completed => println!("{}", serde_json::to_string_pretty(&guided)?),
        GuidedOutcome::SwitchAccount => log::info!("bootstrap cancelled to switch accounts"),
    }
    Ok(())
}

/// Region from the AWS provider chain (env, profile, IMDS), or us-east-1.
async fn default_region() -> String {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    config
        .region()
        .map(|region| region.to_string())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_show_resource_unknown_name() {
        let provider = SamProvider::default();
        assert!(show_resource(&provider, "Nope", Path::new("build"), false).is_err());
    }

    #[test]
    fn test_show_resource_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("layer")).unwrap();
        fs::write(
            dir.path().join("template.yaml"),
            r#"
Resources:
  Deps:
    Type: AWS::Serverless::LayerVersion
    Properties:
      ContentUri: layer
      CompatibleRuntimes: [python3.12]
    Metadata:
      BuildMethod: python3.12
  Hello:
    Type: AWS::Serverless::Function
    Properties:
      CodeUri: layer
      Layers: [!Ref Deps]
"#,
        )
        .unwrap();
        let stacks = load_stacks(&dir.path().join("template.yaml")).unwrap();
        let provider = SamProvider::new(&stacks).unwrap();

        assert!(show_resource(&provider, "Hello", Path::new("build"), true).is_ok());
        assert!(show_resource(&provider, "Deps", Path::new("build"), false).is_ok());
    }

    #[test]
    fn test_layer_json_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let local = LayerVersion::from_template("Deps", Some(dir.path().to_path_buf())).unwrap();
        let remote = LayerVersion::from_template("Remote", None).unwrap();

        assert_eq!(
            layer_json(&local, Path::new("build"))["build_dir"],
            json!(Path::new("build").join("Deps"))
        );
        assert_eq!(layer_json(&remote, Path::new("build"))["build_dir"], Value::Null);
    }

    #[test]
    fn test_describe_layer() {
        let layer = LayerVersion::new(
            &json!("arn:aws:lambda:us-east-1:123456789012:layer:shared:007"),
            None,
        )
        .unwrap();
        assert!(describe_layer(&layer)
            .ends_with("(arn:aws:lambda:us-east-1:123456789012:layer:shared version 007)"));
    }
}
