use super::prompt::Prompter;
use crate::errors::Result;
use serde::Serialize;

const CONFIG_AWS_CRED_DOC_URL: &str = "https://docs.aws.amazon.com/serverless-application-model/latest/developerguide/serverless-getting-started-set-up-credentials.html";

const INTRO: &str = "\
SAM Pipeline Bootstrap generates the necessary AWS resources to connect your
CI/CD pipeline tool. We will ask for [1] account details, [2] stage definition,
and [3] references to existing resources in order to bootstrap these pipeline
resources. You can also add optional security parameters.";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum GuidedOutcome {
    Completed,
    /// The user wants to bootstrap a different account and has to reconfigure credentials first.
    SwitchAccount,
}

/// Answers needed to bootstrap the infrastructure of one pipeline stage. An
/// empty ARN means "create it for me".
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub(crate) struct GuidedContext {
    pub(crate) stage_name: Option<String>,
    pub(crate) pipeline_user_arn: Option<String>,
    pub(crate) pipeline_execution_role_arn: Option<String>,
    pub(crate) cloudformation_execution_role_arn: Option<String>,
    pub(crate) artifacts_bucket_arn: Option<String>,
    pub(crate) create_image_repository: bool,
    pub(crate) image_repository_arn: Option<String>,
    pub(crate) pipeline_ip_range: Option<String>,
    pub(crate) region: Option<String>,
}

fn provided(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl GuidedContext {
    /// Asks for everything that was not given up front. Values already set are
    /// shown, never asked for again.
    pub(crate) fn run(
        &mut self,
        prompter: &mut dyn Prompter,
        account_id: &str,
        default_region: &str,
    ) -> Result<GuidedOutcome> {
        prompter.intro(INTRO)?;

        prompter.heading("[1] Account details")?;
        if prompter.confirm(&format!(
            "You are bootstrapping resources in Account {}. Do you want to switch accounts?",
            account_id
        ))? {
            prompter.echo(&format!(
                "Please refer to this page about configuring credentials: {}.",
                CONFIG_AWS_CRED_DOC_URL
            ))?;
            return Ok(GuidedOutcome::SwitchAccount);
        }

        prompter.heading("[2] Stage definition")?;
        if let Some(stage_name) = provided(&self.stage_name) {
            prompter.echo(&format!("Stage name: {}", stage_name))?;
        } else {
            prompter.echo(
                "Enter a name for the stage you want to bootstrap. This will be referenced later \
                 when generating a Pipeline Config File with Pipeline Init.",
            )?;
            self.stage_name = Some(prompter.input("Stage name", None)?);
        }

        if provided(&self.region).is_none() {
            self.region = Some(prompter.input(
                "Enter the region you want these resources to create",
                Some(default_region),
            )?);
        }

        prompter.heading("[3] Reference existing resources")?;
        ask_unless_provided(
            prompter,
            &mut self.pipeline_user_arn,
            "Pipeline IAM User ARN",
            "Enter the Pipeline IAM User ARN if you have previously created one, or we will create one for you",
        )?;
        ask_unless_provided(
            prompter,
            &mut self.pipeline_execution_role_arn,
            "Pipeline execution role ARN",
            "Enter the Pipeline execution role ARN if you have previously created one, or we will create one for you",
        )?;
        ask_unless_provided(
            prompter,
            &mut self.cloudformation_execution_role_arn,
            "CloudFormation execution role ARN",
            "Enter the CloudFormation execution role ARN if you have previously created one, or we will create one for you",
        )?;
        ask_unless_provided(
            prompter,
            &mut self.artifacts_bucket_arn,
            "Artifacts bucket ARN",
            "Please enter the artifact bucket ARN for your Lambda function. If you do not have a bucket, we will create one for you",
        )?;

        if let Some(arn) = provided(&self.image_repository_arn) {
            prompter.echo(&format!("ECR image repository ARN: {}", arn))?;
            self.create_image_repository = false;
        } else if prompter.confirm("Does your application contain any IMAGE type Lambda functions?")? {
            let arn = prompter.input(
                "Please enter the ECR image repository ARN(s) for your IMAGE type function(s). \
                 If you do not yet have a repository, we will create one for you",
                Some(""),
            )?;
            self.create_image_repository = arn.is_empty();
            self.image_repository_arn = Some(arn);
        } else {
            self.create_image_repository = false;
        }

        prompter.heading("[4] Security definition - OPTIONAL")?;
        ask_unless_provided(
            prompter,
            &mut self.pipeline_ip_range,
            "Pipeline IP address range",
            "For added security, you can define the permitted Pipeline IP range. Enter the IP addresses to restrict access to",
        )?;

        Ok(GuidedOutcome::Completed)
    }
}

fn ask_unless_provided(
    prompter: &mut dyn Prompter,
    field: &mut Option<String>,
    label: &str,
    prompt: &str,
) -> Result<()> {
    if let Some(value) = provided(field) {
        prompter.echo(&format!("{}: {}", label, value))?;
    } else {
        *field = Some(prompter.input(prompt, Some(""))?);
    }
    Ok(())
}
