//! Detects whether the process runs inside a CI/CD system, and which one.
//!
//! The result is computed once by `main` from the process environment and
//! handed to whatever needs it.

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub(crate) type Environment = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub(crate) enum CicdPlatform {
    Jenkins,
    GitLab,
    GitHubAction,
    TravisCI,
    CircleCI,
    AWSCodeBuild,
    TeamCity,
    Bamboo,
    Buddy,
    CodeShip,
    Semaphore,
    Appveyor,
    /// Some CI system that only sets the generic `CI` variable
    Unknown,
}

impl fmt::Display for CicdPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a platform announces itself in the environment.
#[derive(Clone, Copy)]
pub(crate) enum DetectionRule {
    EnvVarPresent(&'static str),
    CustomPredicate(fn(&Environment) -> bool),
}

impl DetectionRule {
    pub(crate) fn matches(&self, env: &Environment) -> bool {
        match self {
            DetectionRule::EnvVarPresent(name) => env.contains_key(*name),
            DetectionRule::CustomPredicate(predicate) => predicate(env),
        }
    }
}

/// CodeShip sets `CI_NAME` to "CodeShip" or "codeship" depending on the setup.
fn is_codeship(env: &Environment) -> bool {
    env.get("CI_NAME")
        .map(|name| name.eq_ignore_ascii_case("codeship"))
        .unwrap_or(false)
}

lazy_static! {
    /// Checked in order, first match wins. `Unknown` must stay last.
    static ref DETECTION_RULES: Vec<(CicdPlatform, DetectionRule)> = vec![
        // https://www.jenkins.io/doc/book/pipeline/jenkinsfile/#using-environment-variables
        (CicdPlatform::Jenkins, DetectionRule::EnvVarPresent("JENKINS_URL")),
        // https://docs.gitlab.com/ee/ci/variables/predefined_variables.html
        (CicdPlatform::GitLab, DetectionRule::EnvVarPresent("GITLAB_CI")),
        // https://docs.github.com/en/actions/reference/environment-variables
        (CicdPlatform::GitHubAction, DetectionRule::EnvVarPresent("GITHUB_ACTION")),
        // https://docs.travis-ci.com/user/environment-variables/
        (CicdPlatform::TravisCI, DetectionRule::EnvVarPresent("TRAVIS")),
        // https://circleci.com/docs/2.0/env-vars/
        (CicdPlatform::CircleCI, DetectionRule::EnvVarPresent("CIRCLECI")),
        // https://docs.aws.amazon.com/codebuild/latest/userguide/build-env-ref-env-vars.html
        (CicdPlatform::AWSCodeBuild, DetectionRule::EnvVarPresent("CODEBUILD_BUILD_ID")),
        // https://www.jetbrains.com/help/teamcity/predefined-build-parameters.html
        // not CODEBUILD_BUILD_ID: that one belongs to AWSCodeBuild above
        (CicdPlatform::TeamCity, DetectionRule::EnvVarPresent("TEAMCITY_VERSION")),
        // https://confluence.atlassian.com/bamboo/bamboo-variables-289277087.html
        (CicdPlatform::Bamboo, DetectionRule::EnvVarPresent("bamboo_buildNumber")),
        // https://buddy.works/docs/pipelines/environment-variables
        (CicdPlatform::Buddy, DetectionRule::EnvVarPresent("BUDDY")),
        (CicdPlatform::CodeShip, DetectionRule::CustomPredicate(is_codeship)),
        // https://docs.semaphoreci.com/ci-cd-environment/environment-variables/
        (CicdPlatform::Semaphore, DetectionRule::EnvVarPresent("SEMAPHORE")),
        // https://www.appveyor.com/docs/environment-variables/
        (CicdPlatform::Appveyor, DetectionRule::EnvVarPresent("APPVEYOR")),
        (CicdPlatform::Unknown, DetectionRule::EnvVarPresent("CI")),
    ];
}

/// First platform whose rule matches `env`, `None` outside of CI.
pub(crate) fn detect(env: &Environment) -> Option<CicdPlatform> {
    DETECTION_RULES
        .iter()
        .find(|(_, rule)| rule.matches(env))
        .map(|(platform, _)| *platform)
}

/// Detects the platform from the current process environment.
pub(crate) fn detect_from_process() -> Option<CicdPlatform> {
    let env: Environment = std::env::vars().collect();
    detect(&env)
}
