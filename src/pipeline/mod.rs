//! `pipeline bootstrap`: collects the configuration of one pipeline stage.

mod guided;
mod prompt;

pub(crate) use guided::{GuidedContext, GuidedOutcome};
pub(crate) use prompt::TermPrompter;
