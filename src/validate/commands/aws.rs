use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

pub fn validate(
    _words: &[String],
    config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    if !config.aws.enabled() {
        return Err(SandboxError::validation(
            "aws",
            "aws".to_string(),
            "aws is disabled: set allow_raw_credentials or force_profile",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
