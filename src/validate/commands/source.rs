use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

pub fn validate(
    words: &[String],
    _config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    if words.len() < 2 || words[1].is_empty() {
        return Err(SandboxError::validation(
            words[0].clone(),
            words[0].clone(),
            "source/. requires a path argument",
        ));
    }
    Ok(())
}
