use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

pub fn validate(
    words: &[String],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let mut i = 1;
    while i < words.len() {
        let word = &words[i];
        if let Some(value) = word.strip_prefix("--pre=") {
            return super::super::validate_word_sequence(
                &[value.to_string()],
                config,
                declared_functions,
            );
        }
        if word == "--pre" {
            let Some(preprocessor) = words.get(i + 1) else {
                return Err(SandboxError::validation(
                    "rg",
                    word.clone(),
                    "--pre requires a preprocessor command",
                ));
            };
            return super::super::validate_word_sequence(
                &[preprocessor.clone()],
                config,
                declared_functions,
            );
        }
        i += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
