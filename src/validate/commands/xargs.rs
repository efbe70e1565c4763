use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

const VALUE_CONSUMING_SHORT_FLAGS: &[&str] =
    &["-d", "-E", "-I", "-J", "-L", "-n", "-P", "-R", "-S", "-s"];

pub fn validate(
    words: &[String],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let mut i = 1;
    let mut options_ended = false;
    while i < words.len() {
        let word = &words[i];
        if !options_ended {
            if word == "--" {
                options_ended = true;
                i += 1;
                continue;
            }
            if VALUE_CONSUMING_SHORT_FLAGS.contains(&word.as_str()) {
                i += 2;
                continue;
            }
            if word.starts_with('-') {
                i += 1;
                continue;
            }
        }
        // First non-flag word: start of the embedded utility.
        let sub_command = words[i..].to_vec();
        return super::super::validate_word_sequence(&sub_command, config, declared_functions);
    }
    // No embedded command: xargs defaults to `echo`, which is always allowed.
    Ok(())
}

#[cfg(test)]
mod tests;
