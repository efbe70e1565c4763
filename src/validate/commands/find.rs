use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

const DENIED_FLAGS: &[&str] = &["-delete", "-fls", "-fprint", "-fprint0", "-fprintf"];
const EXEC_FLAGS: &[&str] = &["-exec", "-execdir", "-ok", "-okdir"];

pub fn validate(
    words: &[String],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let mut i = 1;
    while i < words.len() {
        let word = &words[i];
        if DENIED_FLAGS.contains(&word.as_str()) {
            return Err(SandboxError::validation(
                "find",
                word.clone(),
                "this flag can mutate or exfiltrate files",
            ));
        }
        if EXEC_FLAGS.contains(&word.as_str()) {
            let mut sub_command = Vec::new();
            let mut j = i + 1;
            while j < words.len() {
                let candidate = &words[j];
                if candidate == ";" || candidate == "\\;" || candidate == "+" {
                    break;
                }
                sub_command.push(candidate.clone());
                j += 1;
            }
            if sub_command.is_empty() {
                return Err(SandboxError::validation(
                    "find",
                    word.clone(),
                    "no sub-command collected for exec-family flag",
                ));
            }
            super::super::validate_word_sequence(&sub_command, config, declared_functions)?;
            i = j + 1;
            continue;
        }
        i += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
