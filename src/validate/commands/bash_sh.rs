use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

const DENIED_SHORT_CHARS: &[char] = &['i', 's', 'l'];
const DENIED_LONG_FLAGS: &[&str] = &["--interactive", "--init-file", "--rcfile", "--login"];

pub fn validate(
    words: &[String],
    _config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let name = &words[0];
    let mut i = 1;
    let mut has_dash_c = false;
    let mut has_positional = false;
    while i < words.len() {
        let word = &words[i];
        if word == "-c" {
            if i + 1 >= words.len() {
                return Err(SandboxError::validation(
                    name.clone(),
                    word.clone(),
                    "-c requires a following command string",
                ));
            }
            has_dash_c = true;
            i += 2;
            continue;
        }
        if word == "-o" {
            i += 2;
            continue;
        }
        if DENIED_LONG_FLAGS.contains(&word.as_str()) {
            return Err(SandboxError::validation(
                name.clone(),
                word.clone(),
                "this flag is always denied",
            ));
        }
        if word.starts_with('-') && !word.starts_with("--") && word.len() > 1 {
            if word[1..].chars().any(|c| DENIED_SHORT_CHARS.contains(&c)) {
                return Err(SandboxError::validation(
                    name.clone(),
                    word.clone(),
                    "this flag is always denied",
                ));
            }
            i += 1;
            continue;
        }
        if word.starts_with('-') {
            i += 1;
            continue;
        }
        has_positional = true;
        i += 1;
    }

    if !has_dash_c && !has_positional {
        return Err(SandboxError::validation(
            name.clone(),
            name.clone(),
            "bare bash/sh with no -c and no script file would read stdin",
        ));
    }
    Ok(())
}
