use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

const TAR_DENIED_LONG_MODES: &[&str] = &[
    "--extract", "--create", "--append", "--update", "--delete", "--get",
];
const TAR_DENIED_SHORT_MODES: &[char] = &['x', 'c', 'r', 'u'];

pub fn validate_tar(
    words: &[String],
    _config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let mut has_list_mode = false;
    for (i, word) in words[1..].iter().enumerate() {
        if word == "-t" || word == "t" || word == "--list" {
            has_list_mode = true;
        }
        if TAR_DENIED_LONG_MODES.contains(&word.as_str()) {
            return Err(SandboxError::validation(
                "tar",
                word.clone(),
                "only list mode (-t/--list) is permitted",
            ));
        }
        if word.starts_with('-') && !word.starts_with("--") {
            if word[1..].chars().any(|c| TAR_DENIED_SHORT_MODES.contains(&c)) {
                return Err(SandboxError::validation(
                    "tar",
                    word.clone(),
                    "only list mode (-t/--list) is permitted",
                ));
            }
            if word[1..].contains('t') {
                has_list_mode = true;
            }
        } else if i == 0 && !word.starts_with('-') {
            // Old-style tar syntax (`tar xf archive.tar`) packs the mode
            // letter into the first word with no leading dash. Only that
            // position is a candidate mode string — later non-flag words are
            // plain filenames (e.g. `archive.tar` contains both `r` and `c`)
            // and must not be scanned for mode letters.
            if word.chars().any(|c| TAR_DENIED_SHORT_MODES.contains(&c)) {
                return Err(SandboxError::validation(
                    "tar",
                    word.clone(),
                    "only list mode (-t/--list) is permitted",
                ));
            }
            if word.contains('t') {
                has_list_mode = true;
            }
        }
    }
    if !has_list_mode {
        return Err(SandboxError::validation(
            "tar",
            words.join(" "),
            "tar must be invoked in list mode",
        ));
    }
    Ok(())
}

pub fn validate_unzip(
    words: &[String],
    _config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let has_inspect_mode = words[1..].iter().any(|word| {
        word == "-l" || word == "-Z" || word == "-t" || (word.starts_with('-') && !word.starts_with("--") && {
            let flags = &word[1..];
            flags.contains('l') || flags.contains('Z') || flags.contains('t')
        })
    });
    if !has_inspect_mode {
        return Err(SandboxError::validation(
            "unzip",
            words.join(" "),
            "unzip must be invoked with -l, -Z, or -t",
        ));
    }
    Ok(())
}

pub fn validate_ar(
    words: &[String],
    _config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let Some(op_word) = words.get(1) else {
        return Err(SandboxError::validation(
            "ar",
            words.join(" "),
            "ar requires an operation letter",
        ));
    };
    let ops = op_word.trim_start_matches('-');
    for denied in ['r', 'd', 'q', 'x', 'm', 's'] {
        if ops.contains(denied) {
            return Err(SandboxError::validation(
                "ar",
                op_word.clone(),
                "this ar operation can mutate the archive",
            ));
        }
    }
    if !ops.contains('t') && !ops.contains('p') {
        return Err(SandboxError::validation(
            "ar",
            op_word.clone(),
            "ar must include t (list) or p (print)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
