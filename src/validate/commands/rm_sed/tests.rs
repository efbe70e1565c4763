use super::*;

fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn rm_denies_no_preserve_root() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate_rm(&words("rm -rf --no-preserve-root /"), &config, &declared).is_err());
    assert!(validate_rm(&words("rm -rf /tmp/x"), &config, &declared).is_ok());
}

#[test]
fn sed_denies_file_flag() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate_sed(&words("sed -f script.sed file.txt"), &config, &declared).is_err());
    assert!(validate_sed(&vec!["sed".to_string(), "--file=script.sed".to_string()], &config, &declared).is_err());
}

#[test]
fn sed_denies_eval_flag() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let words = vec!["sed".to_string(), "s/foo/bar/e".to_string()];
    assert!(validate_sed(&words, &config, &declared).is_err());
}

#[test]
fn sed_denies_write_command() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let words = vec!["sed".to_string(), "w /etc/passwd".to_string()];
    assert!(validate_sed(&words, &config, &declared).is_err());
}

#[test]
fn sed_accepts_plain_substitution() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let words = vec!["sed".to_string(), "s/foo/bar/g".to_string()];
    assert!(validate_sed(&words, &config, &declared).is_ok());
}
