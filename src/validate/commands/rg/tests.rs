use super::*;

fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn rg_without_pre_is_accepted() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("rg foo ."), &config, &declared).is_ok());
}

#[test]
fn rg_pre_validates_preprocessor() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("rg --pre bash foo"), &config, &declared).is_err());
    assert!(validate(&words("rg --pre cat foo"), &config, &declared).is_ok());
}

#[test]
fn rg_pre_equals_form_is_parsed() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("rg --pre=cat foo"), &config, &declared).is_ok());
}
