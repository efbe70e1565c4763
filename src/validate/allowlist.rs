//! Static policy data: the builtin command allowlist and the set of
//! environment variable names that may never be assigned by a validated
//! command. Kept as plain data, not logic, so policy changes never require
//! touching the walker.

use std::collections::HashSet;

/// Names permitted by default. Callers may union additional names in via
/// `PolicyConfig::extra_commands`, and declared functions are always
/// additionally permitted regardless of this set.
pub const BUILTIN_ALLOWLIST: &[&str] = &[
    // output/display
    "echo", "printf", "cat", "head", "tail", "less", "more", "wc", "column", "fold", "paste",
    "rev", "tac", "nl", "pr", "expand", "unexpand", "col", "colrm", "vis", "unvis", "fmt",
    // search
    "grep", "egrep", "fgrep", "rg", "find", "locate", "which", "whereis", "type", "look",
    // navigation
    "cd", "mkdir",
    // file info
    "ls", "stat", "file", "du", "df", "readlink", "realpath", "basename", "dirname", "pathchk",
    "pwd", "sha256sum", "sha1sum", "md5sum", "shasum", "cksum", "b2sum",
    // text processing
    "sort", "uniq", "cut", "tr", "diff", "comm", "join", "tsort", "strings", "od", "hexdump",
    "xxd", "iconv",
    // structured data
    "jq", "yq", "awk", "base64",
    // sourcing
    "source", ".",
    // builtins
    "test", "[", "true", "false", "read", "set", "unset", "export", "local", "declare",
    "typeset", "readonly", "shift", "getopts", "let", "expr",
    // process info
    "ps", "uptime", "uname", "hostname", "whoami", "id", "groups", "env", "printenv", "date",
    "cal",
    // math
    "bc", "dc", "seq", "factor", "numfmt", "uuidgen",
    // compressed readers
    "zcat", "zless", "zgrep", "bzcat", "xzcat",
    // archive inspection
    "tar", "unzip", "zipinfo", "ar",
    // VCS
    "git",
    // nested shell
    "bash", "sh",
    // config-gated runtimes
    "go", "pnpm", "cargo", "rustc", "aws",
    // scoped-write
    "cp", "mv", "rm", "touch", "chmod", "ln", "sed",
    // control flow
    "sleep", "wait", "trap", "return", "exit", "break", "continue", "timeout", "time", "yes",
    // introspection
    "command", "builtin", "hash", "help", "man", "info", "apropos",
    // pipe utilities
    "xargs",
];

/// Environment variable names that may never be assigned by a validated
/// command, whether as a leading call-expression assignment or as a
/// `declare`/`export`/`typeset` argument.
pub const BLOCKED_ASSIGNMENT_VARS: &[&str] = &[
    "PATH",
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "BASH_ENV",
    "ENV",
    "CDPATH",
    "PROMPT_COMMAND",
];

pub fn is_blocked_assignment(name: &str) -> bool {
    BLOCKED_ASSIGNMENT_VARS.contains(&name)
}

pub fn builtin_allowlist() -> HashSet<&'static str> {
    BUILTIN_ALLOWLIST.iter().copied().collect()
}
