// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case-insensitive regex prefilters for injection patterns.

use regex::Regex;
use std::sync::LazyLock;

static SQL_INJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(union\s+select|select\s+.*\s+from|insert\s+into|delete\s+from|drop\s+table|update\s+.*set|or\s+1\s*=\s*1)",
    )
    .expect("sql prefilter pattern is valid")
});

static COMMAND_INJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(rm\s+-rf|;\s*ls|\|\s*cat|;\s*shutdown|;\s*reboot|cat\s+/etc/passwd|\|\s*grep|`.*`|\$\(.*\))",
    )
    .expect("shell prefilter pattern is valid")
});

/// Whether the SQL-injection prefilter matches `query`.
pub fn matches_sql(query: &str) -> bool {
    SQL_INJECTION.is_match(query)
}

/// Whether the command-injection prefilter matches `query`.
pub fn matches_shell(query: &str) -> bool {
    COMMAND_INJECTION.is_match(query)
}
