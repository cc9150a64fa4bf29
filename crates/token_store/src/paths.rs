use std::path::{Path, PathBuf};

pub const CREDENTIAL_DIR: [&str; 2] = [".chat", "token.json"];

/// Well-known credential location under a session root directory.
#[must_use]
pub fn credential_path(root: &Path) -> PathBuf {
    root.join(CREDENTIAL_DIR[0]).join(CREDENTIAL_DIR[1])
}
