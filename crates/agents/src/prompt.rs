use std::path::Path;

use tracing::{debug, warn};

pub const IDENTITY_FILE: &str = "IDENTITY.md";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Corphish, a personal AI assistant.";

/// System prompt from the first non-empty `IDENTITY.md` found in `dirs`.
///
/// Unreadable files are skipped with a warning.
pub fn load_system_prompt(dirs: &[&Path]) -> String {
    for dir in dirs {
        let path = dir.join(IDENTITY_FILE);
        if !path.is_file() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => {
                debug!(path = %path.display(), "loaded system prompt");
                return content.trim().to_string();
            },
            Ok(_) => debug!(path = %path.display(), "identity file is empty, skipping"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to read identity file"),
        }
    }
    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_when_no_identity_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_system_prompt(&[dir.path()]), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(load_system_prompt(&[]), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn first_non_empty_file_wins() {
        let empty = tempfile::tempdir().unwrap();
        std::fs::write(empty.path().join(IDENTITY_FILE), "  \n").unwrap();
        let first = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join(IDENTITY_FILE), "You are Crab.\n").unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join(IDENTITY_FILE), "You are Lobster.").unwrap();

        let prompt = load_system_prompt(&[empty.path(), first.path(), second.path()]);
        assert_eq!(prompt, "You are Crab.");
    }
}
