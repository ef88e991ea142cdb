//! Sequential, human-readable business codes.
//!
//! Every record kind has a fixed prefix followed by a six-digit,
//! zero-padded number derived from how many records of that kind already
//! exist. Counts 0 and 1 both produce `000001`; the first insert after the
//! table holds one row therefore collides and the probe loop moves on.

use anyhow::Result;

use crate::errors::TrackerError;

/// Upper bound on probes before giving up on a free code.
pub const MAX_CODE_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    User,
    Issue,
    Project,
}

impl CodeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "J",
            Self::Issue => "JI",
            Self::Project => "JP",
        }
    }

    /// Whether `code` has this kind's prefix followed by exactly six digits.
    pub fn matches(&self, code: &str) -> bool {
        code.strip_prefix(self.prefix())
            .is_some_and(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Build the code for a given record count.
pub fn sequential_code(kind: CodeKind, count: u64) -> String {
    format!("{}{:06}", kind.prefix(), count.max(1))
}

/// Starting from `count`, probe codes until `exists` reports a free one.
///
/// `exists` is usually a database lookup; its errors abort the loop.
pub fn generate_unique_code<F>(kind: CodeKind, count: u64, mut exists: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    let mut count = count;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = sequential_code(kind, count);
        if !exists(&code)? {
            return Ok(code);
        }
        count += 1;
    }
    Err(TrackerError::CodeSpaceExhausted {
        prefix: kind.prefix(),
        attempts: MAX_CODE_ATTEMPTS,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_count_zero_and_one_share_first_code() {
        assert_eq!(sequential_code(CodeKind::Issue, 0), "JI000001");
        assert_eq!(sequential_code(CodeKind::Issue, 1), "JI000001");
    }

    #[test]
    fn test_count_is_zero_padded() {
        assert_eq!(sequential_code(CodeKind::Project, 42), "JP000042");
        assert_eq!(sequential_code(CodeKind::User, 123456), "J123456");
    }

    #[test]
    fn test_count_past_six_digits_widens() {
        assert_eq!(sequential_code(CodeKind::User, 1_000_000), "J1000000");
    }

    #[test]
    fn test_unique_code_returns_first_probe_when_free() -> Result<()> {
        let code = generate_unique_code(CodeKind::Issue, 5, |_| Ok(false))?;
        assert_eq!(code, "JI000005");
        Ok(())
    }

    #[test]
    fn test_unique_code_skips_taken_codes() -> Result<()> {
        let taken: HashSet<&str> = ["JI000001", "JI000002", "JI000003"].into_iter().collect();
        let mut probes = 0;
        let code = generate_unique_code(CodeKind::Issue, 1, |c| {
            probes += 1;
            Ok(taken.contains(c))
        })?;
        assert_eq!(code, "JI000004");
        assert_eq!(probes, 4);
        Ok(())
    }

    #[test]
    fn test_second_record_moves_past_shared_first_code() -> Result<()> {
        // One row exists and it holds the code produced for count 0.
        let code = generate_unique_code(CodeKind::User, 1, |c| Ok(c == "J000001"))?;
        assert_eq!(code, "J000002");
        Ok(())
    }

    #[test]
    fn test_unique_code_propagates_lookup_errors() {
        let result = generate_unique_code(CodeKind::Project, 0, |_| anyhow::bail!("db down"));
        assert!(result.unwrap_err().to_string().contains("db down"));
    }

    #[test]
    fn test_unique_code_gives_up_after_max_attempts() {
        let err = generate_unique_code(CodeKind::Project, 0, |_| Ok(true)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::CodeSpaceExhausted { prefix: "JP", .. })
        ));
    }

    #[test]
    fn test_kind_matches_code_shape() {
        assert!(CodeKind::User.matches("J000123"));
        assert!(!CodeKind::User.matches("J12345"));
        assert!(!CodeKind::User.matches("JX00012"));
        assert!(CodeKind::Issue.matches("JI000001"));
        assert!(!CodeKind::Issue.matches("JP000001"));
    }
}
