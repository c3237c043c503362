//! Prefix remapping from local watch paths to remote path names.
//!
//! Each watch root registers one rule. A changed path is rewritten by the
//! first rule whose local prefix it starts with, so the remote side sees the
//! name it uses for the same file.
//!
//! Paths stay `OsStr` all the way through. Names that are not valid UTF-8
//! keep their raw bytes and are only converted when a batch goes on the wire.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A single `(local_prefix, remote_prefix)` rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
    /// Canonical absolute path of the watch root.
    pub local_prefix: PathBuf,
    /// Replacement prefix understood by the remote peer.
    pub remote_prefix: PathBuf,
}

impl PrefixRule {
    pub fn new(local_prefix: impl Into<PathBuf>, remote_prefix: impl Into<PathBuf>) -> Self {
        Self {
            local_prefix: local_prefix.into(),
            remote_prefix: remote_prefix.into(),
        }
    }
}

/// Ordered list of prefix rules. First match wins.
#[derive(Debug, Clone, Default)]
pub struct PrefixMap {
    rules: Vec<PrefixRule>,
}

impl PrefixMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Rules are matched in insertion order.
    pub fn push(&mut self, rule: PrefixRule) {
        self.rules.push(rule);
    }

    /// Rewrite `path` with the first rule whose local prefix it starts with.
    ///
    /// Matching is a literal prefix test on the raw path bytes, not a
    /// component-wise one. Paths no rule matches are returned unchanged.
    pub fn remap(&self, path: &Path) -> PathBuf {
        let raw = path.as_os_str();
        for rule in &self.rules {
            if let Some(suffix) = strip_literal_prefix(raw, rule.local_prefix.as_os_str()) {
                let mut out = rule.remote_prefix.clone().into_os_string();
                out.push(suffix);
                return PathBuf::from(out);
            }
        }

        path.to_path_buf()
    }

    /// Registered rules in match order.
    pub fn rules(&self) -> &[PrefixRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<PrefixRule> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = PrefixRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(unix)]
fn strip_literal_prefix<'a>(path: &'a OsStr, prefix: &OsStr) -> Option<&'a OsStr> {
    use std::os::unix::ffi::OsStrExt;

    path.as_bytes()
        .strip_prefix(prefix.as_bytes())
        .map(OsStr::from_bytes)
}

// Without raw byte access only Unicode names can be split. Anything else
// passes through unmapped but keeps its own identity.
#[cfg(not(unix))]
fn strip_literal_prefix<'a>(path: &'a OsStr, prefix: &OsStr) -> Option<&'a OsStr> {
    path.to_str()?.strip_prefix(prefix.to_str()?).map(OsStr::new)
}
