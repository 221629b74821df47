/// Marks a rewritten ignore-list so a leftover one is recognisable.
pub const EPHEMERAL_HEADER: &str = "### Ephemeral modifications ###";

/// One entry of a narrowed ignore-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreRule {
  /// Exclude the whole context (`**`).
  IgnoreAll,
  /// Re-include a path (`!path`).
  Include(String),
  /// Exclude a path.
  Ignore(String),
  /// The ignore-list content that was in place before narrowing.
  Defaults,
}

/// An ordered list of ignore rules. Later rules override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
  rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ignore_all(mut self) -> Self {
    self.rules.push(IgnoreRule::IgnoreAll);
    self
  }

  pub fn include(mut self, path: impl Into<String>) -> Self {
    self.rules.push(IgnoreRule::Include(path.into()));
    self
  }

  pub fn ignore(mut self, path: impl Into<String>) -> Self {
    self.rules.push(IgnoreRule::Ignore(path.into()));
    self
  }

  pub fn defaults(mut self) -> Self {
    self.rules.push(IgnoreRule::Defaults);
    self
  }

  /// Append the patterns of a component's own `.dockerignore`, rooted at `prefix`.
  ///
  /// Blank lines and comments are dropped. Negations keep their `!`.
  pub fn component_patterns(mut self, prefix: &str, content: &str) -> Self {
    let prefix = prefix.trim_end_matches('/');
    for line in content.lines().map(str::trim) {
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let rule = match line.strip_prefix('!') {
        Some(pattern) => IgnoreRule::Include(format!("{prefix}/{}", pattern.trim_start_matches('/'))),
        None => IgnoreRule::Ignore(format!("{prefix}/{}", line.trim_start_matches('/'))),
      };
      self.rules.push(rule);
    }
    self
  }

  pub fn rules(&self) -> &[IgnoreRule] {
    &self.rules
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Render the ignore-list file content. `original` is what `Defaults` expands to.
  ///
  /// The original bytes are spliced in unchanged, whatever their encoding.
  pub fn render(&self, original: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(EPHEMERAL_HEADER.as_bytes());
    out.push(b'\n');
    for rule in &self.rules {
      match rule {
        IgnoreRule::IgnoreAll => out.extend_from_slice(b"**\n"),
        IgnoreRule::Include(path) => {
          out.push(b'!');
          out.extend_from_slice(path.as_bytes());
          out.push(b'\n');
        }
        IgnoreRule::Ignore(path) => {
          out.extend_from_slice(path.as_bytes());
          out.push(b'\n');
        }
        IgnoreRule::Defaults => {
          if let Some(original) = original {
            out.extend_from_slice(original);
            if original.last().is_some_and(|&b| b != b'\n') {
              out.push(b'\n');
            }
          }
        }
      }
    }
    out
  }
}
