//! Stable identifiers for findings, so the same condition keeps its id across runs.

/// Hash a finding's sprint, kind and subject into `fnd-<16 hex>`.
///
/// Uses blake3 for a fast, deterministic hash. Threshold values are left out
/// so a finding keeps its id while the underlying numbers move.
pub fn compute(sprint_id: &str, kind: &str, subject: Option<&str>) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(sprint_id.as_bytes());
  hasher.update(b"|");
  hasher.update(kind.as_bytes());
  if let Some(subject) = subject {
    hasher.update(b"|");
    hasher.update(subject.as_bytes());
  }
  let hex = hasher.finalize().to_hex();
  format!("fnd-{}", &hex[..16])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_input_same_id() {
    assert_eq!(
      compute("s1", "wip_violation", Some("alice")),
      compute("s1", "wip_violation", Some("alice"))
    );
  }

  #[test]
  fn subject_changes_id() {
    assert_ne!(
      compute("s1", "wip_violation", Some("alice")),
      compute("s1", "wip_violation", Some("bob"))
    );
    assert_ne!(
      compute("s1", "overloaded", None),
      compute("s2", "overloaded", None)
    );
  }

  #[test]
  fn id_shape() {
    let id = compute("s1", "healthy", None);
    assert!(id.starts_with("fnd-"));
    assert_eq!(id.len(), 20);
    assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
  }
}
