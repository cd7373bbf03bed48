use serde::{Deserialize, Serialize};

/// Engine options threaded through resolve/extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Maximum number of diagnostics accumulated before a merge aborts.
    #[serde(default = "default_diagnostic_capacity")]
    pub diagnostic_capacity: usize,

    /// Assign a fresh UID to members created during resolve (interface
    /// expansion, promoted deferred members). Disabled in tests that need
    /// byte-stable output.
    #[serde(default = "default_assign_uids")]
    pub assign_uids: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            diagnostic_capacity: default_diagnostic_capacity(),
            assign_uids: default_assign_uids(),
        }
    }
}

fn default_diagnostic_capacity() -> usize {
    1_000
}

fn default_assign_uids() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let opts: EngineOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.diagnostic_capacity, 1_000);
        assert!(opts.assign_uids);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let opts: EngineOptions =
            serde_json::from_str(r#"{"diagnostic_capacity": 5, "assign_uids": false}"#).unwrap();
        assert_eq!(opts.diagnostic_capacity, 5);
        assert!(!opts.assign_uids);
    }
}
