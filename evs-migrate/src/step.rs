use std::fmt;

/// The seven migration steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStep {
    FetchVmInfo,
    Snapshot,
    Export,
    Upload,
    Import,
    WaitForImport,
    Verify,
}

impl MigrationStep {
    pub const ALL: [MigrationStep; 7] = [
        Self::FetchVmInfo,
        Self::Snapshot,
        Self::Export,
        Self::Upload,
        Self::Import,
        Self::WaitForImport,
        Self::Verify,
    ];

    /// 1-based position in [`ALL`](Self::ALL).
    pub fn ordinal(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FetchVmInfo => "vm-info",
            Self::Snapshot => "snapshot",
            Self::Export => "export",
            Self::Upload => "upload",
            Self::Import => "import",
            Self::WaitForImport => "wait-import",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {}/{} {}",
            self.ordinal(),
            Self::ALL.len(),
            self.label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_execution_order() {
        let ordinals: Vec<usize> = MigrationStep::ALL.iter().map(|s| s.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn display_includes_ordinal_and_label() {
        assert_eq!(MigrationStep::Export.to_string(), "step 3/7 export");
        assert_eq!(MigrationStep::Verify.to_string(), "step 7/7 verify");
    }
}
