// ============================================================
// LIBRARY CODE ENUM
// ============================================================
// The fixed set of branch libraries a loan can originate from

use serde::{Deserialize, Serialize};

/// Branch library that registered a circulation transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LibraryCode {
    Cen,
    Cu,
    Dmnc,
    Iada,
    Icb,
    Icsa,
    Iit,
}

impl LibraryCode {
    pub const ALL: [LibraryCode; 7] = [
        LibraryCode::Cen,
        LibraryCode::Cu,
        LibraryCode::Dmnc,
        LibraryCode::Iada,
        LibraryCode::Icb,
        LibraryCode::Icsa,
        LibraryCode::Iit,
    ];

    /// Canonical upper-case code
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryCode::Cen => "CEN",
            LibraryCode::Cu => "CU",
            LibraryCode::Dmnc => "DMNC",
            LibraryCode::Iada => "IADA",
            LibraryCode::Icb => "ICB",
            LibraryCode::Icsa => "ICSA",
            LibraryCode::Iit => "IIT",
        }
    }

    /// Exact match against an already upper-cased, trimmed code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|library| library.as_str() == code)
    }
}

impl std::fmt::Display for LibraryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
