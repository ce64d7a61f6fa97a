use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kinds of report the pipeline knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Surf,
    Sky,
    Weather,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Surf, ReportKind::Sky, ReportKind::Weather];

    /// Name used in output file names, e.g. `Surf_Report_...`
    #[must_use]
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ReportKind::Surf => "Surf",
            ReportKind::Sky => "Sky",
            ReportKind::Weather => "Weather",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "surf" => Ok(ReportKind::Surf),
            "sky" | "night" => Ok(ReportKind::Sky),
            "weather" => Ok(ReportKind::Weather),
            other => Err(format!("Unknown report type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("surf".parse::<ReportKind>(), Ok(ReportKind::Surf));
        assert_eq!(" Night ".parse::<ReportKind>(), Ok(ReportKind::Sky));
        assert_eq!("SKY".parse::<ReportKind>(), Ok(ReportKind::Sky));
        assert_eq!("weather".parse::<ReportKind>(), Ok(ReportKind::Weather));
        assert!("tide".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_display_matches_file_prefix() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.to_string(), kind.file_prefix());
        }
    }
}
