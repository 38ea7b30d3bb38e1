use chrono::{DateTime, FixedOffset};
use std::fmt;

/// One stanza of a Debian `changelog`.
#[derive(Debug, Clone)]
pub struct Changelog {
    pub package: String,
    pub version: String,
    pub distribution: String,
    pub urgency: String,
    pub changes: Vec<String>,
    pub maintainer: String,
    pub date: DateTime<FixedOffset>,
}

impl Changelog {
    pub fn new<S: Into<String>>(
        package: S,
        version: S,
        maintainer: S,
        date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            distribution: "unstable".to_owned(),
            urgency: "medium".to_owned(),
            changes: Vec::new(),
            maintainer: maintainer.into(),
            date,
        }
    }

    pub fn distribution<S: Into<String>>(mut self, distribution: S) -> Self {
        self.distribution = distribution.into();
        self
    }

    pub fn urgency<S: Into<String>>(mut self, urgency: S) -> Self {
        self.urgency = urgency.into();
        self
    }

    pub fn change<S: Into<String>>(mut self, change: S) -> Self {
        self.changes.push(change.into());
        self
    }
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}) {}; urgency={}",
            self.package, self.version, self.distribution, self.urgency
        )?;
        writeln!(f)?;
        for change in &self.changes {
            writeln!(f, "  * {}", change)?;
        }
        writeln!(f)?;
        writeln!(f, " -- {}  {}", self.maintainer, self.date.to_rfc2822())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changelog_stanza() {
        let date = DateTime::parse_from_rfc3339("2023-11-14T22:13:20+00:00").unwrap();
        let changelog = Changelog::new("foo", "1.0-1", "Jane <jane@example.com>", date)
            .urgency("low")
            .change("Initial release.")
            .change("Fix the frobnicator.");
        assert_eq!(
            changelog.to_string(),
            "foo (1.0-1) unstable; urgency=low\n\
             \n  * Initial release.\n  * Fix the frobnicator.\n\
             \n -- Jane <jane@example.com>  Tue, 14 Nov 2023 22:13:20 +0000\n"
        );
    }
}
