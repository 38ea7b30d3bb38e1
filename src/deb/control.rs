use std::fmt;

/// A `Depends` entry. `version` renders as `name (>= version)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
}

impl Dependency {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn at_least<S: Into<String>, V: Into<String>>(name: S, version: V) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} (>= {})", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The `control` file of a binary package. `Display` renders it in
/// deb822 form.
#[derive(Debug, Clone, Default)]
pub struct ControlFile {
    pub package: String,
    pub version: String,
    pub architecture: String,
    pub maintainer: String,
    pub installed_size: Option<u64>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub homepage: Option<String>,
    pub depends: Vec<Dependency>,
    pub extra: Vec<(String, String)>,
    pub description: String,
}

impl ControlFile {
    pub fn new<S: Into<String>>(package: S, version: S, architecture: S, maintainer: S) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            architecture: architecture.into(),
            maintainer: maintainer.into(),
            ..Default::default()
        }
    }

    pub fn installed_size(mut self, kib: u64) -> Self {
        self.installed_size = Some(kib);
        self
    }

    pub fn section<S: Into<String>>(mut self, section: S) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn priority<S: Into<String>>(mut self, priority: S) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn homepage<S: Into<String>>(mut self, homepage: S) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    pub fn depends(mut self, dependency: Dependency) -> Self {
        self.depends.push(dependency);
        self
    }

    pub fn field<S: Into<String>>(mut self, name: S, value: S) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ControlFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Package: {}", self.package)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Architecture: {}", self.architecture)?;
        writeln!(f, "Maintainer: {}", self.maintainer)?;
        if let Some(size) = self.installed_size {
            writeln!(f, "Installed-Size: {}", size)?;
        }
        for (name, value) in [
            ("Section", &self.section),
            ("Priority", &self.priority),
            ("Homepage", &self.homepage),
        ] {
            if let Some(value) = value {
                writeln!(f, "{}: {}", name, value)?;
            }
        }
        if !self.depends.is_empty() {
            let depends: Vec<String> = self.depends.iter().map(ToString::to_string).collect();
            writeln!(f, "Depends: {}", depends.join(", "))?;
        }
        for (name, value) in &self.extra {
            writeln!(f, "{}: {}", name, value)?;
        }

        let mut lines = self.description.lines();
        writeln!(f, "Description: {}", lines.next().unwrap_or_default())?;
        for line in lines {
            if line.trim().is_empty() {
                writeln!(f, " .")?;
            } else {
                writeln!(f, " {}", line)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_control() {
        let control = ControlFile::new("foo", "1.0-1", "amd64", "Jane <jane@example.com>")
            .description("does foo");
        assert_eq!(
            control.to_string(),
            "Package: foo\n\
             Version: 1.0-1\n\
             Architecture: amd64\n\
             Maintainer: Jane <jane@example.com>\n\
             Description: does foo\n"
        );
    }

    #[test]
    fn test_full_control() {
        let control = ControlFile::new("foo", "1.0", "arm64", "me")
            .installed_size(12)
            .section("utils")
            .priority("optional")
            .homepage("https://example.com")
            .depends(Dependency::at_least("libc6", "2.34"))
            .depends(Dependency::new("bash"))
            .field("Multi-Arch", "foreign")
            .description("short\nlonger text\n\nsecond paragraph");

        let text = control.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Package: foo",
                "Version: 1.0",
                "Architecture: arm64",
                "Maintainer: me",
                "Installed-Size: 12",
                "Section: utils",
                "Priority: optional",
                "Homepage: https://example.com",
                "Depends: libc6 (>= 2.34), bash",
                "Multi-Arch: foreign",
                "Description: short",
                " longer text",
                " .",
                " second paragraph",
            ]
        );
        assert!(text.ends_with('\n'));
    }
}
