use std::fmt;

/// Contents of the `md5sums` control file.
#[derive(Debug, Clone, Default)]
pub struct Md5Sums {
    files: Vec<(String, String)>,
    total_size: u64,
}

impl Md5Sums {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `data` under `path`. A leading `./` or `/` is dropped, as
    /// dpkg expects paths relative to the root.
    pub fn add<S: AsRef<str>>(&mut self, path: S, data: &[u8]) {
        let path = path.as_ref();
        let path = path
            .strip_prefix("./")
            .unwrap_or(path)
            .trim_start_matches('/');
        self.files
            .push((format!("{:x}", md5::compute(data)), path.to_owned()));
        self.total_size += data.len() as u64;
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of the recorded file sizes in KiB, rounded up, for
    /// `Installed-Size`.
    pub fn installed_size(&self) -> u64 {
        self.total_size.div_ceil(1024)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Md5Sums {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (digest, path) in &self.files {
            writeln!(f, "{}  {}", digest, path)?;
        }
        Ok(())
    }
}
