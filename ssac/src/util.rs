use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum PathOrStd {
    Path(PathBuf),
    StdStream,
}

impl From<&std::ffi::OsStr> for PathOrStd {
    fn from(value: &std::ffi::OsStr) -> Self {
        if value == "-" {
            Self::StdStream
        } else {
            Self::Path(value.into())
        }
    }
}

impl PathOrStd {
    /// The name of the file in diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            PathOrStd::Path(path) => path.file_name().map_or_else(
                || path.display().to_string(),
                |name| name.to_string_lossy().into_owned(),
            ),
            PathOrStd::StdStream => "stdin stream".to_owned(),
        }
    }
}
