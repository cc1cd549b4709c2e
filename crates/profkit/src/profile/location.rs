use std::panic;

/// A profiled call site
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Location {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Format as file:line
    pub fn as_file_line(&self) -> String {
        if self.line > 0 {
            format!("{}:{}", self.file, self.line)
        } else {
            self.file.clone()
        }
    }
}

/// Borrowed form of [`Location`] captured on the hot path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CallSite {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

impl CallSite {
    #[track_caller]
    pub fn caller(function: &'static str) -> Self {
        let caller = panic::Location::caller();
        CallSite {
            file: caller.file(),
            line: caller.line(),
            function,
        }
    }

    pub fn to_location(self) -> Location {
        Location::new(self.file, self.line, self.function)
    }
}

/// Simplify a file path - keep the part from `src/`, `benches/` or `tests/`
pub fn simplify_path(path: &str) -> String {
    if path.starts_with('[') {
        return path.to_string();
    }

    // Cargo dependencies: <crate>/file
    if path.contains("/.cargo/")
        && let Some(idx) = path.rfind("/src/")
    {
        let before_src = &path[..idx];
        if let Some(crate_start) = before_src.rfind('/') {
            let crate_name = &before_src[crate_start + 1..];
            return format!("<{}>/{}", crate_name, &path[idx + 5..]);
        }
    }

    for marker in ["src/", "benches/", "tests/"] {
        if path.starts_with(marker) {
            return path.to_string();
        }
        if let Some(idx) = path.find(&format!("/{marker}")) {
            return path[idx + 1..].to_string();
        }
    }

    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_path() {
        assert_eq!(
            simplify_path("/home/me/profkit/crates/profkit/src/workload.rs"),
            "src/workload.rs"
        );
        assert_eq!(simplify_path("crates/profkit/tests/heap.rs"), "tests/heap.rs");
        assert_eq!(simplify_path("src/main.rs"), "src/main.rs");
        assert_eq!(
            simplify_path("/home/me/.cargo/registry/src/index/sha2-0.10.8/src/core_api.rs"),
            "<sha2-0.10.8>/core_api.rs"
        );
        assert_eq!(simplify_path("[unknown]"), "[unknown]");
        assert_eq!(simplify_path("/tmp/lone.rs"), "lone.rs");
    }

    #[test]
    fn test_caller_captures_this_file() {
        let site = CallSite::caller("here");
        assert!(site.file.ends_with("location.rs"));
        assert!(site.line > 0);
        assert_eq!(site.to_location().function, "here");
    }

    #[test]
    fn test_as_file_line() {
        assert_eq!(Location::new("src/a.rs", 7, "f").as_file_line(), "src/a.rs:7");
        assert_eq!(Location::new("src/a.rs", 0, "f").as_file_line(), "src/a.rs");
    }
}
