//! Generic CMake configure invocation.

use std::path::{Path, PathBuf};

use crate::exec::CommandSpec;

/// Arguments for configuring a CMake project out of tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeInvocation {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Arguments in the order they are passed.
    pub args: Vec<String>,
}

impl CMakeInvocation {
    pub fn new(source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            args: Vec::new(),
        }
    }

    /// Append `-D<name>=<value>`.
    pub fn define(&mut self, name: &str, value: impl AsRef<str>) -> &mut Self {
        self.args.push(format!("-D{name}={}", value.as_ref()));
        self
    }

    /// Append `-D<name>=<path>`.
    pub fn define_path(&mut self, name: &str, value: &Path) -> &mut Self {
        self.define(name, value.display().to_string())
    }

    /// Append raw arguments.
    pub fn extend<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The configure command, run in the build directory.
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new("cmake")
            .args(self.args.iter().cloned())
            .arg(self.source_dir.display().to_string())
            .current_dir(&self.build_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_keep_insertion_order() {
        let mut cmake = CMakeInvocation::new("/src/llvm", "/build/llvm");
        cmake
            .define("CMAKE_TOOLCHAIN_FILE", "/build/llvm/tc.cmake")
            .define_path("CMAKE_INSTALL_PREFIX", Path::new("/sdk"))
            .extend(["-DFOO=ON"]);
        let cmd = cmake.command();
        assert_eq!(
            cmd.args,
            vec![
                "-DCMAKE_TOOLCHAIN_FILE=/build/llvm/tc.cmake",
                "-DCMAKE_INSTALL_PREFIX=/sdk",
                "-DFOO=ON",
                "/src/llvm",
            ]
        );
        assert_eq!(cmd.cwd.as_deref(), Some(Path::new("/build/llvm")));
    }
}
