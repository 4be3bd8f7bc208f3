use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::compiler::{BindingTarget, Language};

pub const GL_END_MARKER: &str = "end of GL functions";
pub const GL_EXT_END_MARKER: &str = "end of GL EXT functions";

/// One entry-point list scanned into the Function enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputPass {
    pub path: PathBuf,
    pub end_marker: String,
}

impl InputPass {
    pub fn new(path: impl Into<PathBuf>, end_marker: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            end_marker: end_marker.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub work_dir: PathBuf,
    pub passes: Vec<InputPass>,
    pub schema_path: PathBuf,
    pub compiler: String,
    pub cpp_out: PathBuf,
    pub java_out: PathBuf,
    pub compile: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            passes: vec![InputPass::new("gl2_api.in", GL_END_MARKER)],
            schema_path: PathBuf::from("DebuggerMessage.proto"),
            compiler: "aprotoc".into(),
            cpp_out: PathBuf::from("src"),
            java_out: PathBuf::from("client/src"),
            compile: true,
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to the defaults
    /// for every unset key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let work_dir = lookup("PROTOGEN_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        let mut passes = defaults.passes;
        if let Some(api_input) = lookup("PROTOGEN_API_INPUT") {
            if let Some(base) = passes.first_mut() {
                base.path = PathBuf::from(api_input);
            }
        }
        if let Some(ext_input) = lookup("PROTOGEN_EXT_API_INPUT") {
            passes.push(InputPass::new(ext_input, GL_EXT_END_MARKER));
        }

        let schema_path = lookup("PROTOGEN_SCHEMA_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or(defaults.schema_path);
        let compiler = lookup("PROTOGEN_COMPILER").unwrap_or(defaults.compiler);
        let cpp_out = lookup("PROTOGEN_CPP_OUT")
            .map(PathBuf::from)
            .unwrap_or(defaults.cpp_out);
        let java_out = lookup("PROTOGEN_JAVA_OUT")
            .map(PathBuf::from)
            .unwrap_or(defaults.java_out);

        let skip_compile = match lookup("PROTOGEN_SKIP_COMPILE") {
            Some(raw) => parse_flag(&raw).context("invalid PROTOGEN_SKIP_COMPILE")?,
            None => false,
        };

        Ok(Self {
            work_dir,
            passes,
            schema_path,
            compiler,
            cpp_out,
            java_out,
            compile: !skip_compile,
        })
    }

    /// Same configuration, rooted at `work_dir`.
    pub fn in_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.work_dir.join(path)
    }

    pub fn targets(&self) -> Vec<BindingTarget> {
        vec![
            BindingTarget::new(Language::Cpp, self.cpp_out.clone()),
            BindingTarget::new(Language::Java, self.java_out.clone()),
        ]
    }

    /// The C++ source the compiler emits, and the name the build expects it under.
    ///
    /// protoc mirrors the schema's path relative to the work dir inside the
    /// output directory, so `proto/X.proto` lands at `<cpp_out>/proto/X.pb.cc`.
    pub fn rename_pair(&self) -> (PathBuf, PathBuf) {
        let relative = if self.schema_path.is_absolute() {
            self.schema_path
                .strip_prefix(&self.work_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| {
                    self.schema_path
                        .file_name()
                        .map(PathBuf::from)
                        .unwrap_or_default()
                })
        } else {
            self.schema_path.clone()
        };
        let cpp_dir = self.resolve(&self.cpp_out);
        (
            cpp_dir.join(relative.with_extension("pb.cc")),
            cpp_dir.join(relative.with_extension("pb.cpp")),
        )
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got `{}`", other),
    }
}
