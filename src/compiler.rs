// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Schema compiler abstraction, decoupling binding generation from the external protoc binary.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    Cpp,
    Java,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::Java => "java",
        }
    }

    fn out_flag(&self) -> &'static str {
        match self {
            Self::Cpp => "--cpp_out",
            Self::Java => "--java_out",
        }
    }
}

/// One binding tree the compiler should emit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingTarget {
    pub language: Language,
    pub out_dir: PathBuf,
}

impl BindingTarget {
    pub fn new(language: Language, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            language,
            out_dir: out_dir.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("schema compiler `{program}` not found")]
    NotFound { program: String },
    #[error("failed to launch schema compiler `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("schema compiler `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

pub trait SchemaCompiler {
    /// Generates every target's bindings for `schema` in one invocation.
    /// Relative paths resolve against `work_dir`.
    fn compile(
        &self,
        work_dir: &Path,
        schema: &Path,
        targets: &[BindingTarget],
    ) -> Result<(), CompileError>;
}

/// Runs a protoc-compatible binary as a child process.
#[derive(Clone, Debug)]
pub struct ProtocCompiler {
    program: String,
}

impl ProtocCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, work_dir: &Path, schema: &Path, targets: &[BindingTarget]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(work_dir);
        for target in targets {
            cmd.arg(format!(
                "{}={}",
                target.language.out_flag(),
                target.out_dir.display()
            ));
        }
        cmd.arg(schema);
        cmd
    }
}

impl SchemaCompiler for ProtocCompiler {
    fn compile(
        &self,
        work_dir: &Path,
        schema: &Path,
        targets: &[BindingTarget],
    ) -> Result<(), CompileError> {
        let mut cmd = self.command(work_dir, schema, targets);
        tracing::debug!(program = %self.program, ?cmd, "invoking schema compiler");

        let output = cmd.output().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CompileError::NotFound {
                program: self.program.clone(),
            },
            _ => CompileError::Spawn {
                program: self.program.clone(),
                source,
            },
        })?;

        if !output.stderr.is_empty() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "schema compiler diagnostics"
            );
        }

        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Vec<BindingTarget> {
        vec![
            BindingTarget::new(Language::Cpp, "src"),
            BindingTarget::new(Language::Java, "client/src"),
        ]
    }

    #[test]
    fn command_lists_outputs_before_schema() {
        let compiler = ProtocCompiler::new("aprotoc");
        let cmd = compiler.command(
            Path::new("/work"),
            Path::new("DebuggerMessage.proto"),
            &targets(),
        );

        assert_eq!(cmd.get_program(), "aprotoc");
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/work")));
        let args: Vec<_> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["--cpp_out=src", "--java_out=client/src", "DebuggerMessage.proto"]
        );
    }

    #[test]
    fn missing_program_is_reported_as_not_found() {
        let compiler = ProtocCompiler::new("debugger-proto-gen-no-such-compiler");
        let err = compiler
            .compile(Path::new("."), Path::new("DebuggerMessage.proto"), &targets())
            .unwrap_err();
        assert!(matches!(err, CompileError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_failure() {
        let compiler = ProtocCompiler::new("false");
        let err = compiler
            .compile(Path::new("."), Path::new("DebuggerMessage.proto"), &targets())
            .unwrap_err();
        match err {
            CompileError::Failed { program, status, .. } => {
                assert_eq!(program, "false");
                assert!(!status.success());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
