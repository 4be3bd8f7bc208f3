// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// This module drives a generation run: precondition checks, extraction, schema write, compile, rename.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::compiler::{CompileError, SchemaCompiler};
use crate::config::GeneratorConfig;
use crate::domain::entry::ParseError;
use crate::domain::schema::{render_schema, FunctionEnum, FunctionTable, TableError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Preconditions,
    Extract,
    WriteSchema,
    Compile,
    Rename,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preconditions => "preconditions",
            Self::Extract => "extract",
            Self::WriteSchema => "write-schema",
            Self::Compile => "compile",
            Self::Rename => "rename",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },
    #[error("output directory missing: {}", path.display())]
    OutputDirMissing { path: PathBuf },
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("duplicate enum member `{name}` at {at} (first seen at {first})")]
    DuplicateEntry {
        name: String,
        at: String,
        first: String,
    },
    #[error("`{name}` at {at} is reserved for a control value")]
    ReservedName { name: String, at: String },
    #[error("failed to write schema {}", path.display())]
    WriteSchema {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("failed to rename {} to {}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GenerateError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::InputNotFound { .. } | Self::OutputDirMissing { .. } => Stage::Preconditions,
            Self::Read { .. }
            | Self::Parse { .. }
            | Self::DuplicateEntry { .. }
            | Self::ReservedName { .. } => Stage::Extract,
            Self::WriteSchema { .. } => Stage::WriteSchema,
            Self::Compile(_) => Stage::Compile,
            Self::Rename { .. } => Stage::Rename,
        }
    }

    fn from_table(path: PathBuf, err: TableError) -> Self {
        match err {
            TableError::Parse(source) => Self::Parse { path, source },
            TableError::Duplicate { name, at, first } => Self::DuplicateEntry { name, at, first },
            TableError::ReservedName { name, at } => Self::ReservedName { name, at },
        }
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationReport {
    pub functions: usize,
    pub control_start: u32,
    pub schema_path: PathBuf,
    /// Set when bindings were compiled and the C++ source renamed.
    pub renamed: Option<PathBuf>,
}

pub struct Generator<C> {
    cfg: GeneratorConfig,
    compiler: C,
}

impl<C: SchemaCompiler> Generator<C> {
    pub fn new(cfg: GeneratorConfig, compiler: C) -> Self {
        Self { cfg, compiler }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn run(&self) -> Result<GenerationReport, GenerateError> {
        self.check_preconditions()?;

        let functions = self.build_enum()?;
        let schema_path = self.cfg.resolve(&self.cfg.schema_path);
        write_schema(&schema_path, &render_schema(&functions))?;
        tracing::info!(
            path = %schema_path.display(),
            functions = functions.function_count(),
            control_start = functions.control_start(),
            "schema written"
        );

        let renamed = if self.cfg.compile {
            Some(self.compile_bindings()?)
        } else {
            tracing::info!("compilation disabled; skipping bindings");
            None
        };

        Ok(GenerationReport {
            functions: functions.function_count(),
            control_start: functions.control_start(),
            schema_path,
            renamed,
        })
    }

    /// Builds the Function enum from every configured pass without touching the disk.
    pub fn build_enum(&self) -> Result<FunctionEnum, GenerateError> {
        let mut table = FunctionTable::new();
        for pass in &self.cfg.passes {
            let path = self.cfg.resolve(&pass.path);
            let contents = fs::read_to_string(&path).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => GenerateError::InputNotFound { path: path.clone() },
                _ => GenerateError::Read {
                    path: path.clone(),
                    source,
                },
            })?;

            let origin = pass.path.display().to_string();
            let added = table
                .extend_pass(&origin, contents.lines(), &pass.end_marker)
                .map_err(|err| GenerateError::from_table(path.clone(), err))?;
            tracing::info!(input = %path.display(), entries = added, "scanned entry points");
        }
        Ok(table.finish())
    }

    fn check_preconditions(&self) -> Result<(), GenerateError> {
        for pass in &self.cfg.passes {
            let path = self.cfg.resolve(&pass.path);
            if !path.is_file() {
                return Err(GenerateError::InputNotFound { path });
            }
        }

        if self.cfg.compile {
            for target in self.cfg.targets() {
                let path = self.cfg.resolve(&target.out_dir);
                if !path.is_dir() {
                    return Err(GenerateError::OutputDirMissing { path });
                }
            }
        }

        Ok(())
    }

    fn compile_bindings(&self) -> Result<PathBuf, GenerateError> {
        let targets = self.cfg.targets();
        for target in &targets {
            tracing::info!(
                language = target.language.as_str(),
                out_dir = %target.out_dir.display(),
                "generating bindings"
            );
        }
        self.compiler
            .compile(&self.cfg.work_dir, &self.cfg.schema_path, &targets)?;

        let (from, to) = self.cfg.rename_pair();
        fs::rename(&from, &to).map_err(|source| GenerateError::Rename {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        tracing::info!(from = %from.display(), to = %to.display(), "renamed generated source");

        Ok(to)
    }
}

/// Writes and closes the schema so the compiler sees the complete file.
fn write_schema(path: &Path, document: &str) -> Result<(), GenerateError> {
    let wrap = |source: io::Error| GenerateError::WriteSchema {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(wrap)?;
    file.write_all(document.as_bytes()).map_err(wrap)?;
    file.sync_all().map_err(wrap)?;
    drop(file);
    Ok(())
}
