// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// This binary loads configuration and telemetry, then regenerates DebuggerMessage.proto and its bindings.

use std::process::ExitCode;

use anyhow::Result;
use debugger_proto_gen::compiler::ProtocCompiler;
use debugger_proto_gen::config::GeneratorConfig;
use debugger_proto_gen::generator::Generator;
use debugger_proto_gen::telemetry;

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let cfg = GeneratorConfig::from_env()?;

    tracing::info!(
        work_dir = %cfg.work_dir.display(),
        passes = cfg.passes.len(),
        compiler = %cfg.compiler,
        "starting debugger-proto-gen"
    );

    let compiler = ProtocCompiler::new(cfg.compiler.clone());
    match Generator::new(cfg, compiler).run() {
        Ok(report) => {
            tracing::info!(
                functions = report.functions,
                control_start = report.control_start,
                schema = %report.schema_path.display(),
                renamed = ?report.renamed,
                "generation complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let stage = err.stage();
            let err = anyhow::Error::from(err);
            tracing::error!(%stage, error = %format!("{:#}", err), "generation failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
