use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orca_shader::{
    validate, RulePipeline, ShaderReflection, ShaderStage, ShaderTarget, ShaderTranspiler,
    ToolchainConfig, TranspilationResult,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "orca-shaderc")]
#[command(about = "Transpile GLSL shaders to HLSL, Vulkan SPIR-V or Metal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Vulkan SDK install root (overrides VULKAN_SDK).
    #[arg(long, global = true, value_name = "DIR")]
    sdk: Option<PathBuf>,

    /// Keep the per-call scratch directories with the intermediate files.
    #[arg(long, global = true)]
    keep_artifacts: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Transpile a single shader stage.
    Stage {
        input: PathBuf,

        /// glsl, hlsl, vulkan (spirv) or metal (msl).
        #[arg(long)]
        target: ShaderTarget,

        /// vertex or fragment.
        #[arg(long)]
        stage: ShaderStage,

        /// Output path (defaults to stdout). Vulkan modules are written as little-endian SPIR-V.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Transpile a vertex + fragment pair into one combined listing.
    Program {
        #[arg(long, value_name = "PATH")]
        vertex: PathBuf,

        #[arg(long, value_name = "PATH")]
        fragment: PathBuf,

        #[arg(long)]
        target: ShaderTarget,

        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Print uniform and vertex attribute metadata as JSON.
    Reflect { input: PathBuf },
    /// Print the rewrite-rule output without running any external tools.
    Rewrite {
        input: PathBuf,

        #[arg(long)]
        target: ShaderTarget,

        #[arg(long)]
        stage: ShaderStage,
    },
}

fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut toolchain = ToolchainConfig::from_env();
    if let Some(sdk) = cli.sdk {
        toolchain = toolchain.with_sdk_root(sdk);
    }
    if cli.keep_artifacts {
        toolchain = toolchain.with_keep_artifacts(true);
    }
    let transpiler = ShaderTranspiler::new(toolchain);

    match cli.command {
        Commands::Stage {
            input,
            target,
            stage,
            output,
        } => {
            let source = read_shader(&input)?;
            let result = transpiler.transpile(&source, target, stage);
            emit(&result, target, output.as_deref())
        }
        Commands::Program {
            vertex,
            fragment,
            target,
            output,
        } => {
            let vertex = read_shader(&vertex)?;
            let fragment = read_shader(&fragment)?;
            let result = transpiler.transpile_program(&vertex, &fragment, target);
            emit(&result, target, output.as_deref())
        }
        Commands::Reflect { input } => {
            let source = read_shader(&input)?;
            let reflection = ShaderReflection::from_source(&source)
                .with_context(|| format!("reflect {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&reflection)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Rewrite {
            input,
            target,
            stage,
        } => {
            let source = read_shader(&input)?;
            validate(&source).with_context(|| format!("validate {}", input.display()))?;
            print!("{}", RulePipeline::new(target, stage).run(&source));
            io::stdout().flush()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_shader(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn emit(
    result: &TranspilationResult,
    target: ShaderTarget,
    output: Option<&Path>,
) -> Result<ExitCode> {
    if !result.success {
        eprintln!("error: {}", result.error_message);
        return Ok(ExitCode::FAILURE);
    }
    if !result.is_usable() {
        eprintln!("warning: {}", result.error_message);
        return Ok(ExitCode::SUCCESS);
    }
    if !result.error_message.is_empty() {
        eprintln!("note: {}", result.error_message);
    }

    match output {
        Some(path) if target.produces_binary() && !result.binary.is_empty() => {
            let bytes: Vec<u8> = result.binary.iter().flat_map(|w| w.to_le_bytes()).collect();
            fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
        }
        Some(path) => {
            fs::write(path, &result.output)
                .with_context(|| format!("write {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(result.output.as_bytes())?;
            if !result.output.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
