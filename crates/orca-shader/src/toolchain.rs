//! External shader tools from the Vulkan SDK and the scratch files they exchange.
//!
//! Tool locations are resolved from `VULKAN_SDK` at every invocation (unless pinned in
//! [`ToolchainConfig::sdk_root`]), falling back to a fixed default install path.
//!
//! Each transpilation gets its own scratch directory with fixed file names inside it, so
//! concurrent requests never share intermediate files. Tool invocations block until the process
//! exits; there is no timeout, retry or cancellation.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::TranspileError;

/// Env var naming the Vulkan SDK install root.
pub const SDK_ENV: &str = "VULKAN_SDK";
/// Env var overriding the parent directory of per-call scratch directories.
pub const SCRATCH_DIR_ENV: &str = "ORCA_SHADER_SCRATCH_DIR";
/// Env var that keeps scratch directories on disk after a call (for inspecting tool inputs).
pub const KEEP_ARTIFACTS_ENV: &str = "ORCA_KEEP_SHADER_ARTIFACTS";

#[cfg(windows)]
pub const DEFAULT_SDK_ROOT: &str = "C:/VulkanSDK/default";
#[cfg(not(windows))]
pub const DEFAULT_SDK_ROOT: &str = "/usr/local";

/// HLSL text handed to `dxc`.
pub const VALIDATE_HLSL: &str = "validate.hlsl";
/// `#version 450` GLSL handed to `glslang`.
pub const INPUT_GLSL: &str = "input.glsl";
/// SPIR-V module produced by `glslang`, consumed by `spirv-cross`.
pub const INPUT_SPV: &str = "input.spv";
/// MSL produced by `spirv-cross`.
pub const OUTPUT_METAL: &str = "output.metal";

const SCRATCH_PREFIX: &str = "orca-shader-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// DirectX shader compiler, used as an HLSL validator.
    Dxc,
    /// GLSL → SPIR-V compiler.
    Glslang,
    /// SPIR-V → MSL cross-compiler.
    SpirvCross,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Dxc => "dxc",
            Tool::Glslang => "glslang",
            Tool::SpirvCross => "spirv-cross",
        }
    }

    /// Location of the tool inside an SDK install root.
    pub fn path_in(self, sdk_root: &Path) -> PathBuf {
        let bin_dir = if cfg!(windows) { "Bin" } else { "bin" };
        sdk_root
            .join(bin_dir)
            .join(format!("{}{}", self.name(), std::env::consts::EXE_SUFFIX))
    }
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// SDK install root. `None` re-reads [`SDK_ENV`] on every tool invocation.
    pub sdk_root: Option<PathBuf>,
    /// Parent directory for scratch directories. `None` uses the system temp dir.
    pub scratch_root: Option<PathBuf>,
    /// Leave scratch directories on disk after the call instead of deleting them.
    pub keep_artifacts: bool,
}

impl ToolchainConfig {
    /// Config driven entirely by the environment. The SDK root stays unresolved so changes to
    /// `VULKAN_SDK` are picked up by later calls.
    pub fn from_env() -> Self {
        Self {
            sdk_root: None,
            scratch_root: env_path(SCRATCH_DIR_ENV),
            keep_artifacts: env_var_truthy(KEEP_ARTIFACTS_ENV),
        }
    }

    pub fn with_sdk_root(mut self, sdk_root: impl Into<PathBuf>) -> Self {
        self.sdk_root = Some(sdk_root.into());
        self
    }

    pub fn with_scratch_root(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(scratch_root.into());
        self
    }

    pub fn with_keep_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    pub fn resolve_sdk_root(&self) -> PathBuf {
        self.sdk_root
            .clone()
            .or_else(|| env_path(SDK_ENV))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SDK_ROOT))
    }

    pub fn tool_path(&self, tool: Tool) -> PathBuf {
        tool.path_in(&self.resolve_sdk_root())
    }

    /// Creates a fresh scratch directory for one transpilation.
    pub fn scratch(&self) -> Result<Scratch, TranspileError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root).map_err(|e| {
                    TranspileError::io(
                        format!("failed to create scratch root {}", root.display()),
                        e,
                    )
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| TranspileError::io("failed to create shader scratch directory", e))?;

        Ok(if self.keep_artifacts {
            let path = dir.keep();
            info!(path = %path.display(), "keeping shader scratch directory");
            Scratch::Kept(path)
        } else {
            Scratch::Temp(dir)
        })
    }

    /// Runs `tool` to completion. A non-zero exit is [`TranspileError::ExternalToolFailure`]; a
    /// tool that can't be spawned is [`TranspileError::ToolUnavailable`].
    pub fn run_tool<I, S>(&self, tool: Tool, args: I) -> Result<ToolOutput, TranspileError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = self.tool_path(tool);
        let args: Vec<OsString> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        debug!(tool = tool.name(), path = %path.display(), ?args, "invoking shader tool");

        let output = Command::new(&path)
            .args(&args)
            .output()
            .map_err(|source| TranspileError::ToolUnavailable {
                tool: tool.name(),
                path: path.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            return Ok(ToolOutput { stdout, stderr });
        }

        // glslang reports compile errors on stdout.
        let diagnostics = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        Err(TranspileError::ExternalToolFailure {
            tool: tool.name(),
            status: output.status.code(),
            stderr: diagnostics,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Per-call scratch directory. Deleted on drop unless artifacts are kept.
#[derive(Debug)]
pub enum Scratch {
    Temp(TempDir),
    Kept(PathBuf),
}

impl Scratch {
    pub fn path(&self) -> &Path {
        match self {
            Scratch::Temp(dir) => dir.path(),
            Scratch::Kept(path) => path,
        }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf, TranspileError> {
        let path = self.file(name);
        fs::write(&path, contents)
            .map_err(|e| TranspileError::io(format!("failed to write {}", path.display()), e))?;
        Ok(path)
    }

    pub fn read_to_string(&self, name: &str) -> Result<String, TranspileError> {
        let path = self.file(name);
        fs::read_to_string(&path)
            .map_err(|e| TranspileError::io(format!("failed to read {}", path.display()), e))
    }

    pub fn read_bytes(&self, name: &str) -> Result<Vec<u8>, TranspileError> {
        let path = self.file(name);
        fs::read(&path)
            .map_err(|e| TranspileError::io(format!("failed to read {}", path.display()), e))
    }
}
