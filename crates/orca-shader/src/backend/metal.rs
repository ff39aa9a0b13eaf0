use std::ffi::OsStr;

use tracing::warn;

use super::spirv::SpirvFinalizer;
use super::Finalizer;
use crate::error::TranspileError;
use crate::toolchain::{Tool, ToolchainConfig, INPUT_SPV, OUTPUT_METAL};
use crate::types::{ShaderStage, ShaderTarget, TranspilationResult};

/// MSL cross-compiled by `spirv-cross` from the module the Vulkan path produces.
///
/// Both steps share one scratch directory. Unlike the Vulkan target on its own, a failed SPIR-V
/// compile is a hard failure here: there is no module to cross-compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetalFinalizer;

impl MetalFinalizer {
    fn cross_compile(
        &self,
        source: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> Result<String, TranspileError> {
        let scratch = toolchain.scratch()?;
        SpirvFinalizer.compile_in(&scratch, source, stage, toolchain)?;

        let spv = scratch.file(INPUT_SPV);
        let metal = scratch.file(OUTPUT_METAL);
        toolchain.run_tool(
            Tool::SpirvCross,
            [
                OsStr::new("--msl"),
                spv.as_os_str(),
                OsStr::new("--output"),
                metal.as_os_str(),
            ],
        )?;
        scratch.read_to_string(OUTPUT_METAL)
    }
}

impl Finalizer for MetalFinalizer {
    fn target(&self) -> ShaderTarget {
        ShaderTarget::Metal
    }

    fn finalize(
        &self,
        source: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> TranspilationResult {
        match self.cross_compile(source, stage, toolchain) {
            Ok(msl) => TranspilationResult::with_advisory(
                msl,
                Vec::new(),
                "Metal transpilation succeeded",
            ),
            Err(err) => {
                warn!(%stage, error = %err, "Metal transpilation failed");
                TranspilationResult::failed(&err)
            }
        }
    }
}
