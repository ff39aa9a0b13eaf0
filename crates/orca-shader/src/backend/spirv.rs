use std::ffi::OsStr;

use tracing::{debug, warn};

use super::{strip_version_directive, Finalizer};
use crate::error::TranspileError;
use crate::toolchain::{Scratch, Tool, ToolchainConfig, INPUT_GLSL, INPUT_SPV};
use crate::types::{ShaderStage, ShaderTarget, TranspilationResult};

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Reinterprets a SPIR-V artifact as native-endian words.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, TranspileError> {
    if bytes.is_empty() {
        return Err(TranspileError::InvalidBinary("module is empty".into()));
    }
    if bytes.len() % 4 != 0 {
        return Err(TranspileError::InvalidBinary(format!(
            "module length {} is not a multiple of 4 bytes",
            bytes.len()
        )));
    }
    let words: Vec<u32> = bytemuck::allocation::pod_collect_to_vec(bytes);
    if words[0] != SPIRV_MAGIC {
        return Err(TranspileError::InvalidBinary(format!(
            "bad magic number {:#010x}",
            words[0]
        )));
    }
    Ok(words)
}

pub(crate) struct SpirvModule {
    /// The `#version 450` source handed to glslang.
    pub text: String,
    pub words: Vec<u32>,
}

/// Raw GLSL compiled to SPIR-V with `glslang`. No rule pipeline runs for this target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpirvFinalizer;

impl SpirvFinalizer {
    /// Writes the source into `scratch`, compiles it and leaves the module at
    /// [`INPUT_SPV`] for later steps.
    pub(crate) fn compile_in(
        &self,
        scratch: &Scratch,
        source: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> Result<SpirvModule, TranspileError> {
        let text = format!(
            "{}\n\n{}",
            ShaderTarget::Vulkan.version_string(),
            strip_version_directive(source)
        );
        let input = scratch.write(INPUT_GLSL, &text)?;
        let output = scratch.file(INPUT_SPV);

        toolchain.run_tool(
            Tool::Glslang,
            [
                OsStr::new("-V"),
                OsStr::new("-S"),
                OsStr::new(stage.glslang_stage()),
                input.as_os_str(),
                OsStr::new("-o"),
                output.as_os_str(),
            ],
        )?;

        let words = words_from_bytes(&scratch.read_bytes(INPUT_SPV)?)?;
        debug!(%stage, words = words.len(), "compiled SPIR-V module");
        Ok(SpirvModule { text, words })
    }
}

impl Finalizer for SpirvFinalizer {
    fn target(&self) -> ShaderTarget {
        ShaderTarget::Vulkan
    }

    fn finalize(
        &self,
        source: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> TranspilationResult {
        let compiled = toolchain
            .scratch()
            .and_then(|scratch| self.compile_in(&scratch, source, stage, toolchain));
        match compiled {
            Ok(module) => TranspilationResult::with_advisory(
                module.text,
                module.words,
                "SPIR-V compilation succeeded",
            ),
            Err(err) => {
                warn!(%stage, error = %err, "SPIR-V compilation failed");
                TranspilationResult::soft_failure(&TranspileError::SoftToolFailure {
                    tool: Tool::Glslang.name(),
                    message: format!("SPIR-V compilation failed: {err}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_ne_bytes()).collect()
    }

    #[test]
    fn words_round_trip_native_endian() {
        let words = [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0];
        assert_eq!(words_from_bytes(&module_bytes(&words)).unwrap(), words);
    }

    #[test]
    fn rejects_truncated_and_foreign_modules() {
        let err = words_from_bytes(&[0x03, 0x02, 0x23]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBinary);

        let err = words_from_bytes(&module_bytes(&[0xDEAD_BEEF])).unwrap_err();
        assert!(err.to_string().contains("0xdeadbeef"), "{err}");

        assert!(words_from_bytes(&[]).is_err());
    }

    #[test]
    fn missing_glslang_is_a_soft_failure() {
        let sdk = tempfile::tempdir().unwrap();
        let toolchain = ToolchainConfig::default().with_sdk_root(sdk.path());
        let result = SpirvFinalizer.finalize("void main(){}", ShaderStage::Vertex, &toolchain);
        assert!(result.success);
        assert!(result.output.is_empty());
        assert!(result.binary.is_empty());
        assert!(result
            .error_message
            .starts_with("SPIR-V compilation failed"));
    }
}
