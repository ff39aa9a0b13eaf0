use std::ffi::OsStr;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use super::{strip_version_directive, Finalizer};
use crate::error::TranspileError;
use crate::rules::RulePipeline;
use crate::toolchain::{ToolchainConfig, Tool, VALIDATE_HLSL};
use crate::types::{ShaderStage, ShaderTarget, TranspilationResult};

/// Stand-in for GLSL's `inverse`, which HLSL lacks.
///
/// This is NOT a matrix inverse: it returns its argument unchanged so that shaders calling
/// `inverse` still compile. Any math depending on it is wrong. Pass the inverse as a uniform
/// instead.
pub const INVERSE_PLACEHOLDER: &str = "\
// Unimplemented intrinsic: `inverse` has no HLSL equivalent.
// Placeholder returns its input unchanged; results that depend on it are incorrect.
float4x4 inverse(float4x4 m)
{
    return m;
}

";

fn calls_inverse(source: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\binverse\s*\(").expect("static regex must compile"))
        .is_match(source)
}

/// GLSL → HLSL via the rule pipeline, validated with `dxc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HlslFinalizer;

impl HlslFinalizer {
    /// The HLSL text without running the validator.
    pub fn generate(&self, source: &str, stage: ShaderStage) -> String {
        let body = strip_version_directive(source);
        let converted = RulePipeline::new(ShaderTarget::Hlsl, stage).run(&body);

        let mut hlsl = String::with_capacity(converted.len() + INVERSE_PLACEHOLDER.len() + 64);
        hlsl.push_str(ShaderTarget::Hlsl.version_string());
        hlsl.push('\n');
        if calls_inverse(&converted) {
            warn!(
                %stage,
                "injecting placeholder `inverse` into HLSL output; results will be incorrect"
            );
            hlsl.push_str(INVERSE_PLACEHOLDER);
        }
        hlsl.push_str(&converted);
        hlsl
    }

    fn validate_with_dxc(
        &self,
        hlsl: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> Result<(), TranspileError> {
        let scratch = toolchain.scratch()?;
        let path = scratch.write(VALIDATE_HLSL, hlsl)?;
        toolchain.run_tool(
            Tool::Dxc,
            [
                OsStr::new("-T"),
                OsStr::new(stage.hlsl_profile()),
                OsStr::new("-E"),
                OsStr::new("main"),
                path.as_os_str(),
            ],
        )?;
        Ok(())
    }
}

impl Finalizer for HlslFinalizer {
    fn target(&self) -> ShaderTarget {
        ShaderTarget::Hlsl
    }

    fn finalize(
        &self,
        source: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> TranspilationResult {
        let hlsl = self.generate(source, stage);
        match self.validate_with_dxc(&hlsl, stage, toolchain) {
            Ok(()) => TranspilationResult::succeeded(hlsl),
            Err(err) => {
                warn!(%stage, error = %err, "dxc rejected generated HLSL");
                TranspilationResult::failed_with_output(&err, hlsl)
            }
        }
    }
}
