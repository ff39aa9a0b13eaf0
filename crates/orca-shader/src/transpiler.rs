use tracing::{debug_span, info, warn};

use crate::backend;
use crate::error::TranspileError;
use crate::extract::{self, ShaderReflection};
use crate::toolchain::ToolchainConfig;
use crate::types::{
    ShaderStage, ShaderTarget, TranspilationResult, UniformBinding, VertexAttribute,
};
use crate::validate::validate;

/// Free-standing transpilation service.
///
/// Holds no per-request state; every call is independent and works in its own scratch
/// directory, so `&ShaderTranspiler` can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct ShaderTranspiler {
    toolchain: ToolchainConfig,
}

impl ShaderTranspiler {
    pub fn new(toolchain: ToolchainConfig) -> Self {
        Self { toolchain }
    }

    /// Transpiler configured from `VULKAN_SDK` and the `ORCA_*` env vars.
    pub fn from_env() -> Self {
        Self::new(ToolchainConfig::from_env())
    }

    pub fn toolchain(&self) -> &ToolchainConfig {
        &self.toolchain
    }

    /// Translates one shader stage. Never panics on bad input: validation and tool failures
    /// come back as a failed (or, for Vulkan, soft-failed) result.
    pub fn transpile(
        &self,
        source: &str,
        target: ShaderTarget,
        stage: ShaderStage,
    ) -> TranspilationResult {
        let span = debug_span!("transpile", shader_target = %target, %stage);
        let _enter = span.enter();

        if let Err(err) = validate(source) {
            warn!(error = %err, "shader rejected before transpilation");
            return TranspilationResult::failed(&err);
        }

        let result = backend::finalizer_for(target).finalize(source, stage, &self.toolchain);
        if !result.success {
            warn!(error = %result.error_message, "shader transpilation failed");
        } else if !result.is_usable() {
            warn!(advisory = %result.error_message, "shader transpilation produced no output");
        } else {
            info!("shader transpilation successful");
        }
        result
    }

    pub fn extract_uniforms(&self, source: &str) -> Vec<UniformBinding> {
        extract::extract_uniforms(source)
    }

    pub fn extract_attributes(
        &self,
        source: &str,
    ) -> Result<Vec<VertexAttribute>, TranspileError> {
        extract::extract_attributes(source)
    }

    pub fn reflect(&self, source: &str) -> Result<ShaderReflection, TranspileError> {
        ShaderReflection::from_source(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> ShaderTranspiler {
        // An SDK root that can't contain any tools.
        ShaderTranspiler::new(
            ToolchainConfig::default().with_sdk_root("/nonexistent/orca-shader-test-sdk"),
        )
    }

    #[test]
    fn empty_input_fails_for_every_target() {
        let transpiler = offline();
        for target in ShaderTarget::ALL {
            let result = transpiler.transpile("", target, ShaderStage::Vertex);
            assert!(!result.success, "{target}");
            assert!(result.output.is_empty());
            assert!(result.binary.is_empty());
            assert!(result.error_message.contains("empty"), "{target}");
        }
    }

    #[test]
    fn missing_braces_fail_before_any_backend_runs() {
        let result = offline().transpile(
            "uniform vec3 color;",
            ShaderTarget::Vulkan,
            ShaderStage::Vertex,
        );
        assert!(!result.success);
        assert!(result.error_message.contains("missing curly braces"));
        assert!(result.output.is_empty());
    }

    #[test]
    fn glsl_target_is_identity() {
        let transpiler = offline();
        for src in [
            "void main(){}",
            "#version 330 core\nuniform mat4 mvp;\nvoid main(){ gl_Position = mvp * vec4(0.0); }",
            "}{",
        ] {
            for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
                let result = transpiler.transpile(src, ShaderTarget::Glsl, stage);
                assert!(result.success);
                assert_eq!(result.output, src);
                assert!(result.error_message.is_empty());
            }
        }
    }

    #[test]
    fn position_builtin_is_renamed_only_for_the_vertex_stage() {
        let transpiler = offline();
        let src = "void main(){ gl_Position = x; }";

        // dxc isn't available, but the generated text is still reported.
        let vertex = transpiler.transpile(src, ShaderTarget::Hlsl, ShaderStage::Vertex);
        assert!(vertex.output.contains("position = x;"));
        assert!(!vertex.output.contains("gl_Position"));

        let fragment = transpiler.transpile(src, ShaderTarget::Hlsl, ShaderStage::Fragment);
        assert!(fragment.output.contains("gl_Position = x;"));
    }
}
