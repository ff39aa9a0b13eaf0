//! Linked vertex + fragment programs.

use tracing::debug;

use crate::transpiler::ShaderTranspiler;
use crate::types::{ShaderStage, ShaderTarget, TranspilationResult};

pub const VERTEX_BANNER: &str = "// === VERTEX SHADER ===";
pub const FRAGMENT_BANNER: &str = "// === FRAGMENT SHADER ===";

/// Joins two translated stages behind their banners.
pub fn compose_stages(vertex: &str, fragment: &str) -> String {
    format!("{VERTEX_BANNER}\n{vertex}\n\n{FRAGMENT_BANNER}\n{fragment}")
}

impl ShaderTranspiler {
    /// Transpiles both stages and concatenates them behind stage banners.
    ///
    /// Stops at the first failed stage and returns its result unchanged; the fragment stage is
    /// not attempted if the vertex stage fails. The combined result never carries a binary, even
    /// for [`ShaderTarget::Vulkan`].
    pub fn transpile_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
        target: ShaderTarget,
    ) -> TranspilationResult {
        let vertex = self.transpile(vertex_source, target, ShaderStage::Vertex);
        if !vertex.success {
            debug!(shader_target = %target, "vertex stage failed; skipping fragment stage");
            return vertex;
        }

        let fragment = self.transpile(fragment_source, target, ShaderStage::Fragment);
        if !fragment.success {
            return fragment;
        }

        TranspilationResult::succeeded(compose_stages(&vertex.output, &fragment.output))
    }
}
