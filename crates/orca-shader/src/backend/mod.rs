//! Per-target finalizers.
//!
//! A finalizer turns validated source into a [`TranspilationResult`] for one target: it runs
//! whatever rewriting the target needs, adds the target header and drives the external tools.
//!
//! Failure conventions differ by target and are kept as-is because callers depend on them:
//!
//! | Target | Tool failure reported as |
//! |--------|--------------------------|
//! | HLSL   | `success == false`, `output` still holds the generated HLSL |
//! | Vulkan | `success == true`, empty `output`/`binary`, advisory in `error_message` |
//! | Metal  | `success == false`, empty `output` |

use std::sync::OnceLock;

use regex::Regex;

use crate::toolchain::ToolchainConfig;
use crate::types::{ShaderStage, ShaderTarget, TranspilationResult};

mod hlsl;
mod metal;
mod spirv;

pub use self::hlsl::{HlslFinalizer, INVERSE_PLACEHOLDER};
pub use self::metal::MetalFinalizer;
pub use self::spirv::{words_from_bytes, SpirvFinalizer, SPIRV_MAGIC};

pub trait Finalizer: Send + Sync {
    fn target(&self) -> ShaderTarget;

    /// `source` has already passed [`crate::validate`].
    fn finalize(
        &self,
        source: &str,
        stage: ShaderStage,
        toolchain: &ToolchainConfig,
    ) -> TranspilationResult;
}

/// The source dialect: output is the input, byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlslPassthrough;

impl Finalizer for GlslPassthrough {
    fn target(&self) -> ShaderTarget {
        ShaderTarget::Glsl
    }

    fn finalize(
        &self,
        source: &str,
        _stage: ShaderStage,
        _toolchain: &ToolchainConfig,
    ) -> TranspilationResult {
        TranspilationResult::succeeded(source)
    }
}

pub fn finalizer_for(target: ShaderTarget) -> &'static dyn Finalizer {
    match target {
        ShaderTarget::Glsl => &GlslPassthrough,
        ShaderTarget::Hlsl => &HlslFinalizer,
        ShaderTarget::Vulkan => &SpirvFinalizer,
        ShaderTarget::Metal => &MetalFinalizer,
    }
}

/// Removes `#version ...` directive lines so the target header can replace them.
pub fn strip_version_directive(source: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#version\s+\d+[^\n]*\n?").expect("static regex must compile")
    })
    .replace_all(source, "")
    .into_owned()
}
