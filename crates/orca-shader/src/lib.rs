//! Pattern-level shader transpiler (GLSL → HLSL / Vulkan SPIR-V / Metal).
//!
//! The core never builds an AST. A request flows through:
//!
//! - [`validate`]: coarse pre-flight checks (empty input, missing braces).
//! - [`extract`]: uniform / vertex-attribute reflection by declaration order.
//! - [`rules`]: an ordered list of regex rewrite passes, one named function per rule.
//! - [`backend`]: per-target finalizers, some of which shell out to the Vulkan SDK tools
//!   (`dxc`, `glslang`, `spirv-cross`) via [`toolchain`].
//!
//! [`ShaderTranspiler`] ties these together and is the only entrypoint most callers need.
//! Every call works in its own scratch directory, so a single transpiler can be shared across
//! threads.

#![forbid(unsafe_code)]

pub mod backend;
pub mod cache;
mod compose;
pub mod error;
pub mod extract;
pub mod rules;
pub mod toolchain;
mod transpiler;
pub mod types;
pub mod validate;

pub use crate::cache::{ShaderCache, ShaderCacheLookup, ShaderCacheLookupSource};
pub use crate::compose::{compose_stages, FRAGMENT_BANNER, VERTEX_BANNER};
pub use crate::error::{ErrorKind, TranspileError};
pub use crate::extract::{extract_attributes, extract_uniforms, ShaderReflection};
pub use crate::rules::{RulePass, RulePipeline};
pub use crate::toolchain::{Tool, ToolchainConfig};
pub use crate::transpiler::ShaderTranspiler;
pub use crate::types::{
    ShaderStage, ShaderTarget, TranspilationResult, UniformBinding, VertexAttribute,
};
pub use crate::validate::validate;
