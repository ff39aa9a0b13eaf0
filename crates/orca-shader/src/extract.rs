//! Uniform and vertex-attribute reflection.
//!
//! Extraction is a left-to-right regex scan over the raw text. Bindings are numbered by match
//! order, so re-running on unchanged text always produces the same sequence. Declarations that
//! don't match the pattern (block uniforms, missing semicolons, reordered qualifiers) are skipped
//! without error.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TranspileError;
use crate::types::{UniformBinding, VertexAttribute};

const BUILTIN_TYPES: &[&str] = &[
    "float",
    "int",
    "uint",
    "vec2",
    "vec3",
    "vec4",
    "ivec2",
    "ivec3",
    "ivec4",
    "mat2",
    "mat3",
    "mat4",
    "sampler2D",
    "samplerCube",
];

pub(crate) fn uniform_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"uniform\s+(\w+)\s+(\w+);").expect("static regex must compile"))
}

pub(crate) fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"layout\s*\(\s*location\s*=\s*(\d+)\s*\)\s*in\s+(\w+)\s+(\w+);")
            .expect("static regex must compile")
    })
}

pub fn extract_uniforms(source: &str) -> Vec<UniformBinding> {
    uniform_regex()
        .captures_iter(source)
        .zip(0u32..)
        .map(|(caps, binding)| UniformBinding {
            ty: caps[1].to_string(),
            name: caps[2].to_string(),
            binding,
            set: 0,
        })
        .collect()
}

pub fn extract_attributes(source: &str) -> Result<Vec<VertexAttribute>, TranspileError> {
    attribute_regex()
        .captures_iter(source)
        .map(|caps| {
            let literal = &caps[1];
            // `\d+` guarantees digits, so only overflow can get here.
            literal
                .parse::<u32>()
                .map(|location| VertexAttribute {
                    location,
                    ty: caps[2].to_string(),
                    name: caps[3].to_string(),
                })
                .map_err(|source| TranspileError::IntegerParse {
                    literal: literal.to_string(),
                    source,
                })
        })
        .collect()
}

/// Whether `ty` is one of the source dialect's builtin type tokens.
pub fn is_builtin_type(ty: &str) -> bool {
    BUILTIN_TYPES.contains(&ty)
}

/// Both metadata sequences for one shader, as handed to a pipeline-layout builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderReflection {
    pub uniforms: Vec<UniformBinding>,
    pub attributes: Vec<VertexAttribute>,
}

impl ShaderReflection {
    pub fn from_source(source: &str) -> Result<Self, TranspileError> {
        Ok(Self {
            uniforms: extract_uniforms(source),
            attributes: extract_attributes(source)?,
        })
    }

    /// Uniforms that must be bound as textures instead of buffer members.
    pub fn opaque_uniforms(&self) -> impl Iterator<Item = &UniformBinding> {
        self.uniforms.iter().filter(|u| u.is_opaque())
    }
}
