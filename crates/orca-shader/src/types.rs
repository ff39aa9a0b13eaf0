use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranspileError;

/// Output dialect of a transpilation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderTarget {
    /// The source dialect itself; transpiling to it is the identity.
    Glsl,
    /// Text rewrite to HLSL, validated with `dxc`.
    Hlsl,
    /// `#version 450` GLSL compiled to SPIR-V with `glslang`.
    Vulkan,
    /// MSL cross-compiled from the Vulkan SPIR-V with `spirv-cross`.
    Metal,
}

impl ShaderTarget {
    pub const ALL: [ShaderTarget; 4] = [
        ShaderTarget::Glsl,
        ShaderTarget::Hlsl,
        ShaderTarget::Vulkan,
        ShaderTarget::Metal,
    ];

    /// Header line emitted at the top of generated output.
    pub fn version_string(self) -> &'static str {
        match self {
            ShaderTarget::Glsl => "#version 330 core",
            ShaderTarget::Hlsl => "// HLSL Shader (Target: Direct3D 11)",
            ShaderTarget::Vulkan => "#version 450 core",
            ShaderTarget::Metal => "// Metal Shader Language",
        }
    }

    /// Whether a successful result for this target carries SPIR-V words.
    pub fn produces_binary(self) -> bool {
        matches!(self, ShaderTarget::Vulkan)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderTarget::Glsl => "glsl",
            ShaderTarget::Hlsl => "hlsl",
            ShaderTarget::Vulkan => "vulkan",
            ShaderTarget::Metal => "metal",
        }
    }
}

impl fmt::Display for ShaderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShaderTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "glsl" => Ok(ShaderTarget::Glsl),
            "hlsl" => Ok(ShaderTarget::Hlsl),
            "vulkan" | "spirv" | "spv" => Ok(ShaderTarget::Vulkan),
            "metal" | "msl" => Ok(ShaderTarget::Metal),
            other => Err(format!(
                "unknown shader target `{other}` (expected glsl, hlsl, vulkan or metal)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// `dxc -T` profile used to validate HLSL output.
    pub fn hlsl_profile(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_6_0",
            ShaderStage::Fragment => "ps_6_0",
        }
    }

    /// `glslang -S` stage name. The scratch file has a neutral `.glsl` extension, so the stage
    /// must be passed explicitly.
    pub fn glslang_stage(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShaderStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertex" | "vert" | "vs" => Ok(ShaderStage::Vertex),
            "fragment" | "frag" | "fs" | "pixel" | "ps" => Ok(ShaderStage::Fragment),
            other => Err(format!(
                "unknown shader stage `{other}` (expected vertex or fragment)"
            )),
        }
    }
}

/// A `uniform <type> <name>;` declaration, numbered by declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniformBinding {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub binding: u32,
    pub set: u32,
}

impl UniformBinding {
    /// Sampler uniforms map to texture bindings rather than buffer members.
    pub fn is_opaque(&self) -> bool {
        self.ty.starts_with("sampler")
    }
}

/// A `layout(location = N) in <type> <name>;` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub location: u32,
}

/// Return value of every transpile/compose call.
///
/// Callers must check `success` before trusting `output` or `binary`. A failed result may still
/// carry partially generated text in `output` for diagnostics. A successful result may carry an
/// advisory in `error_message`, and the Vulkan backend reports compiler failures as
/// `success == true` with an empty payload (see [`TranspilationResult::is_usable`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranspilationResult {
    pub success: bool,
    pub output: String,
    /// SPIR-V words; only populated for [`ShaderTarget::Vulkan`].
    pub binary: Vec<u32>,
    pub error_message: String,
}

impl TranspilationResult {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            binary: Vec::new(),
            error_message: String::new(),
        }
    }

    pub fn with_advisory(
        output: impl Into<String>,
        binary: Vec<u32>,
        advisory: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            output: output.into(),
            binary,
            error_message: advisory.into(),
        }
    }

    /// Hard failure with no payload.
    pub fn failed(err: &TranspileError) -> Self {
        Self::failed_with_output(err, String::new())
    }

    /// Hard failure that keeps the generated text around for diagnostics.
    pub fn failed_with_output(err: &TranspileError, output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            binary: Vec::new(),
            error_message: err.to_string(),
        }
    }

    /// `success == true` with an empty payload and an advisory message.
    pub fn soft_failure(err: &TranspileError) -> Self {
        Self {
            success: true,
            output: String::new(),
            binary: Vec::new(),
            error_message: err.to_string(),
        }
    }

    /// `success` and a non-empty payload. Distinguishes real output from a soft failure.
    pub fn is_usable(&self) -> bool {
        self.success && (!self.output.is_empty() || !self.binary.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_aliases_case_insensitively() {
        assert_eq!("HLSL".parse::<ShaderTarget>(), Ok(ShaderTarget::Hlsl));
        assert_eq!("spirv".parse::<ShaderTarget>(), Ok(ShaderTarget::Vulkan));
        assert_eq!(" msl ".parse::<ShaderTarget>(), Ok(ShaderTarget::Metal));
        assert!("wgsl".parse::<ShaderTarget>().is_err());

        for target in ShaderTarget::ALL {
            assert_eq!(target.to_string().parse::<ShaderTarget>(), Ok(target));
        }
    }

    #[test]
    fn stage_selects_tool_profiles() {
        assert_eq!("ps".parse::<ShaderStage>(), Ok(ShaderStage::Fragment));
        assert_eq!(ShaderStage::Vertex.hlsl_profile(), "vs_6_0");
        assert_eq!(ShaderStage::Fragment.hlsl_profile(), "ps_6_0");
        assert_eq!(ShaderStage::Fragment.glslang_stage(), "frag");
    }

    #[test]
    fn only_vulkan_produces_binary() {
        let binary: Vec<_> = ShaderTarget::ALL
            .into_iter()
            .filter(|t| t.produces_binary())
            .collect();
        assert_eq!(binary, vec![ShaderTarget::Vulkan]);
    }

    #[test]
    fn soft_failure_is_successful_but_unusable() {
        let soft = TranspilationResult::soft_failure(&TranspileError::SoftToolFailure {
            tool: "glslang",
            message: "SPIR-V compilation failed: glslang failed (exit status 2)".into(),
        });
        assert!(soft.success);
        assert!(!soft.is_usable());
        assert!(soft.error_message.starts_with("SPIR-V compilation failed"));

        assert!(TranspilationResult::succeeded("void main(){}").is_usable());
        assert!(!TranspilationResult::failed(&TranspileError::EmptyInput).is_usable());
    }

    #[test]
    fn metadata_serializes_type_field() {
        let u = UniformBinding {
            name: "color".into(),
            ty: "vec4".into(),
            binding: 0,
            set: 0,
        };
        let json = serde_json::to_value(&u).unwrap();
        assert_eq!(json["type"], "vec4");
        assert_eq!(json["binding"], 0);
        assert!(!u.is_opaque());
    }
}
