//! Text-level rewrite passes.
//!
//! Each rule is a total `(text, target[, stage]) -> text` function that only touches a bounded
//! set of constructs; anything it doesn't recognize passes through unmodified. The rules are
//! regex substitutions standing in for a real front end, so they can over-match (see
//! [`convert_matrix_operations`]). [`RulePipeline`] runs them in a fixed order, which is the only
//! thing callers depend on; a parser-based backend can replace the pass list without touching
//! them.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::extract::{attribute_regex, extract_uniforms};
use crate::types::{ShaderStage, ShaderTarget};

/// GLSL type tokens with a different spelling in HLSL/MSL.
const TYPE_RENAMES: &[(&str, &str)] = &[
    ("mat3", "float3x3"),
    ("mat4", "float4x4"),
    ("vec2", "float2"),
    ("vec3", "float3"),
    ("vec4", "float4"),
];

/// Builtin functions the HLSL pass recognizes. The current rule set spells them identically in
/// both dialects.
const HLSL_FUNCTION_RENAMES: &[(&str, &str)] = &[
    ("normalize", "normalize"),
    ("dot", "dot"),
    ("max", "max"),
    ("transpose", "transpose"),
    ("inverse", "inverse"),
];

fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex must compile"))
}

fn word_table_regex(cell: &'static OnceLock<Regex>, table: &[(&str, &str)]) -> &'static Regex {
    cell.get_or_init(|| {
        let alternation = table
            .iter()
            .map(|(from, _)| regex::escape(from))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{alternation})\b")).expect("static regex must compile")
    })
}

fn rename_words(source: &str, re: &Regex, table: &[(&str, &str)]) -> String {
    re.replace_all(source, |caps: &Captures<'_>| {
        let word = &caps[0];
        table
            .iter()
            .find(|(from, _)| *from == word)
            .map_or(word, |(_, to)| *to)
            .to_string()
    })
    .into_owned()
}

/// HLSL spelling of a GLSL type token used in the generated constant buffer. Unknown tokens are
/// kept as-is.
pub fn hlsl_type(glsl_type: &str) -> &str {
    TYPE_RENAMES
        .iter()
        .find(|(from, _)| *from == glsl_type)
        .map_or(glsl_type, |(_, to)| *to)
}

/// Collects every `uniform T name;` into one `cbuffer` at the top of the document (HLSL only).
pub fn convert_uniform_declarations(source: &str, target: ShaderTarget) -> String {
    static DECL: OnceLock<Regex> = OnceLock::new();

    if target != ShaderTarget::Hlsl {
        return source.to_string();
    }

    let uniforms = extract_uniforms(source);
    if uniforms.is_empty() {
        return source.to_string();
    }

    let mut block = String::from("cbuffer Uniforms : register(b0)\n{\n");
    for uniform in &uniforms {
        block.push_str(&format!("    {} {};\n", hlsl_type(&uniform.ty), uniform.name));
    }
    block.push_str("};\n\n");

    let stripped = static_regex(&DECL, r"uniform\s+\w+\s+\w+;[ \t]*(?:\r?\n)?")
        .replace_all(source, "");
    block.push_str(&stripped);
    block
}

/// Rewrites `layout(location = N) in T name;` into the target's input-binding spelling. Only the
/// vertex stage has vertex attributes.
pub fn convert_attribute_declarations(
    source: &str,
    target: ShaderTarget,
    stage: ShaderStage,
) -> String {
    if stage != ShaderStage::Vertex {
        return source.to_string();
    }

    let replacement = match target {
        ShaderTarget::Hlsl => "${2} ${3} : TEXCOORD${1};",
        ShaderTarget::Metal => "${2} ${3} [[attribute(${1})]];",
        ShaderTarget::Glsl | ShaderTarget::Vulkan => return source.to_string(),
    };
    attribute_regex()
        .replace_all(source, replacement)
        .into_owned()
}

/// Rewrites stage outputs (vertex) or stage inputs (fragment) into interpolant bindings.
///
/// Every varying is bound to interpolant 0; neither dialect gets a real index assignment, so
/// shaders with more than one varying produce colliding semantics.
pub fn convert_varying_declarations(
    source: &str,
    target: ShaderTarget,
    stage: ShaderStage,
) -> String {
    static OUT_DECL: OnceLock<Regex> = OnceLock::new();
    static IN_DECL: OnceLock<Regex> = OnceLock::new();

    let out_decl = || static_regex(&OUT_DECL, r"\bout\s+(\w+)\s+(\w+);");
    let in_decl = || static_regex(&IN_DECL, r"\bin\s+(\w+)\s+(\w+);");

    let (re, replacement) = match (target, stage) {
        (ShaderTarget::Hlsl, ShaderStage::Vertex) => (out_decl(), "${1} ${2} : TEXCOORD0;"),
        (ShaderTarget::Hlsl, ShaderStage::Fragment) => (in_decl(), "${1} ${2} : TEXCOORD0;"),
        (ShaderTarget::Metal, ShaderStage::Vertex) => (out_decl(), "${1} ${2} [[user(locn0)]];"),
        _ => return source.to_string(),
    };
    re.replace_all(source, replacement).into_owned()
}

/// Literal token replacement of builtin function names and vector/matrix type spellings.
pub fn convert_builtin_functions(source: &str, target: ShaderTarget) -> String {
    static FUNCTIONS: OnceLock<Regex> = OnceLock::new();
    static TYPES: OnceLock<Regex> = OnceLock::new();

    let types = || word_table_regex(&TYPES, TYPE_RENAMES);
    match target {
        ShaderTarget::Hlsl => {
            let functions = word_table_regex(&FUNCTIONS, HLSL_FUNCTION_RENAMES);
            let output = rename_words(source, functions, HLSL_FUNCTION_RENAMES);
            rename_words(&output, types(), TYPE_RENAMES)
        }
        ShaderTarget::Metal => rename_words(source, types(), TYPE_RENAMES),
        ShaderTarget::Glsl | ShaderTarget::Vulkan => source.to_string(),
    }
}

/// Rewrites `a * b` into `mul(a, b)` (HLSL only).
///
/// This is a blunt substitution on any `identifier * operand` sequence regardless of operand
/// types: scalar products are rewritten too, and chained products like `a * b * c` come out as
/// `mul(a, b) * c`.
pub fn convert_matrix_operations(source: &str, target: ShaderTarget) -> String {
    static MUL: OnceLock<Regex> = OnceLock::new();

    if target != ShaderTarget::Hlsl {
        return source.to_string();
    }
    static_regex(&MUL, r"(\w+)\s*\*\s*([\w().]+)")
        .replace_all(source, "mul(${1}, ${2})")
        .into_owned()
}

/// Renames the position (vertex) or color (fragment) output builtin.
pub fn replace_builtin_variables(
    source: &str,
    target: ShaderTarget,
    stage: ShaderStage,
) -> String {
    static POSITION: OnceLock<Regex> = OnceLock::new();
    static FRAG_COLOR: OnceLock<Regex> = OnceLock::new();

    let position = || static_regex(&POSITION, r"\bgl_Position\b");
    let frag_color = || static_regex(&FRAG_COLOR, r"\bgl_FragColor\b");

    let (re, replacement) = match (target, stage) {
        (ShaderTarget::Hlsl, ShaderStage::Vertex) => (position(), "position"),
        (ShaderTarget::Hlsl, ShaderStage::Fragment) => (frag_color(), "output"),
        (ShaderTarget::Metal, ShaderStage::Vertex) => (position(), "out.position"),
        (ShaderTarget::Metal, ShaderStage::Fragment) => (frag_color(), "out.color"),
        (ShaderTarget::Glsl | ShaderTarget::Vulkan, _) => return source.to_string(),
    };
    re.replace_all(source, replacement).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulePass {
    UniformBlock,
    AttributeLayout,
    Varyings,
    BuiltinFunctions,
    MatrixMultiply,
    BuiltinVariables,
}

impl RulePass {
    /// Pipeline order. Later passes see the output of earlier ones.
    pub const ORDER: [RulePass; 6] = [
        RulePass::UniformBlock,
        RulePass::AttributeLayout,
        RulePass::Varyings,
        RulePass::BuiltinFunctions,
        RulePass::MatrixMultiply,
        RulePass::BuiltinVariables,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RulePass::UniformBlock => "uniform-block",
            RulePass::AttributeLayout => "attribute-layout",
            RulePass::Varyings => "varyings",
            RulePass::BuiltinFunctions => "builtin-functions",
            RulePass::MatrixMultiply => "matrix-multiply",
            RulePass::BuiltinVariables => "builtin-variables",
        }
    }

    pub fn apply(self, source: &str, target: ShaderTarget, stage: ShaderStage) -> String {
        match self {
            RulePass::UniformBlock => convert_uniform_declarations(source, target),
            RulePass::AttributeLayout => convert_attribute_declarations(source, target, stage),
            RulePass::Varyings => convert_varying_declarations(source, target, stage),
            RulePass::BuiltinFunctions => convert_builtin_functions(source, target),
            RulePass::MatrixMultiply => convert_matrix_operations(source, target),
            RulePass::BuiltinVariables => replace_builtin_variables(source, target, stage),
        }
    }
}

/// The ordered rule list for one (target, stage) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulePipeline {
    target: ShaderTarget,
    stage: ShaderStage,
}

impl RulePipeline {
    pub fn new(target: ShaderTarget, stage: ShaderStage) -> Self {
        Self { target, stage }
    }

    pub fn passes(&self) -> &'static [RulePass] {
        &RulePass::ORDER
    }

    pub fn run(&self, source: &str) -> String {
        let mut text = source.to_string();
        for pass in self.passes() {
            let next = pass.apply(&text, self.target, self.stage);
            if next != text {
                debug!(
                    pass = pass.name(),
                    shader_target = %self.target,
                    stage = %self.stage,
                    "rewrite pass changed shader text"
                );
            }
            text = next;
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uniforms_become_a_single_cbuffer() {
        let src = "uniform mat4 mvp;\nuniform vec3 lightDir;\nuniform float time;\nvoid main(){}";
        let out = convert_uniform_declarations(src, ShaderTarget::Hlsl);
        assert_eq!(
            out,
            "cbuffer Uniforms : register(b0)\n{\n    float4x4 mvp;\n    float3 lightDir;\n    float time;\n};\n\nvoid main(){}"
        );
    }

    #[test]
    fn uniform_block_is_hlsl_only() {
        let src = "uniform vec4 color;\nvoid main(){}";
        for target in [ShaderTarget::Glsl, ShaderTarget::Vulkan, ShaderTarget::Metal] {
            assert_eq!(convert_uniform_declarations(src, target), src);
        }
        // No uniforms: no empty block.
        assert_eq!(
            convert_uniform_declarations("void main(){}", ShaderTarget::Hlsl),
            "void main(){}"
        );
    }

    #[test]
    fn attributes_use_semantics_for_hlsl_and_attribute_indices_for_metal() {
        let src = "layout(location = 2) in vec3 normal;";
        assert_eq!(
            convert_attribute_declarations(src, ShaderTarget::Hlsl, ShaderStage::Vertex),
            "vec3 normal : TEXCOORD2;"
        );
        assert_eq!(
            convert_attribute_declarations(src, ShaderTarget::Metal, ShaderStage::Vertex),
            "vec3 normal [[attribute(2)]];"
        );
        assert_eq!(
            convert_attribute_declarations(src, ShaderTarget::Hlsl, ShaderStage::Fragment),
            src
        );
    }

    #[test]
    fn varyings_always_use_interpolant_zero() {
        let vs = "out vec3 vNormal;\nout vec2 vUv;";
        assert_eq!(
            convert_varying_declarations(vs, ShaderTarget::Hlsl, ShaderStage::Vertex),
            "vec3 vNormal : TEXCOORD0;\nvec2 vUv : TEXCOORD0;"
        );
        assert_eq!(
            convert_varying_declarations(vs, ShaderTarget::Metal, ShaderStage::Vertex),
            "vec3 vNormal [[user(locn0)]];\nvec2 vUv [[user(locn0)]];"
        );

        let fs = "in vec3 vNormal;\ninout vec3 keep;";
        assert_eq!(
            convert_varying_declarations(fs, ShaderTarget::Hlsl, ShaderStage::Fragment),
            "vec3 vNormal : TEXCOORD0;\ninout vec3 keep;"
        );
        assert_eq!(
            convert_varying_declarations(fs, ShaderTarget::Metal, ShaderStage::Fragment),
            fs
        );
    }

    #[test]
    fn type_renames_respect_word_boundaries() {
        let src = "vec4 c = vec4(myvec3, 1.0); mat4 m; vec3x";
        assert_eq!(
            convert_builtin_functions(src, ShaderTarget::Metal),
            "float4 c = float4(myvec3, 1.0); float4x4 m; vec3x"
        );
        assert_eq!(convert_builtin_functions(src, ShaderTarget::Vulkan), src);
    }

    #[test]
    fn hlsl_function_whitelist_is_identity() {
        let src = "float d = max(dot(normalize(n), l), 0.0); mat3 t = transpose(inverse(m));";
        assert_eq!(
            convert_builtin_functions(src, ShaderTarget::Hlsl),
            "float d = max(dot(normalize(n), l), 0.0); float3x3 t = transpose(inverse(m));"
        );
    }

    #[test]
    fn matrix_rewrite_over_matches_scalar_products() {
        assert_eq!(
            convert_matrix_operations("pos = mvp * vec4(p);", ShaderTarget::Hlsl),
            "pos = mul(mvp, vec4(p));"
        );
        // Not scoped to matrix operands.
        assert_eq!(
            convert_matrix_operations("float y = x * 2.0;", ShaderTarget::Hlsl),
            "float y = mul(x, 2.0);"
        );
        assert_eq!(
            convert_matrix_operations("c = a*b*d;", ShaderTarget::Hlsl),
            "c = mul(a, b)*d;"
        );
        assert_eq!(
            convert_matrix_operations("float y = x * 2.0;", ShaderTarget::Metal),
            "float y = x * 2.0;"
        );
    }

    #[test]
    fn builtin_variables_follow_stage() {
        let src = "gl_Position = p; gl_FragColor = c;";
        assert_eq!(
            replace_builtin_variables(src, ShaderTarget::Hlsl, ShaderStage::Vertex),
            "position = p; gl_FragColor = c;"
        );
        assert_eq!(
            replace_builtin_variables(src, ShaderTarget::Hlsl, ShaderStage::Fragment),
            "gl_Position = p; output = c;"
        );
        assert_eq!(
            replace_builtin_variables(src, ShaderTarget::Metal, ShaderStage::Vertex),
            "out.position = p; gl_FragColor = c;"
        );
        assert_eq!(
            replace_builtin_variables(src, ShaderTarget::Metal, ShaderStage::Fragment),
            "gl_Position = p; out.color = c;"
        );
    }

    #[test]
    fn pipeline_runs_passes_in_order() {
        let src = "uniform mat4 mvp;\nlayout(location=0) in vec3 pos;\nout vec3 vPos;\n\
                   void main(){ vPos = pos; gl_Position = mvp * vec4(pos, 1.0); }";
        let out = RulePipeline::new(ShaderTarget::Hlsl, ShaderStage::Vertex).run(src);
        assert_eq!(
            out,
            "cbuffer Uniforms : register(b0)\n{\n    float4x4 mvp;\n};\n\n\
             float3 pos : TEXCOORD0;\nfloat3 vPos : TEXCOORD0;\n\
             void main(){ vPos = pos; position = mul(mvp, float4(pos), 1.0); }"
        );
    }

    #[test]
    fn pipeline_is_identity_for_glsl_and_vulkan() {
        let src = "uniform mat4 mvp;\nvoid main(){ gl_Position = mvp * vec4(0.0); }";
        for target in [ShaderTarget::Glsl, ShaderTarget::Vulkan] {
            for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
                assert_eq!(RulePipeline::new(target, stage).run(src), src);
            }
        }
    }

    #[test]
    fn pass_order_is_fixed() {
        let pipeline = RulePipeline::new(ShaderTarget::Metal, ShaderStage::Fragment);
        let names: Vec<_> = pipeline.passes().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            [
                "uniform-block",
                "attribute-layout",
                "varyings",
                "builtin-functions",
                "matrix-multiply",
                "builtin-variables"
            ]
        );
    }
}
