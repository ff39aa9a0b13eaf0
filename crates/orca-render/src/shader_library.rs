//! Loads shader files from disk and hands them to the transpiler.

use std::fs;
use std::path::{Path, PathBuf};

use orca_shader::{
    compose_stages, ShaderReflection, ShaderStage, ShaderTarget, ShaderTranspiler,
    TranspilationResult,
};
use tracing::{debug, info};

use crate::error::RenderError;

/// A translated shader ready to be handed to a [`crate::Renderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram {
    pub target: ShaderTarget,
    /// Translated text. For a linked program, both stages behind their banners.
    pub source: String,
    /// SPIR-V words; only single Vulkan stages carry a module.
    pub binary: Vec<u32>,
    /// Reflection of the GLSL input.
    pub reflection: ShaderReflection,
}

#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    transpiler: ShaderTranspiler,
    shader_dir: PathBuf,
    cache_dir: Option<PathBuf>,
}

impl ShaderLibrary {
    pub fn new(transpiler: ShaderTranspiler, shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            transpiler,
            shader_dir: shader_dir.into(),
            cache_dir: None,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn transpiler(&self) -> &ShaderTranspiler {
        &self.transpiler
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Resolves `path` against the shader directory. Absolute paths are used as-is.
    pub fn shader_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.shader_dir.join(path)
    }

    pub fn read_source(&self, path: impl AsRef<Path>) -> Result<String, RenderError> {
        let path = self.shader_path(path);
        fs::read_to_string(&path).map_err(|e| RenderError::io(path, e))
    }

    /// Transpiles one stage, turning failures and soft failures into [`RenderError::Transpile`]
    /// attributed to `path`.
    fn transpile_stage(
        &self,
        path: &Path,
        source: &str,
        target: ShaderTarget,
        stage: ShaderStage,
    ) -> Result<TranspilationResult, RenderError> {
        let result = self.transpiler.transpile(source, target, stage);
        if !result.is_usable() {
            return Err(RenderError::Transpile {
                path: self.shader_path(path),
                message: result.error_message,
            });
        }
        Ok(result)
    }

    pub fn load_stage(
        &self,
        path: impl AsRef<Path>,
        target: ShaderTarget,
        stage: ShaderStage,
    ) -> Result<ShaderProgram, RenderError> {
        let path = path.as_ref();
        let source = self.read_source(path)?;
        let result = self.transpile_stage(path, &source, target, stage)?;
        let reflection = ShaderReflection::from_source(&source)?;

        debug!(path = %path.display(), shader_target = %target, %stage, "loaded shader stage");
        Ok(ShaderProgram {
            target,
            source: result.output,
            binary: result.binary,
            reflection,
        })
    }

    /// Loads and links a vertex + fragment pair.
    ///
    /// Each stage must be usable on its own; the fragment stage is not transpiled if the vertex
    /// stage fails. Like [`ShaderTranspiler::transpile_program`], the linked program carries no
    /// binary.
    pub fn load_program(
        &self,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        target: ShaderTarget,
    ) -> Result<ShaderProgram, RenderError> {
        let (vertex_path, fragment_path) = (vertex_path.as_ref(), fragment_path.as_ref());
        let vertex_source = self.read_source(vertex_path)?;
        let fragment_source = self.read_source(fragment_path)?;

        let vertex =
            self.transpile_stage(vertex_path, &vertex_source, target, ShaderStage::Vertex)?;
        let fragment =
            self.transpile_stage(fragment_path, &fragment_source, target, ShaderStage::Fragment)?;
        let reflection = merge_reflections(
            ShaderReflection::from_source(&vertex_source)?,
            ShaderReflection::from_source(&fragment_source)?,
        );

        Ok(ShaderProgram {
            target,
            source: compose_stages(&vertex.output, &fragment.output),
            binary: Vec::new(),
            reflection,
        })
    }

    /// Writes translated text to `<cache_dir>/<name>`, creating the directory.
    pub fn save_to_cache(&self, name: &str, content: &str) -> Result<PathBuf, RenderError> {
        let dir = self.cache_dir.as_ref().ok_or(RenderError::CacheDisabled)?;
        fs::create_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;
        let path = dir.join(name);
        fs::write(&path, content).map_err(|e| RenderError::io(&path, e))?;
        info!(path = %path.display(), "saved translated shader");
        Ok(path)
    }
}

/// Vertex attributes plus the union of both stages' uniforms, vertex first. A uniform declared in
/// both stages keeps its vertex-stage slot; bindings are renumbered by position.
fn merge_reflections(vertex: ShaderReflection, fragment: ShaderReflection) -> ShaderReflection {
    let mut uniforms = vertex.uniforms;
    for u in fragment.uniforms {
        if !uniforms.iter().any(|v| v.name == u.name) {
            uniforms.push(u);
        }
    }
    for (u, binding) in uniforms.iter_mut().zip(0u32..) {
        u.binding = binding;
    }
    ShaderReflection {
        uniforms,
        attributes: vertex.attributes,
    }
}
