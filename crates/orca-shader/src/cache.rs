//! In-memory cache of transpiled stages.

use std::collections::HashMap;

use tracing::trace;

use crate::transpiler::ShaderTranspiler;
use crate::types::{ShaderStage, ShaderTarget, TranspilationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderCacheLookupSource {
    /// The stage was already present in the in-memory cache.
    Memory,
    /// The transpiler ran and the result was inserted into the in-memory cache.
    Translated,
}

#[derive(Debug)]
pub struct ShaderCacheLookup<'a> {
    pub source: ShaderCacheLookupSource,
    result: &'a TranspilationResult,
}

impl std::ops::Deref for ShaderCacheLookup<'_> {
    type Target = TranspilationResult;

    fn deref(&self) -> &Self::Target {
        self.result
    }
}

/// Memoizes [`ShaderTranspiler::transpile`] by a blake3 hash of `(target, stage, source)`.
///
/// Only usable results are stored. Failures and soft failures are handed back to the caller
/// and retried on the next lookup, since the toolchain may have been fixed in between.
#[derive(Debug, Default)]
pub struct ShaderCache {
    map: HashMap<blake3::Hash, TranspilationResult>,
    transpiler: ShaderTranspiler,
}

fn cache_key(source: &str, target: ShaderTarget, stage: ShaderStage) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(target.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(stage.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(source.as_bytes());
    hasher.finalize()
}

impl ShaderCache {
    pub fn new(transpiler: ShaderTranspiler) -> Self {
        Self {
            map: HashMap::new(),
            transpiler,
        }
    }

    pub fn transpiler(&self) -> &ShaderTranspiler {
        &self.transpiler
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns the cached result for this stage, transpiling it on a miss.
    ///
    /// `Err` carries a result that is not [usable](TranspilationResult::is_usable); it is not
    /// inserted.
    pub fn get_or_transpile(
        &mut self,
        source: &str,
        target: ShaderTarget,
        stage: ShaderStage,
    ) -> Result<ShaderCacheLookup<'_>, TranspilationResult> {
        use std::collections::hash_map::Entry;

        let hash = cache_key(source, target, stage);
        match self.map.entry(hash) {
            Entry::Occupied(e) => {
                trace!(shader_target = %target, %stage, "shader cache hit");
                Ok(ShaderCacheLookup {
                    source: ShaderCacheLookupSource::Memory,
                    result: e.into_mut(),
                })
            }
            Entry::Vacant(e) => {
                let result = self.transpiler.transpile(source, target, stage);
                if !result.is_usable() {
                    return Err(result);
                }
                Ok(ShaderCacheLookup {
                    source: ShaderCacheLookupSource::Translated,
                    result: e.insert(result),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::ToolchainConfig;
    use pretty_assertions::assert_eq;

    fn offline_cache() -> ShaderCache {
        ShaderCache::new(ShaderTranspiler::new(
            ToolchainConfig::default().with_sdk_root("/nonexistent/orca-shader-test-sdk"),
        ))
    }

    #[test]
    fn second_lookup_hits_memory() {
        let mut cache = offline_cache();
        let src = "void main(){ gl_Position = vec4(0.0); }";

        let first = cache
            .get_or_transpile(src, ShaderTarget::Glsl, ShaderStage::Vertex)
            .unwrap();
        assert_eq!(first.source, ShaderCacheLookupSource::Translated);
        assert_eq!(first.output, src);

        let second = cache
            .get_or_transpile(src, ShaderTarget::Glsl, ShaderStage::Vertex)
            .unwrap();
        assert_eq!(second.source, ShaderCacheLookupSource::Memory);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stage_and_target_are_part_of_the_key() {
        let mut cache = offline_cache();
        let src = "void main(){}";
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let lookup = cache
                .get_or_transpile(src, ShaderTarget::Glsl, stage)
                .unwrap();
            assert_eq!(lookup.source, ShaderCacheLookupSource::Translated);
        }
        assert_eq!(cache.len(), 2);
        assert_ne!(
            cache_key(src, ShaderTarget::Glsl, ShaderStage::Vertex),
            cache_key(src, ShaderTarget::Hlsl, ShaderStage::Vertex)
        );
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = offline_cache();

        let err = cache
            .get_or_transpile("", ShaderTarget::Glsl, ShaderStage::Vertex)
            .unwrap_err();
        assert!(!err.success);

        // Soft failure: no glslang under the fake SDK root.
        let soft = cache
            .get_or_transpile("void main(){}", ShaderTarget::Vulkan, ShaderStage::Vertex)
            .unwrap_err();
        assert!(soft.success);
        assert!(soft.binary.is_empty());

        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_entries() {
        let mut cache = offline_cache();
        cache
            .get_or_transpile("void main(){}", ShaderTarget::Glsl, ShaderStage::Vertex)
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
