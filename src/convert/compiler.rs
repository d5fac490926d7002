//! Script compiler seam.
//!
//! The binder asks a [`ScriptCompiler`] for a target-format handle for every
//! legacy source script it needs. Closures work as compilers, which keeps
//! tests free of any filesystem state.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::logutil::escape_log;
use crate::records::{FormId, Record, ScriptHandle};

/// Prefix carried by every converted script and converted editor key.
pub const CONVERTED_PREFIX: &str = "TES4";

/// Extension of a built target script.
pub const BUILT_SCRIPT_EXT: &str = "pex";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct CompileError(pub String);

pub trait ScriptCompiler {
    fn compile(&mut self, script: &Record) -> Result<ScriptHandle, CompileError>;
}

impl<F> ScriptCompiler for F
where
    F: FnMut(&Record) -> Result<ScriptHandle, CompileError>,
{
    fn compile(&mut self, script: &Record) -> Result<ScriptHandle, CompileError> {
        self(script)
    }
}

/// Resolves legacy scripts against a directory of already built target
/// scripts. A script named `Foo` compiles to `TES4Foo` when
/// `<build_dir>/tes4foo.pex` exists.
pub struct BuildDirCompiler {
    build_dir: PathBuf,
    prefix: String,
    cache: HashMap<FormId, ScriptHandle>,
}

impl BuildDirCompiler {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            prefix: CONVERTED_PREFIX.to_string(),
            cache: HashMap::new(),
        }
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.build_dir
            .join(format!("{}.{}", name.to_ascii_lowercase(), BUILT_SCRIPT_EXT))
    }
}

impl ScriptCompiler for BuildDirCompiler {
    fn compile(&mut self, script: &Record) -> Result<ScriptHandle, CompileError> {
        if let Some(handle) = self.cache.get(&script.form_id) {
            return Ok(handle.clone());
        }
        let source = script
            .script()
            .map_err(|e| CompileError(e.to_string()))?;
        let Some(key) = &script.editor_key else {
            return Err(CompileError(format!(
                "script {} has no editor key",
                script.form_id
            )));
        };
        if source.text.trim().is_empty() {
            return Err(CompileError(format!(
                "script {} has no source text",
                escape_log(key.as_str())
            )));
        }

        let name = format!("{}{}", self.prefix, key);
        let artifact = self.artifact_path(&name);
        if !artifact.is_file() {
            return Err(CompileError(format!(
                "no built script at {}",
                artifact.display()
            )));
        }
        log::debug!("resolved {} to {}", escape_log(key.as_str()), artifact.display());
        let handle = ScriptHandle::new(name, script.form_id);
        self.cache.insert(script.form_id, handle.clone());
        Ok(handle)
    }
}
