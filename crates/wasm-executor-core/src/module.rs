//! Module loading.
//!
//! Turns a path on disk into a live instance:
//!
//! 1. Read the file in full.
//! 2. Detect the format. Bytes starting with `\0asm` are a binary module,
//!    anything else is parsed as WebAssembly text.
//! 3. Check that a binary module decodes section by section.
//! 4. Validate, compile and instantiate through the [`Backend`].
//!
//! Each step maps its failure to its own [`ExecutorError`] variant so that a
//! missing file, a malformed module and a failing start function can be told
//! apart.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument};
use wasmparser::{Encoding, Parser, Payload};
use wast::Wat;
use wast::parser::{self, ParseBuffer};

use wasm_executor_common::{ExecutorError, InstanceId};

use crate::ModuleInstance;
use crate::backend::Backend;

const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// Encoding of a module file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// Binary WebAssembly.
    Binary,
    /// WebAssembly text, converted to binary on load.
    Text,
}

/// Module bytes read from disk, normalized to binary.
#[derive(Clone)]
pub struct ModuleSource {
    path: PathBuf,
    format: ModuleFormat,
    wasm: Vec<u8>,
    content_hash: String,
}

impl ModuleSource {
    /// Read a module file.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Load`] if the file cannot be read and
    /// [`ExecutorError::Compile`] if its contents are neither a decodable
    /// binary module nor parseable text.
    pub fn read(path: &Path) -> Result<Self, ExecutorError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ExecutorError::load(path.display().to_string(), e))?;
        Self::from_bytes(path, bytes)
    }

    /// Build a source from bytes already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Compile`] if the bytes are not a module.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, ExecutorError> {
        let display = path.display().to_string();

        let (format, wasm) = if bytes.starts_with(WASM_MAGIC) {
            check_structure(&display, &bytes)?;
            (ModuleFormat::Binary, bytes)
        } else {
            let text = std::str::from_utf8(&bytes).map_err(|_| {
                ExecutorError::compile(&display, "not a binary module and not UTF-8 text")
            })?;
            (ModuleFormat::Text, parse_text(&display, text)?)
        };

        let content_hash = compute_hash(&wasm);

        Ok(Self {
            path: path.to_path_buf(),
            format,
            wasm,
            content_hash,
        })
    }

    /// Path the module was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original encoding of the file.
    pub fn format(&self) -> ModuleFormat {
        self.format
    }

    /// Binary module bytes.
    pub fn wasm(&self) -> &[u8] {
        &self.wasm
    }

    /// Hash of the binary module bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

impl std::fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleSource")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("bytes_len", &self.wasm.len())
            .finish_non_exhaustive()
    }
}

/// Load, validate, compile and instantiate the module at `path`.
///
/// # Errors
///
/// Returns the [`ExecutorError`] of the first step that failed. Nothing is
/// retained on failure.
#[instrument(skip(backend), fields(backend = backend.name(), path = %path.display()))]
pub fn load<B: Backend>(
    backend: &B,
    id: InstanceId,
    path: &Path,
) -> Result<ModuleInstance<B>, ExecutorError> {
    let start = Instant::now();

    let source = ModuleSource::read(path)?;
    let display = path.display().to_string();

    debug!(
        format = ?source.format(),
        bytes_len = source.wasm().len(),
        "Module read"
    );

    backend.validate(&display, source.wasm())?;
    let module = backend.compile(&display, source.wasm())?;
    let handle = backend.instantiate(&display, module)?;

    info!(
        instance_id = %id,
        content_hash = %source.content_hash(),
        duration_ms = start.elapsed().as_millis(),
        "Module instantiated"
    );

    Ok(ModuleInstance::new(id, &source, handle))
}

/// Decode every section header of a binary module.
///
/// Catches bytes that are not a module at all (bad version, unknown section
/// id, truncation) before validation looks at types and instructions.
fn check_structure(path: &str, bytes: &[u8]) -> Result<(), ExecutorError> {
    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload
            .map_err(|e| ExecutorError::compile(path, format!("malformed binary module: {e}")))?;

        if let Payload::Version {
            encoding: Encoding::Component,
            ..
        } = payload
        {
            return Err(ExecutorError::compile(
                path,
                "component binaries are not supported",
            ));
        }
    }

    Ok(())
}

/// Convert WebAssembly text to a binary module.
///
/// Errors report the parser message and its line and column only. The
/// offending source line is not included, since the file may not be a
/// module at all.
fn parse_text(path: &str, text: &str) -> Result<Vec<u8>, ExecutorError> {
    let describe = |e: &wast::Error| {
        let (line, col) = e.span().linecol_in(text);
        ExecutorError::compile(
            path,
            format!(
                "invalid text module: {} at line {}, column {}",
                e.message(),
                line + 1,
                col + 1
            ),
        )
    };

    let buffer = ParseBuffer::new(text).map_err(|e| describe(&e))?;
    let mut module = parser::parse::<Wat>(&buffer).map_err(|e| describe(&e))?;
    module.encode().map_err(|e| describe(&e))
}

/// Compute a hash of the given bytes.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal valid Wasm module (empty module)
    const MINIMAL_WASM: &[u8] = &[
        0x00, 0x61, 0x73, 0x6d, // magic: \0asm
        0x01, 0x00, 0x00, 0x00, // version: 1
    ];

    #[test]
    fn test_check_structure_valid() {
        assert!(check_structure("m.wasm", MINIMAL_WASM).is_ok());
    }

    #[test]
    fn test_check_structure_too_small() {
        let result = check_structure("m.wasm", &[0x00, 0x61, 0x73, 0x6d]);
        assert!(matches!(result, Err(ExecutorError::Compile { .. })));
    }

    #[test]
    fn test_check_structure_unknown_version() {
        let bytes = [0x00, 0x61, 0x73, 0x6d, 0x02, 0x00, 0x00, 0x00];
        assert!(matches!(
            check_structure("m.wasm", &bytes),
            Err(ExecutorError::Compile { .. })
        ));
    }

    #[test]
    fn test_check_structure_bad_section_id() {
        let mut bytes = MINIMAL_WASM.to_vec();
        bytes.extend_from_slice(&[0xff, 0xff, 0xff]);

        let err = check_structure("m.wasm", &bytes).unwrap_err();
        assert!(matches!(err, ExecutorError::Compile { .. }));
        assert!(err.to_string().contains("malformed binary module"));
    }

    #[test]
    fn test_check_structure_rejects_components() {
        let component = [0x00, 0x61, 0x73, 0x6d, 0x0d, 0x00, 0x01, 0x00];
        let err = check_structure("c.wasm", &component).unwrap_err();
        assert!(err.to_string().contains("component"));
    }

    #[test]
    fn test_binary_source() {
        let source = ModuleSource::from_bytes(Path::new("m.wasm"), MINIMAL_WASM.to_vec()).unwrap();
        assert_eq!(source.format(), ModuleFormat::Binary);
        assert_eq!(source.wasm(), MINIMAL_WASM);
    }

    #[test]
    fn test_text_source() {
        let source =
            ModuleSource::from_bytes(Path::new("m.wat"), b"(module)".to_vec()).unwrap();
        assert_eq!(source.format(), ModuleFormat::Text);
        assert!(source.wasm().starts_with(WASM_MAGIC));
    }

    #[test]
    fn test_unparseable_text_is_compile_error() {
        let err = ModuleSource::from_bytes(Path::new("m.wat"), b"(module (func".to_vec())
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Compile { .. }));
    }

    #[test]
    fn test_text_error_reports_position_without_source() {
        let text = b"(module)\nsecret_token=abc123\n".to_vec();
        let err = ModuleSource::from_bytes(Path::new("m.wat"), text).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("line 2"), "{message}");
        assert!(!message.contains("abc123"), "{message}");
    }

    #[test]
    fn test_non_utf8_is_compile_error() {
        let err =
            ModuleSource::from_bytes(Path::new("m.bin"), vec![0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ExecutorError::Compile { .. }));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = ModuleSource::read(Path::new("/definitely/not/here.wasm")).unwrap_err();
        match err {
            ExecutorError::Load { path, source } => {
                assert!(path.contains("here.wasm"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_compute_hash() {
        let hash1 = compute_hash(b"hello");
        let hash2 = compute_hash(b"hello");
        let hash3 = compute_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 16);
    }
}
