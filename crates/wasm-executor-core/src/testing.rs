//! Scripted backend for unit tests.
//!
//! [`MockBackend`] accepts any module, counts how often it is asked to
//! compile and to enumerate exports, and can hold compilation open until a
//! test releases it.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use wasm_executor_common::ExecutorError;

use crate::backend::{Backend, CallError, ExportDescriptor, RawValType, Value};

#[derive(Default)]
pub(crate) struct MockBackend {
    compiles: AtomicUsize,
    export_scans: AtomicUsize,
    unsupported: AtomicBool,
    /// Compilation waits for a read guard; hold the write guard to stall it.
    pub(crate) compile_gate: RwLock<()>,
}

impl MockBackend {
    pub(crate) fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub(crate) fn export_scans(&self) -> usize {
        self.export_scans.load(Ordering::SeqCst)
    }

    /// Make the exported function take an `f32` so catalog builds fail.
    pub(crate) fn set_unsupported(&self, unsupported: bool) {
        self.unsupported.store(unsupported, Ordering::SeqCst);
    }
}

impl Backend for MockBackend {
    type Module = ();
    type Instance = ();

    fn name(&self) -> &'static str {
        "mock"
    }

    fn validate(&self, _path: &str, _wasm: &[u8]) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn compile(&self, _path: &str, _wasm: &[u8]) -> Result<(), ExecutorError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let _open = self.compile_gate.read();
        Ok(())
    }

    fn instantiate(&self, _path: &str, _module: ()) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn exports(&self, _instance: &()) -> Vec<ExportDescriptor> {
        self.export_scans.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent callers could race the build
        std::thread::sleep(Duration::from_millis(20));

        let params = if self.unsupported.load(Ordering::SeqCst) {
            vec![RawValType::F32]
        } else {
            vec![RawValType::I64]
        };
        vec![ExportDescriptor::function("get", params, vec![RawValType::I64])]
    }

    fn call(
        &self,
        _instance: &mut (),
        _function: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        match args {
            [Value::I64(n)] => Ok(Value::I64(*n)),
            _ => Err(CallError::MissingFunction),
        }
    }
}

/// An empty text module on disk.
pub(crate) fn empty_module() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".wat").tempfile().unwrap();
    file.write_all(b"(module)").unwrap();
    file
}
