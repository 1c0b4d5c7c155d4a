use crate::{Call, Capability, Transport, TransportKind};
use async_std::task;
use async_trait::async_trait;
use kcriff_core::RequestError;
use libloading::Library;
use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

type NoArgFn = unsafe extern "C" fn() -> *const c_char;
type NameArgFn = unsafe extern "C" fn(*const c_char) -> *const c_char;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("failed to load library: {0}")]
    Load(String),
    #[error("missing entry point {}", .0.symbols().join(" or "))]
    MissingSymbol(Capability),
}

/// File name of the binding on this platform.
pub fn library_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "kcriff.dll"
    } else if cfg!(target_os = "macos") {
        "libkcriff.dylib"
    } else {
        "libkcriff.so"
    }
}

struct EntryPoints {
    get_models: NoArgFn,
    start_download: NameArgFn,
    get_status: NameArgFn,
    remove_model: NameArgFn,
    check_updates: NoArgFn,
    apply_update: NoArgFn,
    health_check: NoArgFn,
}

struct Binding {
    entry: EntryPoints,
    // Entry point pointers are only valid while the library stays loaded.
    _library: Library,
}

impl Binding {
    fn invoke(&self, call: &Call) -> Result<String, RequestError> {
        let entry = &self.entry;
        let reply = match call {
            Call::ListModels => unsafe { (entry.get_models)() },
            Call::StartDownload(name) => {
                let arg = c_arg(name)?;
                unsafe { (entry.start_download)(arg.as_ptr()) }
            }
            Call::GetDownloadStatus(name) => {
                let arg = c_arg(name)?;
                unsafe { (entry.get_status)(arg.as_ptr()) }
            }
            Call::RemoveModel(name) => {
                let arg = c_arg(name)?;
                unsafe { (entry.remove_model)(arg.as_ptr()) }
            }
            Call::CheckForUpdates => unsafe { (entry.check_updates)() },
            Call::ApplyUpdate => unsafe { (entry.apply_update)() },
            Call::HealthCheck => unsafe { (entry.health_check)() },
        };
        read_reply(reply, call.capability())
    }
}

/// In-process binding loaded from a shared library.
pub struct NativeTransport {
    path: PathBuf,
    binding: Arc<Binding>,
}

impl NativeTransport {
    /// Loads `path` and resolves every entry point. A library missing any of them is
    /// rejected.
    pub fn load(path: &Path) -> Result<Self, BindingError> {
        // Loading runs the library's initialisers; candidates only come from the
        // configured and well-known install locations.
        let library =
            unsafe { Library::new(path) }.map_err(|e| BindingError::Load(e.to_string()))?;

        let entry = unsafe {
            EntryPoints {
                get_models: symbol(&library, Capability::ListModels)?,
                start_download: symbol(&library, Capability::StartDownload)?,
                get_status: symbol(&library, Capability::GetDownloadStatus)?,
                remove_model: symbol(&library, Capability::RemoveModel)?,
                check_updates: symbol(&library, Capability::CheckForUpdates)?,
                apply_update: symbol(&library, Capability::ApplyUpdate)?,
                health_check: symbol(&library, Capability::HealthCheck)?,
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            binding: Arc::new(Binding {
                entry,
                _library: library,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for NativeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Native
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn call(&self, call: Call) -> Result<String, RequestError> {
        let binding = Arc::clone(&self.binding);
        // Binding calls block; keep them off the executor threads.
        task::spawn_blocking(move || binding.invoke(&call)).await
    }
}

unsafe fn symbol<T: Copy>(library: &Library, capability: Capability) -> Result<T, BindingError> {
    for name in capability.symbols() {
        if let Ok(sym) = library.get::<T>(name.as_bytes()) {
            return Ok(*sym);
        }
    }
    Err(BindingError::MissingSymbol(capability))
}

fn c_arg(name: &str) -> Result<CString, RequestError> {
    CString::new(name)
        .map_err(|_| RequestError::Binding(format!("model name {:?} contains a NUL byte", name)))
}

// The binding keeps ownership of the returned buffer; it is copied and never freed here.
fn read_reply(ptr: *const c_char, capability: Capability) -> Result<String, RequestError> {
    if ptr.is_null() {
        return Err(RequestError::NoReply(capability.symbol().to_string()));
    }
    Ok(unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned())
}
