//! Adapter over the C client shared library.
//!
//! The library keeps a single socket in process-global state, so it can only
//! be bound once per process. Its message callback is a bare C function
//! pointer; payloads it receives are forwarded into the inbound sink stored in
//! a process-wide cell that outlives every call the library can make.

use super::{InboundSender, TransportAdapter};
use crate::error::AdapterError;
use async_trait::async_trait;
use libloading::Library;
use once_cell::sync::OnceCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type ConnectFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
type StatusFn = unsafe extern "C" fn() -> c_int;
type SendFn = unsafe extern "C" fn(*const c_char) -> c_int;
type IsConnectedFn = unsafe extern "C" fn() -> bool;
type MessageCallback = extern "C" fn(*const c_char);
type SetCallbackFn = unsafe extern "C" fn(Option<MessageCallback>);

/// Path the library was loaded from. Set at most once per process.
static LOADED_FROM: OnceCell<PathBuf> = OnceCell::new();

/// Sink the C callback forwards into. Never reclaimed.
static NATIVE_SINK: OnceCell<InboundSender> = OnceCell::new();

extern "C" fn deliver_native_message(message: *const c_char) {
    if message.is_null() {
        return;
    }
    // SAFETY: the library passes a NUL-terminated buffer that stays valid for
    // the duration of the callback.
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
    if text.is_empty() {
        return;
    }
    if let Some(sink) = NATIVE_SINK.get() {
        let _ = sink.send(text);
    }
}

/// Resolved entry points of the client library.
#[derive(Debug, Clone, Copy)]
struct NativeApi {
    connect: ConnectFn,
    disconnect: StatusFn,
    send_json: SendFn,
    is_connected: IsConnectedFn,
    process_messages: StatusFn,
    set_message_callback: SetCallbackFn,
}

impl NativeApi {
    /// # Safety
    ///
    /// The symbols must have the C signatures declared above.
    unsafe fn resolve(library: &Library) -> Result<Self, AdapterError> {
        unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, AdapterError> {
            library.get::<T>(name).map(|symbol| *symbol).map_err(|e| {
                let printable = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
                AdapterError::Library(format!("missing symbol {printable}: {e}"))
            })
        }

        Ok(Self {
            connect: symbol(library, b"client_connect\0")?,
            disconnect: symbol(library, b"client_disconnect\0")?,
            send_json: symbol(library, b"client_send_json\0")?,
            is_connected: symbol(library, b"client_is_connected\0")?,
            process_messages: symbol(library, b"client_process_messages\0")?,
            set_message_callback: symbol(library, b"client_set_message_callback\0")?,
        })
    }
}

/// Transport backed by `libclient.so` (or the platform equivalent).
#[derive(Debug)]
pub struct NativeAdapter {
    api: NativeApi,
    path: PathBuf,
    library: Arc<Library>,
}

impl NativeAdapter {
    /// Loads the client library and resolves its entry points.
    ///
    /// # Errors
    ///
    /// * [`AdapterError::Library`] if the file is missing, cannot be opened,
    ///   or lacks one of the required symbols
    /// * [`AdapterError::AlreadyLoaded`] if a library was already bound in
    ///   this process
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        if let Some(existing) = LOADED_FROM.get() {
            debug!("Client library already loaded from {}", existing.display());
            return Err(AdapterError::AlreadyLoaded);
        }
        if !path.exists() {
            return Err(AdapterError::Library(format!(
                "C client library not found: {}",
                path.display()
            )));
        }

        // SAFETY: loading runs the library's initializers; the client library
        // has none beyond zeroing its statics.
        let library = unsafe { Library::new(path) }
            .map_err(|e| AdapterError::Library(format!("{}: {e}", path.display())))?;
        // SAFETY: the declared signatures match the client library's header.
        let api = unsafe { NativeApi::resolve(&library)? };

        LOADED_FROM
            .set(path.to_path_buf())
            .map_err(|_| AdapterError::AlreadyLoaded)?;
        info!("✅ C client library loaded: {}", path.display());

        Ok(Self {
            api,
            path: path.to_path_buf(),
            library: Arc::new(library),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs a potentially blocking library call on the blocking pool while
    /// keeping the library mapped.
    async fn blocking<F>(&self, call: F) -> Result<i32, AdapterError>
    where
        F: FnOnce() -> c_int + Send + 'static,
    {
        let library = Arc::clone(&self.library);
        tokio::task::spawn_blocking(move || {
            let _mapped = library;
            call()
        })
        .await
        .map_err(|e| AdapterError::Worker(e.to_string()))
    }
}

#[async_trait]
impl TransportAdapter for NativeAdapter {
    async fn connect(&self, host: &str, port: u16) -> Result<i32, AdapterError> {
        let host = CString::new(host)
            .map_err(|_| AdapterError::InvalidArgument(format!("host contains NUL: {host:?}")))?;
        let connect = self.api.connect;
        // SAFETY: `host` is moved into the closure and outlives the call.
        self.blocking(move || unsafe { connect(host.as_ptr(), c_int::from(port)) })
            .await
    }

    async fn disconnect(&self) -> Result<i32, AdapterError> {
        // SAFETY: no arguments; closing the socket does not block.
        Ok(unsafe { (self.api.disconnect)() })
    }

    async fn send(&self, payload: &str) -> Result<i32, AdapterError> {
        let payload = CString::new(payload)
            .map_err(|_| AdapterError::InvalidArgument("payload contains NUL".to_string()))?;
        let send_json = self.api.send_json;
        // SAFETY: `payload` is moved into the closure and outlives the call.
        self.blocking(move || unsafe { send_json(payload.as_ptr()) })
            .await
    }

    fn is_connected(&self) -> Result<bool, AdapterError> {
        // SAFETY: reads a flag.
        Ok(unsafe { (self.api.is_connected)() })
    }

    async fn pump_messages(&self) -> Result<i32, AdapterError> {
        // SAFETY: non-blocking receive; callbacks land in `deliver_native_message`.
        Ok(unsafe { (self.api.process_messages)() })
    }

    fn register_inbound(&self, sink: InboundSender) -> Result<(), AdapterError> {
        NATIVE_SINK
            .set(sink)
            .map_err(|_| AdapterError::SinkAlreadyRegistered)?;
        // SAFETY: the callback only touches `NATIVE_SINK`, which is never dropped.
        unsafe { (self.api.set_message_callback)(Some(deliver_native_message)) };
        Ok(())
    }
}
