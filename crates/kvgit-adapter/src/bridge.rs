//! The one place where synchronous callers wait on asynchronous store calls.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::error::{AdapterError, AdapterResult};

/// Runs store futures to completion for a blocking caller.
///
/// Every future is spawned onto a multi-threaded tokio runtime, so store I/O
/// and background uploads run on its worker threads while the calling thread
/// only parks until the result is ready. Calls must come from outside that
/// runtime.
#[derive(Clone, Debug)]
pub struct BlockingBridge {
    handle: Handle,
    _runtime: Option<Arc<Runtime>>,
}

impl BlockingBridge {
    /// Start a dedicated I/O runtime.
    pub fn new() -> AdapterResult<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("kvgit-io")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Share an existing multi-threaded runtime.
    ///
    /// A current-thread runtime cannot make progress on background uploads
    /// while the caller is parked, so it is rejected.
    pub fn from_handle(handle: Handle) -> AdapterResult<Self> {
        if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(AdapterError::Runtime(
                "a multi-threaded runtime is required".into(),
            ));
        }
        Ok(Self {
            handle,
            _runtime: None,
        })
    }

    /// Runtime that store work is spawned on.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Run `future` on the runtime's workers and block the current thread
    /// until it completes.
    pub fn block_on<F>(&self, future: F) -> AdapterResult<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle
            .block_on(self.handle.spawn(future))
            .map_err(|e| AdapterError::Runtime(e.to_string()))
    }
}
