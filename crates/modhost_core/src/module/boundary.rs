//! Per-module error boundary.
//!
//! Every module callback goes through [`guard`]. Returned errors pass through
//! unchanged; panics are caught and turned into a [`HookError`] so a defective
//! module cannot unwind into the host or into other modules.

use crate::module::descriptor::{HookError, HookResult};
use log::warn;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

const MAX_PANIC_MESSAGE_CHARS: usize = 160;

/// Invokes one module callback and captures its failure.
pub fn guard<T>(
    module_id: &str,
    callback: &'static str,
    f: impl FnOnce() -> HookResult<T>,
) -> HookResult<T> {
    let outcome = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HookError::new(format!(
            "{callback} panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };

    if let Err(err) = &outcome {
        warn!(
            "event=module_callback module=boundary status=error module_id={module_id} callback={callback} error={err}"
        );
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    message
        .replace(['\n', '\r'], " ")
        .chars()
        .take(MAX_PANIC_MESSAGE_CHARS)
        .collect()
}
