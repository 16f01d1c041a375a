use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

/// Runs `f`, turning a panic into its message.
pub(crate) fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, Arc<str>> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(&*payload))
}

fn panic_message(payload: &(dyn Any + Send)) -> Arc<str> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        Arc::from(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        Arc::from(msg.as_str())
    } else {
        Arc::from("Box<dyn Any>")
    }
}
