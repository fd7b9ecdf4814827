use std::{future::Future, io, thread};

use tokio::runtime::{Builder, Handle, RuntimeFlavor};

/// Drive `future` to completion from synchronous code.
///
/// Inside a multi-threaded runtime the current worker is handed over with
/// `block_in_place`. Inside a current-thread runtime, or outside any
/// runtime, the future runs on a fresh runtime owned by a scoped thread.
pub fn block_on<F>(future: F) -> io::Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    if let Ok(handle) = Handle::try_current()
        && handle.runtime_flavor() == RuntimeFlavor::MultiThread
    {
        return Ok(tokio::task::block_in_place(|| handle.block_on(future)));
    }

    thread::scope(|scope| {
        scope
            .spawn(|| {
                let runtime = Builder::new_multi_thread().enable_all().build()?;
                Ok(runtime.block_on(future))
            })
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}
