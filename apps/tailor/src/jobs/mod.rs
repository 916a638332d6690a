// Asynchronous generation jobs: enqueue, poll, cancel, download.
// Workers run the same pipeline as the CLI and the synchronous endpoint.

pub mod handlers;
pub mod queue;
pub mod store;
