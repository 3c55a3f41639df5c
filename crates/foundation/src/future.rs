use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that can be sent between threads.
///
/// Store and auth traits return this instead of `async fn` so they stay
/// dyn-compatible (`Arc<dyn PointStore>` and friends).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
