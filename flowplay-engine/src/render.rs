use flowplay_base::LookupKey;

/// Fire-and-forget render signal, invoked after every successful model
/// mutation and loading toggle. The engine never observes a return value.
pub trait RenderHook: Send + Sync {
  fn render(&self, key: &LookupKey);
}

/// Render hook that does nothing, for headless use.
pub struct NoopRenderHook;

impl RenderHook for NoopRenderHook {
  fn render(&self, _key: &LookupKey) {}
}
