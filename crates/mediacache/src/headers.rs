//! Header injection for outgoing requests.

use std::collections::HashMap;

/// Capability for attaching deployment-specific headers (auth, cookies) to
/// every outgoing request, without the engine knowing their shape.
pub trait HeaderInjector: Send + Sync {
    /// Headers to add to a request against `url`.
    fn add_headers(&self, url: &str) -> HashMap<String, String>;
}

/// Injector that adds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyHeaderInjector;

impl HeaderInjector for EmptyHeaderInjector {
    fn add_headers(&self, _url: &str) -> HashMap<String, String> {
        HashMap::new()
    }
}
