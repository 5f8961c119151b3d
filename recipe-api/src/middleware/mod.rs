/// Middleware modules for the API server
///
/// Token authentication lives in `app` next to the router, since it needs
/// the application state.

pub mod security;
