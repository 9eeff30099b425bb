/// Middleware modules for the API server
///
/// - `access`: Runs the access control gate in front of protected routes
/// - `security`: Security response headers

pub mod access;
pub mod security;
