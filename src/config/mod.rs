/// Layered configuration: compiled-in defaults, an optional user file, then CLI flags and environment.
pub mod file;
pub mod runtime;
