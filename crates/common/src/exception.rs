//! The error surface shared by every crate in the workspace.

/// An error that crosses a component boundary.
///
/// Every such error carries a stable machine-readable code alongside its
/// human-readable message.
pub trait Exception: std::error::Error {
    /// Returns the stable error code (e.g. `DOMAIN_MAPPING_FAILED`).
    fn code(&self) -> &str;

    /// Returns the human-readable message.
    fn message(&self) -> String {
        self.to_string()
    }
}
