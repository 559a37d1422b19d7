//! Runtime lookup for work started from host callbacks, which may run on
//! threads outside any Tokio context.

use tokio::runtime::Handle;

/// The ambient runtime if the caller is inside one, else `captured`.
pub(crate) fn resolve(captured: Option<&Handle>) -> Option<Handle> {
    Handle::try_current().ok().or_else(|| captured.cloned())
}
