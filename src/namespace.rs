//! Namespace composition
//!
//! Namespaces are assigned by the execution engine when it instantiates a
//! node: `compose(parent, local)` is a pure function, so reusable node logic
//! never depends on where it sits in a workflow graph.

use crate::store::{StoreError, StoreResult};

/// Validate a dot-segmented namespace path.
///
/// Segments must be non-empty and must not contain `*`.
pub fn validate(namespace: &str) -> StoreResult<()> {
    if namespace.is_empty() {
        return Err(StoreError::invalid_namespace(namespace, "namespace is empty"));
    }
    for segment in namespace.split('.') {
        if segment.is_empty() {
            return Err(StoreError::invalid_namespace(
                namespace,
                "contains an empty segment",
            ));
        }
        if segment.contains('*') {
            return Err(StoreError::invalid_namespace(
                namespace,
                format!("segment '{}' contains a wildcard", segment),
            ));
        }
    }
    Ok(())
}

/// Append `local` to `parent`, e.g. `compose(Some("sales"), "chat")` is
/// `sales.chat`. `local` must be a single segment.
pub fn compose(parent: Option<&str>, local: &str) -> StoreResult<String> {
    if local.contains('.') {
        return Err(StoreError::invalid_namespace(
            local,
            "local segment must not contain '.'",
        ));
    }
    validate(local)?;
    match parent {
        Some(parent) => {
            validate(parent)?;
            Ok(format!("{}.{}", parent, local))
        }
        None => Ok(local.to_string()),
    }
}

/// Number of segments in a valid namespace.
pub fn depth(namespace: &str) -> usize {
    namespace.split('.').count()
}

/// Parent path of `namespace`, if it has more than one segment.
pub fn parent(namespace: &str) -> Option<&str> {
    namespace.rsplit_once('.').map(|(parent, _)| parent)
}
