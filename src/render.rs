//! Rendering resource templates onto existing documents.

use crate::resource::{GroupVersionKind, Unstructured};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot unmarshal JSON data: {0}")]
    UnmarshalJson(#[source] serde_json::Error),

    #[error(
        "cannot change the kind of a composed resource from {from} to {to} (possible composed resource template mismatch)"
    )]
    KindChanged {
        from: GroupVersionKind,
        to: GroupVersionKind,
    },
}

/// Renders `data` onto `target`.
///
/// The template replaces the target's content, after which the target's
/// previous name and namespace are restored. If the target already had an
/// `apiVersion`/`kind` and the template changes it, this fails with
/// [`RenderError::KindChanged`]; the name is restored even then.
pub fn render_from_json(target: &mut Unstructured, data: &[u8]) -> Result<(), RenderError> {
    let gvk = target.gvk();
    let name = target.name().to_string();
    let namespace = target.namespace().to_string();

    *target = serde_json::from_slice(data).map_err(RenderError::UnmarshalJson)?;

    target.set_name(&name);
    target.set_namespace(&namespace);

    let rendered = target.gvk();
    if !gvk.is_empty() && rendered != gvk {
        return Err(RenderError::KindChanged {
            from: gvk,
            to: rendered,
        });
    }

    Ok(())
}
