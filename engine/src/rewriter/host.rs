use crate::dom::DomError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("no document is loaded")]
    NoDocument,
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("{0}")]
    Other(String),
}

/// The page a rewrite pass runs against.
///
/// Reads take `&self`. Hosts that cache layout recompute it after any
/// mutation, so `rendered_width` always reflects the current tree.
pub trait DocumentHost {
    type Element: Copy + fmt::Debug;

    /// Elements carrying `class`, in document order.
    fn candidates(&self, class: &str) -> Result<Vec<Self::Element>, HostError>;

    /// `Ok(None)` when the attribute is absent. An empty value is present.
    fn attribute(&self, element: Self::Element, name: &str) -> Result<Option<String>, HostError>;

    /// Rounded border-box width in CSS pixels; 0 when the element has no box.
    fn rendered_width(&self, element: Self::Element) -> Result<u32, HostError>;

    fn set_source(&mut self, element: Self::Element, url: &str) -> Result<(), HostError>;

    /// Sets the inline `background-image` to `css_value`, e.g. `url(/img/0/a.png)`.
    fn set_background_image(
        &mut self,
        element: Self::Element,
        css_value: &str,
    ) -> Result<(), HostError>;
}
