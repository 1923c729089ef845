use super::ToolDraft;
use crate::error::ConversionError;

/// A trait for custom authoring formats that can be converted into a
/// [`ToolDraft`].
///
/// This is the extension point for callers whose builder UI persists tools in
/// its own shape: implement `IntoToolDraft` on the raw structs and hand the
/// result to [`ToolCompiler`](crate::compile::ToolCompiler).
pub trait IntoToolDraft {
    /// Consumes the object and converts it into a canonical tool definition.
    fn into_draft(self) -> Result<ToolDraft, ConversionError>;
}

impl IntoToolDraft for ToolDraft {
    fn into_draft(self) -> Result<ToolDraft, ConversionError> {
        Ok(self)
    }
}
