//! Free-form composition annotations

/// A name/text pair attached to the composition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserComment {
    pub name: Option<String>,
    pub text: Option<String>,
}

impl UserComment {
    /// Creates a comment with both fields set
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            text: Some(text.into()),
        }
    }
}
