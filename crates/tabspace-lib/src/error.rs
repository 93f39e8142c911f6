use thiserror::Error;

use crate::reorder::ReorderError;
use crate::types::WorkspaceId;

/// Invalid input to a mutating call. Reported straight back to the caller
/// and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workspace name must not be empty")]
    EmptyName,

    #[error("tab title must not be empty")]
    EmptyTitle,

    #[error("workspace id already exists: {0}")]
    DuplicateId(WorkspaceId),

    #[error(transparent)]
    Reorder(#[from] ReorderError),
}

/// Trims `raw` and rejects names that are blank afterwards.
pub fn normalize_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Same as [`normalize_name`] but for tab titles.
pub fn normalize_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(normalize_name("  work  ").unwrap(), "work");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(normalize_name("   \t"), Err(ValidationError::EmptyName));
        assert_eq!(normalize_name(""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn blank_titles_are_rejected() {
        assert_eq!(normalize_title(" "), Err(ValidationError::EmptyTitle));
        assert_eq!(normalize_title(" Docs ").unwrap(), "Docs");
    }
}
