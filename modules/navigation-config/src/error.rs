use thiserror::Error;

/// Result type alias for navigation configuration operations.
pub type Result<T> = std::result::Result<T, NavError>;

/// Which kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Section,
    Page,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Section => write!(f, "section"),
            RecordKind::Page => write!(f, "page"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NavError {
    /// Required field missing or malformed. Nothing was changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Delete refused because the target (or one of its pages) is live.
    #[error("deletion blocked: {0}")]
    DeletionBlocked(DeletionBlocked),

    /// The referenced record no longer exists.
    #[error("{kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },

    /// The store failed. Nothing can be assumed about partial success.
    #[error("persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl NavError {
    pub fn validation(msg: impl Into<String>) -> Self {
        NavError::Validation(msg.into())
    }

    pub fn section_not_found(key: impl Into<String>) -> Self {
        NavError::NotFound {
            kind: RecordKind::Section,
            key: key.into(),
        }
    }

    pub fn page_not_found(key: impl Into<String>) -> Self {
        NavError::NotFound {
            kind: RecordKind::Page,
            key: key.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        NavError::Persistence(msg.into())
    }

    /// Only store failures may be retried with the exact same batch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NavError::Persistence(_))
    }

    /// Short machine-readable kind, used by API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NavError::Validation(_) => "validation_error",
            NavError::DeletionBlocked(_) => "deletion_blocked",
            NavError::NotFound { .. } => "not_found",
            NavError::Persistence(_) => "persistence_error",
        }
    }
}

impl From<DeletionBlocked> for NavError {
    fn from(blocked: DeletionBlocked) -> Self {
        NavError::DeletionBlocked(blocked)
    }
}

/// Why a delete was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionBlocked {
    /// The page is still shown in navigation.
    PageVisible { page_key: String },
    /// A non-cascaded section delete found visible pages.
    SectionHasVisiblePages {
        section_key: String,
        visible_pages: Vec<String>,
    },
    /// The implicit ungrouped section can never be deleted.
    ReservedSection,
}

impl DeletionBlocked {
    /// What the operator has to do before retrying.
    pub fn remediation(&self) -> String {
        match self {
            DeletionBlocked::PageVisible { page_key } => {
                format!("hide page '{page_key}' first, then delete it")
            }
            DeletionBlocked::SectionHasVisiblePages { visible_pages, .. } => format!(
                "hide {} first ({}), or delete the section with cascade",
                if visible_pages.len() == 1 { "this page" } else { "these pages" },
                visible_pages.join(", ")
            ),
            DeletionBlocked::ReservedSection => {
                "the ungrouped section is built in and cannot be deleted".to_string()
            }
        }
    }
}

impl std::fmt::Display for DeletionBlocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionBlocked::PageVisible { page_key } => {
                write!(f, "page '{page_key}' is visible")
            }
            DeletionBlocked::SectionHasVisiblePages {
                section_key,
                visible_pages,
            } => write!(
                f,
                "section '{section_key}' has {} visible page(s)",
                visible_pages.len()
            ),
            DeletionBlocked::ReservedSection => write!(f, "section is reserved"),
        }
    }
}

impl From<sqlx::Error> for NavError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    return NavError::Validation(format!(
                        "duplicate value violates {}",
                        db.constraint().unwrap_or("a unique constraint")
                    ));
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    let detail = db
                        .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                        .and_then(|pg| pg.detail());
                    return missing_section(detail);
                }
                _ => {}
            }
        }
        NavError::Persistence(Box::new(err))
    }
}

/// Map a foreign-key failure on `section_key` to the section that was missing.
///
/// Postgres reports the offending value in the detail line, e.g.
/// `Key (section_key)=(labs) is not present in table "navigation_sections".`
fn missing_section(detail: Option<&str>) -> NavError {
    let key = detail
        .and_then(|d| d.strip_prefix("Key (section_key)=("))
        .and_then(|rest| rest.split_once(") is not present"))
        .map(|(key, _)| key);
    match key {
        Some(key) => NavError::section_not_found(key),
        None => NavError::validation(
            "page references a section that no longer exists; refresh and retry",
        ),
    }
}

impl From<sqlx::migrate::MigrateError> for NavError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        NavError::Persistence(Box::new(err))
    }
}
