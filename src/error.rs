use thiserror::Error;

/// Failures while loading the practice catalog. Everything except
/// `DuplicateIdentity` means the source itself is unusable.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("practice data could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("practice data is malformed: {0}")]
    Malformed(#[from] csv::Error),
    #[error("practice data has no `{0}` column")]
    MissingColumn(String),
    #[error("row {row}: `{column}` is empty")]
    MissingField { row: usize, column: String },
    #[error("row {row}: practice `{practice}` has no usable `{column}` figure")]
    MissingFigure {
        row: usize,
        practice: String,
        column: String,
    },
    #[error("practice `{0}` appears more than once")]
    DuplicateIdentity(String),
}

impl CatalogError {
    pub fn is_data_load(&self) -> bool {
        !matches!(self, Self::DuplicateIdentity(_))
    }
}

/// Recoverable failures of a session action. None of them leave partial state.
#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("select one or more GP practices")]
    EmptySelection,
    #[error("give the place a name")]
    MissingName,
    #[error("a place called `{0}` already exists")]
    DuplicateName(String),
    #[error("practice `{0}` is selected more than once")]
    RepeatedPractice(String),
    #[error("practice `{practice}` is already assigned to `{place}`")]
    AlreadyClaimed { practice: String, place: String },
    #[error("practice `{0}` is not in the catalog")]
    UnknownPractice(String),
    #[error("practice `{practice}` belongs to `{actual}`, not `{region}`")]
    OutsideRegion {
        practice: String,
        region: String,
        actual: String,
    },
    #[error("result table does not end with a region total")]
    MissingRegionTotal,
    #[error("cannot index `{row}`: its GP population is zero")]
    DivisionByZero { row: String },
}
