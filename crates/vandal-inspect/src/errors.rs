use thiserror::Error;

/// Misuse of the view algebra. These indicate a malformed rule rather than a
/// bad trace: they panic in debug builds and surface as errors in release.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no current link; link to another view before filtering links")]
    NoCurrentLink,
    #[error("cannot merge views with working sets of different sizes ({0} vs {1})")]
    ShapeMismatch(usize, usize),
}
