/// Error types shared across discovery server crates.
///
/// These cover the upstream data sources (Supabase, the CSV seed file) that feed a
/// school catalog. Server crates define their own error enum and wrap `CommonError`
/// via `#[from]`. Redis failures never surface here: the cache degrades instead.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("supabase error: {0}")]
    Supabase(#[from] crate::supabase::SupabaseError),

    #[error("seed csv error: {0}")]
    Seed(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
