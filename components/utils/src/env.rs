use snafu::{whatever, Whatever};

/// Reads an environment variable for the current process.
///
/// Compared to [std::env::var] there are a couple of differences:
///
/// - [var] uses [dotenvy] which loads the `.env` file from the current or
///   parent directories before returning the value.
///
/// - [var] returns `Ok(None)` (instead of `Err`) if an environment variable
///   wasn't set.
#[track_caller]
pub fn var(key: &str) -> Result<Option<String>, Whatever> {
    match dotenvy::var(key) {
        Ok(content) => Ok(Some(content)),
        Err(dotenvy::Error::EnvVar(std::env::VarError::NotPresent)) => Ok(None),
        Err(error) => whatever!(Err(error), "Failed to read {key} environment variable"),
    }
}

/// Builds the environment variable name for a config field, e.g.
/// `env_key("TESSERA_VFS_", "cache_mode")` gives `TESSERA_VFS_CACHE_MODE`.
pub fn env_key(prefix: &str, field: &str) -> String {
    format!("{}{}", prefix, field.to_ascii_uppercase())
}
