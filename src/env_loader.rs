use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(varc_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    match (varc_home, home_dir) {
        (Some(varc_home), _) => Some(varc_home.join(".env")),
        (None, Some(home)) => Some(home.join(".varc").join(".env")),
        (None, None) => None,
    }
}

/// Load `.env` from the working directory, else from `$VARC_HOME/.env` or
/// `~/.varc/.env`. Variables already set are never overwritten.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("VARC_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_prefers_varc_home() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/vault/.varc")),
            Some(PathBuf::from("/home/alice")),
        );
        assert_eq!(got, Some(PathBuf::from("/vault/.varc/.env")));
    }

    #[test]
    fn fallback_uses_home_dot_varc_when_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        assert_eq!(got, Some(PathBuf::from("/home/alice/.varc/.env")));
    }

    #[test]
    fn no_fallback_without_any_home() {
        assert_eq!(fallback_dotenv_path(None, None), None);
    }
}
