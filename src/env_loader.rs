use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(library_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = library_home {
        return Some(base.join(".env"));
    }
    Some(home_dir?.join(".image_library/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("IMGLIB_HOME").map(PathBuf::from),
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
    fn fallback_uses_library_home_directly() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/photos")),
            Some(PathBuf::from("/home/alice")),
        );

        assert_eq!(got, Some(PathBuf::from("/srv/photos/.env")));
    }

    #[test]
    fn fallback_uses_dot_dir_under_home_when_library_home_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        let want = Some(PathBuf::from("/home/alice/.image_library/.env"));
        assert_eq!(got, want);
    }

    #[test]
    fn fallback_is_none_without_any_home() {
        assert_eq!(fallback_dotenv_path(None, None), None);
    }
}
