//! Wallpapers through `awww` and color generation through `matugen`.

use super::{launch, query, SystemError};
use crate::traits::CommandRunner;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// `awww img` arguments after the path.
const TRANSITION_ARGS: &str =
    "-t wipe --transition-duration 3 --transition-bezier .17,.67,.48,1.01 --transition-fps 60";

/// Material You scheme variants understood by `matugen --type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorScheme {
    Content,
    Expressive,
    Fidelity,
    FruitSalad,
    Monochrome,
    Neutral,
    Rainbow,
    #[default]
    TonalSpot,
    Vibrant,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 9] = [
        ColorScheme::Content,
        ColorScheme::Expressive,
        ColorScheme::Fidelity,
        ColorScheme::FruitSalad,
        ColorScheme::Monochrome,
        ColorScheme::Neutral,
        ColorScheme::Rainbow,
        ColorScheme::TonalSpot,
        ColorScheme::Vibrant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorScheme::Content => "scheme-content",
            ColorScheme::Expressive => "scheme-expressive",
            ColorScheme::Fidelity => "scheme-fidelity",
            ColorScheme::FruitSalad => "scheme-fruit-salad",
            ColorScheme::Monochrome => "scheme-monochrome",
            ColorScheme::Neutral => "scheme-neutral",
            ColorScheme::Rainbow => "scheme-rainbow",
            ColorScheme::TonalSpot => "scheme-tonal-spot",
            ColorScheme::Vibrant => "scheme-vibrant",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorScheme {
    type Err = SystemError;

    /// Accepts `scheme-tonal-spot` as well as the bare `tonal-spot`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let wanted = s.strip_prefix("scheme-").unwrap_or(s);
        ColorScheme::ALL
            .into_iter()
            .find(|c| c.as_str().trim_start_matches("scheme-") == wanted)
            .ok_or_else(|| SystemError::UnknownScheme(s.to_string()))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, sorted by path.
pub fn list(dir: &Path) -> Result<Vec<PathBuf>, SystemError> {
    let entries = std::fs::read_dir(dir).map_err(|source| SystemError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    images.sort();
    Ok(images)
}

/// Extract the displayed image from `awww query` output, which looks like
/// `eDP-1: 1920x1080, scale: 1, currently displaying: image: /path/a.png`.
pub fn parse_current_image(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once("image: ")?;
        let path = rest.split(':').next()?.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    })
}

/// Show `image` with a wipe transition, then regenerate colors from it.
///
/// Both steps run in one detached shell so matugen starts only after awww
/// succeeded.  The path and scheme are passed as positional arguments, never
/// interpolated into the script.
pub fn apply<R: CommandRunner + ?Sized>(
    runner: &R,
    image: &Path,
    scheme: ColorScheme,
) -> Result<(), SystemError> {
    let path = image.to_string_lossy();
    let script = format!(
        "awww img \"$1\" {} && matugen image --type \"$2\" \"$1\"",
        TRANSITION_ARGS
    );
    launch(runner, "sh", &["-c", script.as_str(), "sh", &*path, scheme.as_str()])
}

/// Regenerate colors with `scheme` from `image`, or from whatever `awww`
/// currently displays when `image` is `None`.
pub fn regenerate_colors<R: CommandRunner + ?Sized>(
    runner: &R,
    scheme: ColorScheme,
    image: Option<&Path>,
) -> Result<(), SystemError> {
    let image = match image {
        Some(path) => path.to_path_buf(),
        None => {
            let out = query(runner, "awww", &["query"])?;
            parse_current_image(&out).ok_or_else(|| SystemError::Parse {
                program: "awww query".into(),
                output: out,
            })?
        }
    };
    let path = image.to_string_lossy();
    launch(runner, "matugen", &["image", "--type", scheme.as_str(), &*path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::testing::FakeRunner;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_dir() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "shellbar-wallpaper-test-{}-{}",
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn scheme_names() {
        assert_eq!(ColorScheme::default().to_string(), "scheme-tonal-spot");
        assert_eq!("scheme-fruit-salad".parse::<ColorScheme>().unwrap(), ColorScheme::FruitSalad);
        assert_eq!("vibrant".parse::<ColorScheme>().unwrap(), ColorScheme::Vibrant);
        assert!("scheme-neon".parse::<ColorScheme>().is_err());
    }

    #[test]
    fn lists_images_sorted_case_insensitive() {
        let dir = tmp_dir();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.JPEG", "d.gif"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        std::fs::create_dir_all(dir.join("sub.png")).unwrap();
        let names: Vec<String> = list(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.JPEG", "d.gif"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(matches!(
            list(Path::new("/nonexistent/shellbar/wallpapers")),
            Err(SystemError::Io { .. })
        ));
    }

    #[test]
    fn parses_awww_query() {
        let out = "eDP-1: 1920x1080, scale: 1, currently displaying: image: /home/me/Wallpapers/sea.png\n";
        assert_eq!(parse_current_image(out), Some(PathBuf::from("/home/me/Wallpapers/sea.png")));
        assert_eq!(parse_current_image("eDP-1: color: 000000"), None);
    }

    #[test]
    fn apply_runs_one_detached_shell() {
        let runner = FakeRunner::default();
        apply(&runner, Path::new("/w/a.png"), ColorScheme::Neutral).unwrap();
        let spawned = runner.spawned.borrow();
        assert_eq!(spawned.len(), 1);
        assert!(spawned[0].starts_with("sh -c awww img \"$1\" -t wipe"));
        assert!(spawned[0].ends_with("sh /w/a.png scheme-neutral"));
    }

    #[test]
    fn regenerate_uses_current_wallpaper() {
        let runner = FakeRunner::default().with(
            "awww query",
            "DP-1: 2560x1440, scale: 1, currently displaying: image: /w/b.jpg",
        );
        regenerate_colors(&runner, ColorScheme::Rainbow, None).unwrap();
        assert_eq!(
            *runner.spawned.borrow(),
            vec!["matugen image --type scheme-rainbow /w/b.jpg".to_string()]
        );
    }
}
