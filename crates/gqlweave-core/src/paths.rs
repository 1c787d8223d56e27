//! Deterministic output locations for generated artifacts.
//!
//! Every literal maps to two artifacts derived from the logical source path
//! (`<types_root_dir>/<source_rel_path>`) and its fingerprint:
//!
//! - the typed module, `<cache_dir>/<logical>-<hash>.tsx`, imported by the
//!   rewritten source
//! - the declaration, `<dts_dir>/<logical>-<hash>.d.ts`, recorded in the cache
//!
//! Relative paths stored in the cache always use `/` regardless of host.

use std::path::{Component, Path, PathBuf};

/// Extension of generated typed modules.
pub const MODULE_EXTENSION: &str = ".tsx";

/// Extension of generated declarations.
pub const DECLARATION_EXTENSION: &str = ".d.ts";

/// Locations derived for one literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralPaths {
    /// Declaration path relative to the working directory, `/`-separated
    pub declaration_rel_path: String,
    /// Absolute declaration path
    pub declaration_full_path: PathBuf,
    /// Absolute typed module path inside the cache directory
    pub module_full_path: PathBuf,
}

/// Derive artifact locations for a literal.
///
/// * `logical_path` - `<types_root_dir>/<source_rel_path>` (see [`logical_source_path`])
/// * `hash` - literal fingerprint
/// * `dts_rel_dir` - declaration directory relative to `cwd`
/// * `cache_full_dir` - absolute cache directory
/// * `cwd` - absolute working directory
pub fn derive_paths(
    logical_path: &str,
    hash: &str,
    dts_rel_dir: &Path,
    cache_full_dir: &Path,
    cwd: &Path,
) -> LiteralPaths {
    let stem = format!("{}-{}", to_slash_str(logical_path), hash);

    let dts_dir = to_slash(dts_rel_dir);
    let declaration_rel_path = if dts_dir.is_empty() {
        format!("{stem}{DECLARATION_EXTENSION}")
    } else {
        format!("{dts_dir}/{stem}{DECLARATION_EXTENSION}")
    };

    LiteralPaths {
        declaration_full_path: join_slash(cwd, &declaration_rel_path),
        module_full_path: join_slash(cache_full_dir, &format!("{stem}{MODULE_EXTENSION}")),
        declaration_rel_path,
    }
}

/// Logical path of a source: the fixed root segment followed by its relative path.
pub fn logical_source_path(types_root_dir: &str, source_rel_path: &str) -> String {
    let root = to_slash_str(types_root_dir);
    let source = to_slash_str(source_rel_path);
    if root.is_empty() {
        source
    } else {
        format!("{root}/{source}")
    }
}

/// Render a relative path with `/` separators, dropping `.` segments.
pub fn to_slash(path: &Path) -> String {
    to_slash_str(&path.to_string_lossy())
}

/// Canonicalize a relative path string to `/` separators.
pub fn to_slash_str(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a `/`-separated relative path onto a host path.
pub fn join_slash(base: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Module specifier importing `target` from a file located in `from_dir`.
///
/// Both paths must be absolute. The result is `/`-separated, starts with
/// `./` or `../`, and has `strip_extension` removed from its end.
pub fn relative_specifier(from_dir: &Path, target: &Path, strip_extension: &str) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = target.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from.len() {
        segments.push("..".to_string());
    }
    for component in &to[common..] {
        segments.push(component.as_os_str().to_string_lossy().into_owned());
    }

    let mut specifier = segments.join("/");
    if let Some(stripped) = specifier.strip_suffix(strip_extension) {
        specifier = stripped.to_string();
    }
    if specifier.starts_with("../") {
        specifier
    } else {
        format!("./{specifier}")
    }
}
