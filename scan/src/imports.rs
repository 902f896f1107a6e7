use once_cell::sync::Lazy;
use regex::Regex;

// `import "a/b.proto";`, optionally `public` or `weak`, optionally followed by a line comment.
static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s+(?:(?:public|weak)\s+)?"([^"]+)"\s*;\s*(?://.*)?$"#)
        .expect("import pattern is valid")
});

fn looks_like_import(line: &str) -> bool {
    let rest = match line.trim_start().strip_prefix("import") {
        Some(rest) => rest,
        None => return false,
    };
    rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '"')
}

/// The paths named by import directives in `contents`, in order of appearance.
///
/// Only single line directives are understood. Anything else that starts with `import` is skipped
/// with a diagnostic; the compiler will have its own opinion about it.
pub fn imports(contents: &str) -> Vec<&str> {
    let mut found = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        match IMPORT.captures(line) {
            Some(captures) => {
                if let Some(path) = captures.get(1) {
                    found.push(path.as_str());
                }
            }
            None => {
                if looks_like_import(line) {
                    tracing::debug!(line = lineno + 1, text = line, "not an import directive");
                }
            }
        }
    }
    found
}
