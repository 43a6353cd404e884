//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates synthetic template workspaces with controlled characteristics:
//! page count, shared partials, include directives per page (commented and
//! plain), directives naming missing files, and extra markup lines.
//!
//! All output is deterministic (no randomness), so benchmarks are reproducible.

use std::fmt::Write;
use std::path::Path;
use tempfile::TempDir;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub page_count: usize,
    pub partial_count: usize,
    pub includes_per_page: usize,
    /// Every n-th include is written as plain markup instead of a comment;
    /// 0 keeps all includes in comments
    pub plain_every: usize,
    pub missing_per_page: usize,
    pub extra_lines_per_page: usize,
}

/// Markup lines cycled through deterministically as page filler.
const FILLER: &[&str] = &[
    "<div class=\"row\"><span>{L_TITLE}</span></div>",
    "<a href=\"{U_INDEX}\">{L_INDEX}</a>",
    "<p>{MESSAGE_TEXT}</p>",
    "<!-- IF S_USER_LOGGED_IN -->",
    "<span class=\"username\">{USERNAME}</span>",
    "<!-- ENDIF -->",
];

impl FixtureConfig {
    /// Small workspace: 10 pages, 5 partials, 4 includes per page.
    pub fn small() -> Self {
        Self {
            page_count: 10,
            partial_count: 5,
            includes_per_page: 4,
            plain_every: 4,
            missing_per_page: 1,
            extra_lines_per_page: 10,
        }
    }

    /// Medium workspace: 50 pages, 20 partials, 10 includes per page.
    pub fn medium() -> Self {
        Self {
            page_count: 50,
            partial_count: 20,
            includes_per_page: 10,
            plain_every: 5,
            missing_per_page: 2,
            extra_lines_per_page: 50,
        }
    }

    /// Large workspace: 200 pages, 50 partials, 25 includes per page.
    pub fn large() -> Self {
        Self {
            page_count: 200,
            partial_count: 50,
            includes_per_page: 25,
            plain_every: 5,
            missing_per_page: 3,
            extra_lines_per_page: 200,
        }
    }
}

/// File name of a partial, relative to the `pages` directory
pub fn partial_path(index: usize) -> String {
    format!("../partials/part_{}.tpl", index)
}

/// Generate the content of a single page deterministically.
///
/// - `index`: page index (0-based), used to pick partials and filler
/// - `config`: the workspace configuration
pub fn generate_page_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "<!-- page {} -->", index).unwrap();

    let lines = config.includes_per_page + config.extra_lines_per_page;
    for line_i in 0..lines {
        // Spread includes evenly between filler lines
        let include_i = line_i * config.includes_per_page / lines.max(1);
        let is_include = (line_i + 1) * config.includes_per_page / lines.max(1) > include_i;

        if is_include && config.partial_count > 0 {
            let partial = partial_path((index + include_i) % config.partial_count);
            if config.plain_every > 0 && (include_i + 1) % config.plain_every == 0 {
                writeln!(content, "<p>INCLUDE {}</p>", partial).unwrap();
            } else {
                writeln!(content, "<!-- INCLUDE {} -->", partial).unwrap();
            }
        } else {
            content.push_str(FILLER[(index + line_i) % FILLER.len()]);
            content.push('\n');
        }
    }

    for missing_i in 0..config.missing_per_page {
        writeln!(content, "<!-- INCLUDE missing_{}_{}.html -->", index, missing_i).unwrap();
    }

    content
}

/// Create a temporary fixture workspace from the given configuration.
///
/// Returns a `TempDir` containing `pages/page_N.html` and
/// `partials/part_N.tpl`. The directory is cleaned up when the `TempDir` is
/// dropped.
///
/// Calling this twice with the same `FixtureConfig` produces byte-identical files.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
///
/// Useful when you need to control the directory path (e.g., for named temp dirs).
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    let pages = dir.join("pages");
    let partials = dir.join("partials");
    std::fs::create_dir_all(&pages)
        .unwrap_or_else(|e| panic!("Failed to create {}: {}", pages.display(), e));
    std::fs::create_dir_all(&partials)
        .unwrap_or_else(|e| panic!("Failed to create {}: {}", partials.display(), e));

    for i in 0..config.partial_count {
        let filepath = partials.join(format!("part_{}.tpl", i));
        std::fs::write(&filepath, format!("<span>partial {}</span>\n", i))
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", filepath.display(), e));
    }

    for i in 0..config.page_count {
        let content = generate_page_content(i, config);
        let filepath = pages.join(format!("page_{}.html", i));
        std::fs::write(&filepath, &content)
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", filepath.display(), e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_lines(content: &str, needle: &str) -> usize {
        content.lines().filter(|l| l.contains(needle)).count()
    }

    #[test]
    fn test_small_preset_values() {
        let config = FixtureConfig::small();
        assert_eq!(config.page_count, 10);
        assert_eq!(config.partial_count, 5);
        assert_eq!(config.includes_per_page, 4);
    }

    #[test]
    fn test_file_counts_match_config() {
        let config = FixtureConfig::small();
        let workspace = create_fixture_workspace(&config);
        let pages = std::fs::read_dir(workspace.path().join("pages")).unwrap().count();
        let partials = std::fs::read_dir(workspace.path().join("partials")).unwrap().count();
        assert_eq!(pages, config.page_count);
        assert_eq!(partials, config.partial_count);
    }

    #[test]
    fn test_deterministic_output() {
        let config = FixtureConfig::small();
        let ws1 = create_fixture_workspace(&config);
        let ws2 = create_fixture_workspace(&config);

        for i in 0..config.page_count {
            let filename = format!("pages/page_{}.html", i);
            let content1 = std::fs::read_to_string(ws1.path().join(&filename)).unwrap();
            let content2 = std::fs::read_to_string(ws2.path().join(&filename)).unwrap();
            assert_eq!(content1, content2, "File {} should be identical across runs", filename);
        }
    }

    #[test]
    fn test_include_counts() {
        let config = FixtureConfig {
            page_count: 1,
            partial_count: 3,
            includes_per_page: 8,
            plain_every: 4,
            missing_per_page: 2,
            extra_lines_per_page: 5,
        };
        let content = generate_page_content(0, &config);
        assert_eq!(count_lines(&content, "INCLUDE ../partials/"), 8);
        assert_eq!(count_lines(&content, "<p>INCLUDE"), 2);
        assert_eq!(count_lines(&content, "INCLUDE missing_"), 2);
    }

    #[test]
    fn test_generated_pages_parse_without_errors() {
        use crate::parser_pool::parse_html;

        let config = FixtureConfig::small();
        for i in 0..config.page_count {
            let content = generate_page_content(i, &config);
            let tree = parse_html(&content).unwrap_or_else(|| panic!("Failed to parse page {}", i));
            assert!(
                !tree.root_node().has_error(),
                "Page {} should parse without errors. Content:\n{}",
                i,
                content
            );
        }
    }
}
