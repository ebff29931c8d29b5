//! Check template files for syntax errors before deploying them
//!
//! Usage:
//!   cargo run --bin check-templates -- templates/
//!   cargo run --bin check-templates -- templates/blog/post.html other.html
//!
//! Without arguments, TEMPLATE_DIR is checked (defaults to templates/).
//! Each file is parsed on its own, then every directory is loaded as one
//! engine so `extends` and `import` between its files resolve.
//! Exits with status 1 when any template fails.

use anyhow::{Context, Result};
use outreach_blog::templates::{validate_template, TemplateEngine};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn collect_templates(path: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_file() {
        found.push(path.to_path_buf());
        return Ok(());
    }

    let entries =
        fs::read_dir(path).with_context(|| format!("Failed to read {}", path.display()))?;
    for entry in entries {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            collect_templates(&entry_path, found)?;
        } else if entry_path.extension().is_some_and(|ext| ext == "html") {
            found.push(entry_path);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("check_templates=info".parse()?),
        )
        .init();

    let mut roots: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if roots.is_empty() {
        roots.push(PathBuf::from(
            std::env::var("TEMPLATE_DIR").unwrap_or_else(|_| "templates".to_string()),
        ));
    }

    let mut files = Vec::new();
    for root in &roots {
        collect_templates(root, &mut files)?;
    }
    files.sort();

    let mut failures = 0;
    for file in &files {
        let source = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        match validate_template(&source) {
            Ok(()) => info!(file = %file.display(), "ok"),
            Err(e) => {
                failures += 1;
                error!(file = %file.display(), "{}", e.message);
            }
        }
    }

    for root in roots.iter().filter(|r| r.is_dir()) {
        match TemplateEngine::new(Some(root)) {
            Ok(_) => info!(dir = %root.display(), "references resolve"),
            Err(e) => {
                failures += 1;
                error!(dir = %root.display(), "{:#}", e);
            }
        }
    }

    info!(checked = files.len(), failures, "Template check finished");
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
