//! `generate` subcommand: shell completions and man pages for `mg`.
use anyhow::{Context, Result};
use clap::Command;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write completions for `shell` to `out`.
pub fn generate_completions<W: Write>(
    shell: clap_complete::Shell,
    cmd: &mut Command,
    out: &mut W,
) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, cmd, name, out);
}

/// Write a man page for `cmd` and one for each of its subcommands, at any
/// depth, to `output_dir` (the current directory if `None`). Subcommand
/// pages are named `<parent>-<sub>.1`.
///
/// # Errors
///
/// Returns an error if the directory or a page cannot be written.
pub fn generate_man_pages(cmd: &Command, output_dir: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    let output_dir = match output_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Opening current directory")?,
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;

    let mut written = vec![];
    let mut pending = vec![(cmd.get_name().to_string(), cmd.clone())];
    while let Some((name, page)) = pending.pop() {
        pending.extend(
            page.get_subcommands()
                .map(|sub| (format!("{name}-{}", sub.get_name()), sub.clone())),
        );
        let path = output_dir.join(format!("{name}.1"));
        // `Command::name` needs a `&'static str`; generation runs once.
        let name: &'static str = Box::leak(name.into_boxed_str());
        render_page(page.name(name).disable_help_subcommand(true), &path)?;
        println!("Generated: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn render_page(cmd: Command, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    clap_mangen::Man::new(cmd)
        .render(&mut file)
        .with_context(|| format!("failed to render {}", path.display()))
}
