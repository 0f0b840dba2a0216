use super::exit_codes;
use crate::cli::args::InitArgs;
use crate::templates::SAMPLE_CATALOGUE;
use aisov_core::config::SAMPLE_CONFIG;
use anyhow::Context;
use std::path::Path;

fn write_file(path: &Path, contents: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        eprintln!("{} exists, skipping (use --force to overwrite)", path.display());
        return Ok(());
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn run(args: InitArgs) -> anyhow::Result<i32> {
    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("failed to create {}", args.dir.display()))?;

    write_file(&args.dir.join("aisov.yaml"), SAMPLE_CONFIG, args.force)?;
    write_file(&args.dir.join("prompts.json"), SAMPLE_CATALOGUE, args.force)?;

    eprintln!("\nNext: export OPENAI_API_KEY=... then `aisov seed` and `aisov run`.");
    Ok(exit_codes::OK)
}
