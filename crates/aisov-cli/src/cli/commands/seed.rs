use super::exit_codes;
use crate::cli::args::SeedArgs;
use aisov_core::catalogue::load_catalogue;
use aisov_core::storage::Store;

pub fn run(args: SeedArgs, store: &Store) -> anyhow::Result<i32> {
    let entries = load_catalogue(&args.catalogue)?;
    let inserted = store.upsert_prompts(&entries)?;
    let active = store.active_prompts(None)?.len();
    eprintln!(
        "Seeded {} new prompts from {} ({} entries, {} active in total)",
        inserted,
        args.catalogue.display(),
        entries.len(),
        active
    );
    Ok(exit_codes::OK)
}
