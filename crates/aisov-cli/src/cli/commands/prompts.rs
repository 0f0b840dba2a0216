use super::exit_codes;
use crate::cli::args::{PromptsArgs, PromptsSub};
use aisov_core::report::console::render_prompts;
use aisov_core::storage::Store;

pub fn run(args: PromptsArgs, store: &Store) -> anyhow::Result<i32> {
    let (id, active) = match args.cmd {
        PromptsSub::List => {
            print!("{}", render_prompts(&store.all_prompts()?));
            return Ok(exit_codes::OK);
        }
        PromptsSub::Activate { id } => (id, true),
        PromptsSub::Deactivate { id } => (id, false),
    };

    if !store.set_prompt_active(id, active)? {
        eprintln!("no prompt with id {}", id);
        return Ok(exit_codes::RUN_FAILED);
    }
    eprintln!(
        "prompt {} {}",
        id,
        if active { "activated" } else { "deactivated" }
    );
    Ok(exit_codes::OK)
}
