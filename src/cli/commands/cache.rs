//! Cache command - manage the colour → CID cache

use crate::backend;
use crate::cache::FileCache;
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::schema::SharedBackend;
use crate::config::Config;
use crate::error::SwatchResult;
use crate::ui::{self, UiContext};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> SwatchResult<()> {
    match args.action {
        CacheAction::Clear => clear(config).await,
    }
}

async fn clear(config: &Config) -> SwatchResult<()> {
    let ctx = UiContext::detect();

    if config.cache.backend == SharedBackend::Memory {
        ui::step_warn_hint(
            &ctx,
            "Memory cache lives only inside a running process",
            "Nothing to clear",
        );
        return Ok(());
    }

    let dir = backend::cache_dir(config);
    let cache = FileCache::new(&dir).await?;
    let removed = cache.clear().await?;

    ui::step_ok_detail(
        &ctx,
        &format!("Removed {} cache entr{}", removed, if removed == 1 { "y" } else { "ies" }),
        &dir.display().to_string(),
    );

    Ok(())
}
