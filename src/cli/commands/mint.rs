//! Mint command - get or publish the swatch for a colour

use crate::backend;
use crate::cli::args::MintArgs;
use crate::color::ColorCode;
use crate::config::Config;
use crate::error::SwatchResult;
use crate::ui::{TaskSpinner, UiContext};
use tracing::debug;

/// Execute the mint command
pub async fn execute(args: MintArgs, config: &Config) -> SwatchResult<()> {
    let color = ColorCode::parse(&args.color)?;
    let minter = backend::create_minter(config).await?;

    let (cache, lock, store) = minter.backends();
    debug!("Minting {} (cache: {}, lock: {}, store: {})", color, cache, lock, store);

    // Spinner output goes to stderr so stdout carries only the CID
    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Minting #{}...", color));

    match minter.mint(&color).await {
        Ok(cid) => {
            spinner.clear();
            if args.url {
                println!("{}", cid.gateway_url(&config.store.gateway));
            } else {
                println!("{}", cid);
            }
            Ok(())
        }
        Err(e) => {
            spinner.stop_error(&format!("Failed to mint #{}", color));
            Err(e)
        }
    }
}
