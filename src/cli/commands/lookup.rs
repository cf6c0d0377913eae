//! Lookup command - read a memoized CID without publishing

use crate::backend;
use crate::cli::args::LookupArgs;
use crate::color::ColorCode;
use crate::config::Config;
use crate::error::{SwatchError, SwatchResult};

/// Execute the lookup command
pub async fn execute(args: LookupArgs, config: &Config) -> SwatchResult<()> {
    let color = ColorCode::parse(&args.color)?;
    let minter = backend::create_minter(config).await?;

    match minter.lookup(&color).await? {
        Some(cid) if args.url => println!("{}", cid.gateway_url(&config.store.gateway)),
        Some(cid) => println!("{}", cid),
        None => {
            return Err(SwatchError::User(format!(
                "No CID cached for #{}. Run: swatch mint {}",
                color, color
            )))
        }
    }

    Ok(())
}
