//! Render command - write a swatch PNG locally

use crate::cli::args::RenderArgs;
use crate::color::ColorCode;
use crate::error::{SwatchError, SwatchResult};
use crate::image::ImageGenerator;
use crate::ui::{self, UiContext};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Execute the render command
pub async fn execute(args: RenderArgs) -> SwatchResult<()> {
    let color = ColorCode::parse(&args.color)?;
    let png = ImageGenerator::new().produce(&color)?;

    match args.output {
        Some(path) => {
            fs::write(&path, &png)
                .await
                .map_err(|e| SwatchError::io(format!("writing {}", path.display()), e))?;

            let ctx = UiContext::detect();
            ui::step_ok_detail(
                &ctx,
                &format!("Rendered #{} ({} bytes)", color, png.len()),
                &path.display().to_string(),
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&png)
                .await
                .map_err(|e| SwatchError::io("writing image to stdout", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| SwatchError::io("flushing stdout", e))?;
        }
    }

    Ok(())
}
