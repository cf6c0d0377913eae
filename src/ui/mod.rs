//! Terminal output helpers
//!
//! Uses `cliclack` for styled output in interactive terminals and falls
//! back to plain, prefix-tagged lines in CI and when output is piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use swatch::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Minting #1A2B3C...");
//! // ... do work ...
//! spinner.clear();
//!
//! ui::step_ok_detail(&ctx, "Rendered #1A2B3C", "swatch.png");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{remark, step_error_detail, step_ok, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
