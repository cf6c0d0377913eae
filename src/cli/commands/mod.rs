//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod config;
pub mod lookup;
pub mod mint;
pub mod render;

pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use lookup::execute as lookup;
pub use mint::execute as mint;
pub use render::execute as render;
