//! Swatch - content-addressed colour swatches
//!
//! Renders a deterministic PNG for a colour code, publishes it to a
//! content store, and memoizes the CID. Concurrent callers for the same
//! colour are serialized by a distributed lock so each image is uploaded
//! once.

pub mod backend;
pub mod cache;
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod image;
pub mod keys;
pub mod ledger;
pub mod lock;
pub mod mint;
pub mod store;
pub mod ui;

pub use color::ColorCode;
pub use error::{SwatchError, SwatchResult};
pub use mint::{MintSettings, Minter};
pub use store::Cid;
