pub mod bot;
pub mod extractor;
pub mod registry;
pub mod utils;
