pub mod analysis;
pub mod catalog;
pub mod export;
pub mod fetch;
pub mod history;
pub mod normalize;
pub mod sheet;
