pub mod config;
pub mod form;
pub mod gateway;
pub mod list;
pub mod media;
pub mod refresher;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
