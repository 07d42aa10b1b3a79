pub mod api;
pub mod firebase;
#[cfg(test)]
pub mod memory;
