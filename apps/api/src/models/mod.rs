pub mod collision;
pub mod domain;
pub mod principal;
pub mod session;
pub mod usage;
