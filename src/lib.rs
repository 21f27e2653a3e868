#[path = "core/network.rs"]
pub mod network;

#[path = "core/instructions.rs"]
pub mod instructions;

#[path = "core/driver.rs"]
pub mod driver;

pub mod observer;
