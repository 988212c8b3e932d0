// bridge-server/src/actors/mod.rs

pub mod host_actor;
pub mod session_actor;
pub mod state_manager;
pub mod surface_actor;
