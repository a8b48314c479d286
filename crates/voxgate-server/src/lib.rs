//! HTTP surface and request pipeline of the voxgate gateway.

mod health;
mod middleware;
mod pipeline;
mod server;

pub use server::{build_router, start, AppState, ServerHandle};
