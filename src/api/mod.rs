pub mod endpoints;
pub mod middleware;
pub mod page;
pub mod rest;
pub mod state;
