// HTTP surface of the events and organizations API: router, guards, handlers

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
