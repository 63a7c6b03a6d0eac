//! V1 API endpoints.

pub mod acts;
pub mod comments;
pub mod discovered;
pub mod login;
pub mod performers;
pub mod routes;
pub mod users;
pub mod videos;
pub mod votes;
pub mod youtube;
