pub mod auth;
pub mod google_oauth;
pub mod parcels;
pub mod users;
