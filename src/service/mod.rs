pub mod error;
pub mod google_oauth;
pub mod parcel_policy;
pub mod parcel_service;
pub mod seed;
pub mod user_service;
