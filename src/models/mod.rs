pub mod parcelmodel;
pub mod usermodel;
