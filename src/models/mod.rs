pub mod collection_box;
pub mod common;
pub mod donation;
pub mod donor;
pub mod notification;
pub mod subscription;
pub mod volunteer;
