pub mod email;
pub mod upload;
