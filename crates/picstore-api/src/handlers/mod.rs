pub mod callback;
pub mod info;
pub mod s3_method;
pub mod upload;
