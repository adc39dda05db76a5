pub mod certificate;
pub mod progress;
pub mod storage;
pub mod tokens;
