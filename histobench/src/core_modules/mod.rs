pub mod channels;
pub mod histogram;
pub mod kernel;
pub mod partition;
