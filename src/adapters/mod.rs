pub mod fs;
pub mod http;
pub mod remote;
pub mod ws;
