pub mod whoami;

pub use whoami::read_current_user;
