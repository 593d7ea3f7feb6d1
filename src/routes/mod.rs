pub mod submissions;

pub mod system;

pub use submissions::configure_submissions_routes;
pub use system::configure_system_routes;
