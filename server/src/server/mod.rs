pub mod run;
pub mod ws;

pub use run::{build_router, run_server, TransportState};
