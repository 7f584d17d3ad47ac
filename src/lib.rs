pub mod app;
pub mod cli;
pub mod completion;
pub mod constants;
pub mod quiz;
pub mod server;
pub mod session;
pub mod speech;
pub mod storage;
pub mod utils;

pub use app::{build_services, load_config, Config, Services};
pub use server::app_router;
pub use session::{SessionManager, TurnReply};
pub use utils::ChatError;
