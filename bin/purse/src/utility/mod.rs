pub mod db_pool;
pub mod logging;
pub mod payout_task;
pub mod server;
pub mod shutdown;
pub mod tasks;
