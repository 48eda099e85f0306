pub mod blocks;
pub mod config;
pub mod error;
pub mod output;
pub mod request;
pub mod stream;
pub mod ticket;
pub mod types;

pub use blocks::{Block, BlockFetcher, Manifest, Submitter, WorkerPool};
pub use config::Config;
pub use error::{Error, Result};
pub use request::{Interval, RequestDescription};
pub use stream::AssembledStream;
pub use ticket::TicketClient;
