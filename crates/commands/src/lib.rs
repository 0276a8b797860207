//! User-facing command surface for Minder.
//!
//! The chat transport is not this crate's business: whatever protocol the
//! embedding bot speaks, it extracts a command name plus its raw argument
//! string, wraps them in a [`CommandRequest`], and gets short human-readable
//! reply text back. Everything a user can get wrong (unparseable times,
//! out-of-range values, exceeded quotas, positions that do not exist) comes
//! back as friendly reply text, never as an error; only infrastructure
//! failures surface as [`CommandError`].
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use commands::{CommandHandler, CommandRequest};
//! # async fn example<N: scheduler::Notifier>(
//! #     db: database::Database,
//! #     sched: Arc<scheduler::ReminderScheduler<N>>,
//! # ) -> Result<(), commands::CommandError> {
//! let handler = CommandHandler::new(db, sched);
//! let reply = handler
//!     .handle(&CommandRequest {
//!         chat_id: 100,
//!         sender_id: 7,
//!         command: "remindin".into(),
//!         args: "90m water the plants".into(),
//!     })
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod localtime;

pub use error::CommandError;
pub use handler::{CommandHandler, CommandRequest};
