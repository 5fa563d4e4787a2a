// CDP debugger test harness
//
// Client-side oracle for a Chrome-DevTools-Protocol style debugger endpoint:
// - Event multiplexing (named waits for pauses and readiness, standing handlers)
// - Script table built from Debugger.scriptParsed
// - Location verification
// - Lazy structural matching of remote object graphs

pub mod channel;
pub mod checks;
pub mod config;
pub mod error;
pub mod expected;
pub mod harness;
pub mod inspector;
pub mod location;
pub mod matcher;
pub mod scripts;
pub mod session;

pub use channel::CommandSender;
pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use expected::Expected;
pub use harness::{LocalsCheck, PauseCheck};
pub use inspector::{Inspector, Waiter, PAUSE, READY};
pub use location::{canonical_location, check_location, ExpectedLocation};
pub use matcher::{Matcher, PropertySource};
pub use scripts::ScriptTable;
pub use session::SessionContext;
