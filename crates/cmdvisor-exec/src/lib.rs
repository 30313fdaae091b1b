//! Setup callbacks for [`cmdvisor_core::Runner::run`].
//!
//! - [`CombinedOutputFile`] captures a command's description, combined output and result in one
//!   log file.
//! - [`CommandInfo`] is the JSON description written at the top of that file.
//! - [`RlimitConfig`] applies POSIX resource limits to the child (feature `limits`).

mod error;
pub use error::ExecError;

mod info;
pub use info::CommandInfo;

mod output;
pub use output::CombinedOutputFile;

#[cfg(feature = "limits")]
mod limits;
#[cfg(feature = "limits")]
pub use limits::{RlimitConfig, attach_rlimits};

pub mod prelude {
    pub use crate::{CombinedOutputFile, CommandInfo, ExecError};
    #[cfg(feature = "limits")]
    pub use crate::RlimitConfig;
}
