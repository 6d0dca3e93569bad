//! Process exit codes for the `rfpflow` binary.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Clean shutdown |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CONFIG` | Invalid CLI arguments or configuration |
//! | 3 | `BIND_FAILED` | Listener could not bind the configured address |
//! | 4 | `STORAGE` | State file unreadable or unwritable |

/// Type-safe process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    pub const INTERNAL: ExitCode = ExitCode(1);

    /// Invalid arguments, unreadable or invalid `rfpflow.toml`
    pub const CONFIG: ExitCode = ExitCode(2);

    /// Listener could not bind
    pub const BIND_FAILED: ExitCode = ExitCode(3);

    /// State file could not be loaded or written
    pub const STORAGE: ExitCode = ExitCode(4);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
