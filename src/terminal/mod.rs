use tracing::debug;

pub const DEFAULT_COLUMNS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 25;

/// Size of the controlling terminal, sent along with an upload so the
/// viewer can lay the recording out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalDimensions {
    pub columns: u16,
    pub rows: u16,
}

impl Default for TerminalDimensions {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl TerminalDimensions {
    /// Falls back to 80x25 when either axis is zero.
    pub fn from_raw(columns: u16, rows: u16) -> Self {
        if columns == 0 || rows == 0 {
            return Self::default();
        }
        Self { columns, rows }
    }

    /// Query the window size of the terminal, trying stdout, stderr, stdin
    /// and then `/dev/tty` so a redirected stream does not hide it.
    #[cfg(unix)]
    pub fn query() -> Self {
        let sources: [fn() -> Option<(u16, u16)>; 4] = [
            || winsize_of(std::io::stdout()),
            || winsize_of(std::io::stderr()),
            || winsize_of(std::io::stdin()),
            || std::fs::File::open("/dev/tty").ok().and_then(winsize_of),
        ];
        Self::first_usable(sources.iter().filter_map(|source| source()))
    }

    /// First size with both axes non-zero, else 80x25.
    pub fn first_usable(sizes: impl IntoIterator<Item = (u16, u16)>) -> Self {
        match sizes.into_iter().find(|&(columns, rows)| columns > 0 && rows > 0) {
            Some((columns, rows)) => Self { columns, rows },
            None => {
                debug!("Terminal size unavailable; assuming 80x25");
                Self::default()
            }
        }
    }

    #[cfg(not(unix))]
    pub fn query() -> Self {
        debug!("Terminal size query unsupported on this platform; assuming 80x25");
        Self::default()
    }
}

#[cfg(unix)]
fn winsize_of<Fd: rustix::fd::AsFd>(fd: Fd) -> Option<(u16, u16)> {
    match rustix::termios::tcgetwinsize(fd) {
        Ok(ws) => Some((ws.ws_col, ws.ws_row)),
        Err(err) => {
            debug!("tcgetwinsize failed: {err}");
            None
        }
    }
}
