// SPDX-License-Identifier: MIT
//
// TtyBackend: the real terminal.
//
// Safety: this module uses `unsafe` for termios (tcgetattr, tcsetattr),
// ioctl (TIOCGWINSZ), isatty, poll, and raw fd reads and writes. These are
// the POSIX terminal interfaces; each unsafe block is a single call.
#![allow(unsafe_code)]
//
// Entering managed mode saves the original termios, switches to raw input
// (no echo, no line editing; echo is emulated by the session), optionally
// moves to the alternate screen, and installs a panic hook. The hook writes
// a pre-built restore sequence straight to fd 1, bypassing the stdout lock
// in case the panic happened mid-flush, then puts the saved termios back.
//
// Output is batched: cells go through a `CellWriter` into an
// `OutputBuffer` and reach the terminal in one write per `flush`, wrapped
// in synchronized-output markers.

use std::io::{self, Write};
use std::sync::{Mutex, Once};
use std::time::Duration;

use crate::ansi::{self, CursorShape};
use crate::backend::{Backend, Capabilities, CursorVisibility, Size};
use crate::cell::Cell;
use crate::color::ColorPair;
use crate::output::{CellWriter, OutputBuffer};

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// The terminal size via `ioctl(TIOCGWINSZ)` on stdout.
#[cfg(unix)]
fn query_size() -> io::Result<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(Size::new(ws.ws_col, ws.ws_row))
}

#[cfg(not(unix))]
fn query_size() -> io::Result<Size> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "terminal size query needs a unix tty",
    ))
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Copy of the original termios for the panic hook, which can't reach the
/// backend itself.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// End synchronized output, normal cursor keys, reset SGR, default cursor
/// shape, show cursor, leave the alternate screen. Alternate screen exit
/// goes last so the shell's content comes back clean.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1l\x1b>\
    \x1b[0m\
    \x1b[0 q\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── TtyBackend ─────────────────────────────────────────────────────────────

/// A [`Backend`] driving the process's controlling terminal over
/// stdin/stdout.
///
/// ```no_run
/// use k_term::session::Session;
/// use k_term::terminal::TtyBackend;
///
/// let (mut session, root) = Session::initialize(TtyBackend::new())?;
/// session.window_mut(root)?.write_str(0, 0, "hello", Default::default())?;
/// session.refresh(root)?;
/// session.end()?;
/// # Ok::<(), k_term::error::Error>(())
/// ```
pub struct TtyBackend {
    #[cfg(unix)]
    original_termios: Option<libc::termios>,
    caps: Capabilities,
    output: OutputBuffer,
    writer: CellWriter,
    /// Whether a synchronized-output block is open in `output`.
    frame_open: bool,
    active: bool,
    alternate_screen: bool,
    cbreak: bool,
}

impl TtyBackend {
    /// A backend for an ANSI terminal with the eight standard colors.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::ANSI)
    }

    /// A backend advertising `caps`, e.g. [`Capabilities::MONOCHROME`] for
    /// a terminal known to lack color.
    #[must_use]
    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            caps,
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
            frame_open: false,
            active: false,
            alternate_screen: false,
            cbreak: true,
        }
    }

    /// Whether managed mode is on.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Bytes queued for the next flush.
    #[must_use]
    pub fn pending_output(&self) -> &[u8] {
        self.output.as_bytes()
    }

    fn open_frame(&mut self) {
        if !self.frame_open {
            ansi::begin_sync(&mut self.output).ok();
            self.frame_open = true;
        }
    }

    fn write_now(&mut self, f: impl FnOnce(&mut OutputBuffer) -> io::Result<()>) -> io::Result<()> {
        f(&mut self.output)?;
        self.flush()
    }

    // ── termios ─────────────────────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if !is_tty() {
            return Ok(());
        }
        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }
        }
        self.apply_modes()
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Rebuild the active termios from the saved original plus the
    /// current cbreak setting.
    #[cfg(unix)]
    fn apply_modes(&self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let Some(mut termios) = self.original_termios else {
            return Ok(());
        };
        let fd = io::stdin().as_raw_fd();

        termios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        termios.c_oflag &= !libc::OPOST;
        termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ISIG | libc::IEXTEN);
        if self.cbreak {
            termios.c_lflag &= !libc::ICANON;
        } else {
            termios.c_lflag |= libc::ICANON;
        }
        termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        termios.c_cflag |= libc::CS8;
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw const termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply_modes(&self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if let Some(ref original) = self.original_termios {
            let fd = io::stdin().as_raw_fd();
            if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, original) } != 0 {
                return Err(io::Error::last_os_error());
            }
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }
            self.original_termios = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TtyBackend {
    /// Write the restore sequence to `out`, then restore termios. Termios
    /// is restored even when the write fails; the first error wins.
    fn leave_to(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.output.clear();
        self.frame_open = false;
        let written = self.write_restore_sequence(out);
        let restored = self.disable_raw_mode();
        self.active = false;
        self.alternate_screen = false;
        written.and(restored)
    }

    fn write_restore_sequence(&mut self, out: &mut impl Write) -> io::Result<()> {
        ansi::reset(&mut self.output)?;
        ansi::keypad_off(&mut self.output)?;
        ansi::set_cursor_shape(&mut self.output, CursorShape::Default)?;
        ansi::cursor_show(&mut self.output)?;
        if self.alternate_screen {
            ansi::exit_alt_screen(&mut self.output)?;
        }
        self.output.flush_to(out)
    }
}

impl Default for TtyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for TtyBackend {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn size(&self) -> io::Result<Size> {
        query_size()
    }

    fn enter(&mut self, alternate_screen: bool) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();
        self.enable_raw_mode()?;

        if alternate_screen {
            ansi::enter_alt_screen(&mut self.output)?;
        }
        ansi::clear_screen(&mut self.output)?;
        self.alternate_screen = alternate_screen;
        self.writer.reset_state();
        self.active = true;
        self.flush()
    }

    fn leave(&mut self) -> io::Result<()> {
        self.leave_to(&mut io::stdout().lock())
    }

    fn set_cbreak(&mut self, on: bool) -> io::Result<()> {
        self.cbreak = on;
        self.apply_modes()
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        if !self.caps.cursor_visibility {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "cursor visibility not supported",
            ));
        }
        self.write_now(|out| match visibility {
            CursorVisibility::Hidden => ansi::cursor_hide(out),
            CursorVisibility::Normal => {
                ansi::set_cursor_shape(out, CursorShape::Default)?;
                ansi::cursor_show(out)
            }
            CursorVisibility::HighVisibility => {
                ansi::set_cursor_shape(out, CursorShape::SteadyBlock)?;
                ansi::cursor_show(out)
            }
        })
    }

    fn set_keypad(&mut self, on: bool) -> io::Result<()> {
        if !self.caps.keypad {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "keypad not supported"));
        }
        self.write_now(|out| if on { ansi::keypad_on(out) } else { ansi::keypad_off(out) })
    }

    fn clear(&mut self) -> io::Result<()> {
        self.open_frame();
        ansi::reset(&mut self.output)?;
        ansi::clear_screen(&mut self.output)?;
        self.writer.reset_state();
        Ok(())
    }

    fn put_cell(&mut self, x: u16, y: u16, cell: &Cell, colors: ColorPair) -> io::Result<()> {
        self.open_frame();
        self.writer.render_cell(&mut self.output, x, y, cell, colors);
        Ok(())
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        self.open_frame();
        ansi::cursor_to(&mut self.output, x, y)?;
        self.writer.invalidate_cursor();
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.frame_open {
            // Leave the terminal's own rendering state clean between frames.
            ansi::reset(&mut self.output)?;
            ansi::end_sync(&mut self.output)?;
            self.writer.reset_state();
            self.frame_open = false;
        }
        self.output.flush_to(&mut io::stdout().lock())
    }

    #[cfg(unix)]
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();
        let timeout_ms = timeout.map_or(-1, |d| {
            libc::c_int::try_from(d.as_millis()).unwrap_or(libc::c_int::MAX)
        });

        loop {
            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, timeout_ms)
            };
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    // A signal (resize, usually) cut the wait short.
                    if timeout.is_some() {
                        return Ok(0);
                    }
                    continue;
                }
                return Err(err);
            }
            if ready == 0 {
                return Ok(0);
            }
            break;
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
        Ok(n as usize)
    }

    #[cfg(not(unix))]
    fn read(&mut self, buf: &mut [u8], _timeout: Option<Duration>) -> io::Result<usize> {
        use std::io::Read;
        io::stdin().read(buf)
    }
}

impl Drop for TtyBackend {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
