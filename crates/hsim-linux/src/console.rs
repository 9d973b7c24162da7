use std::fmt;
use std::io::{self, Write};

/// Formats `args` into `out` and flushes before returning.
/// Returns the number of bytes written.
pub fn write_flushed<W: Write>(out: &mut W, args: fmt::Arguments<'_>) -> io::Result<usize> {
    let text = fmt::format(args);
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(text.len())
}

/// Console output: stdout, flushed on every call.
pub fn print(args: fmt::Arguments<'_>) -> io::Result<usize> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_flushed(&mut out, args)
}

#[macro_export]
macro_rules! console_print {
    ($($arg:tt)*) => {
        $crate::console::print(format_args!($($arg)*))
    };
}
