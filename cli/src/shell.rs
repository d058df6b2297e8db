//! Line-oriented command shell for the device host
//!
//! One command per line:
//!
//! ```text
//! open <minor>            -> prints the new fd
//! read <fd> <len>         -> prints the bytes read
//! write <fd> <text>       -> prints the byte count
//! ioctl <fd> <code> <param>
//! rewind <fd> | key <fd> <byte> | cipher <fd> <0|1> | major <fd>
//! close <fd>
//! quit
//! ```

use std::fmt;

use encdev::control::{IOCTL_OP_ENCRYPT, IOCTL_OP_GETMAJOR, IOCTL_OP_REWIND, IOCTL_OP_SETKEY};
use encdev::{DeviceError, Handle, HostClient, Minor};

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Open(Minor),
    Read { fd: Handle, length: usize },
    Write { fd: Handle, data: Vec<u8> },
    Ioctl { fd: Handle, code: u32, param: u64 },
    Close(Handle),
    Quit,
}

/// Errors from parsing a command line
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line
    Empty,
    /// First word is not a known command
    UnknownCommand(String),
    /// Argument missing or malformed
    BadArgument(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::BadArgument(msg) => write!(f, "bad argument: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

fn parse_number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, ParseError> {
    let word = word.ok_or_else(|| ParseError::BadArgument(format!("missing {what}")))?;
    let parsed = if let Some(hex) = word.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
            .ok()
            .and_then(|v| v.to_string().parse().ok())
    } else {
        word.parse().ok()
    };
    parsed.ok_or_else(|| ParseError::BadArgument(format!("invalid {what}: {word}")))
}

fn parse_fd(word: Option<&str>) -> Result<Handle, ParseError> {
    parse_number::<i64>(word, "fd").map(Handle::new)
}

/// Parse one input line
///
/// # Errors
///
/// Returns a `ParseError` if the line is blank, names an unknown command,
/// or has missing or malformed arguments.
pub fn parse(line: &str) -> Result<ShellCommand, ParseError> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let mut args = rest.split_whitespace();

    match name {
        "" => Err(ParseError::Empty),
        "open" => Ok(ShellCommand::Open(Minor::new(parse_number(
            args.next(),
            "minor",
        )?))),
        "read" => Ok(ShellCommand::Read {
            fd: parse_fd(args.next())?,
            length: parse_number(args.next(), "length")?,
        }),
        "write" => {
            let rest = rest.trim_start();
            let (fd, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Ok(ShellCommand::Write {
                fd: parse_fd(Some(fd).filter(|s| !s.is_empty()))?,
                data: text.as_bytes().to_vec(),
            })
        }
        "ioctl" => Ok(ShellCommand::Ioctl {
            fd: parse_fd(args.next())?,
            code: parse_number(args.next(), "code")?,
            param: parse_number(args.next(), "param")?,
        }),
        "rewind" => Ok(ShellCommand::Ioctl {
            fd: parse_fd(args.next())?,
            code: IOCTL_OP_REWIND,
            param: 0,
        }),
        "key" => Ok(ShellCommand::Ioctl {
            fd: parse_fd(args.next())?,
            code: IOCTL_OP_SETKEY,
            param: parse_number(args.next(), "key")?,
        }),
        "cipher" => Ok(ShellCommand::Ioctl {
            fd: parse_fd(args.next())?,
            code: IOCTL_OP_ENCRYPT,
            param: parse_number(args.next(), "flag")?,
        }),
        "major" => Ok(ShellCommand::Ioctl {
            fd: parse_fd(args.next())?,
            code: IOCTL_OP_GETMAJOR,
            param: 0,
        }),
        "close" => Ok(ShellCommand::Close(parse_fd(args.next())?)),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

/// Format bytes as printable text, escaping the rest
#[must_use]
pub fn render_bytes(data: &[u8]) -> String {
    data.iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}

/// Run a command against the host and describe the outcome
///
/// `Quit` is not executed here; the caller handles it.
///
/// # Errors
///
/// Returns the `DeviceError` reported by the host.
pub async fn execute(client: &HostClient, command: &ShellCommand) -> Result<String, DeviceError> {
    match command {
        ShellCommand::Open(minor) => {
            let fd = client.open(*minor).await?;
            Ok(format!("fd {fd}"))
        }
        ShellCommand::Read { fd, length } => {
            let data = client.read(*fd, *length).await?;
            Ok(format!("{} bytes: {}", data.len(), render_bytes(&data)))
        }
        ShellCommand::Write { fd, data } => {
            let n = client.write(*fd, data).await?;
            Ok(format!("{n} bytes written"))
        }
        ShellCommand::Ioctl { fd, code, param } => {
            let result = client.control(*fd, *code, *param).await?;
            Ok(format!("ok {result}"))
        }
        ShellCommand::Close(fd) => {
            client.close(*fd).await?;
            Ok("closed".to_string())
        }
        ShellCommand::Quit => Ok(String::new()),
    }
}
