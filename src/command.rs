//! Commands, check statuses, and check results.

use crate::{packet::MAX_PACKET_DATA_LEN, Error};

/// The longest serialised command the packet data area can carry, excluding
/// the NUL terminator.
const MAX_COMMAND_LEN: usize = MAX_PACKET_DATA_LEN - 1;

/// A named check command and its ordered arguments.
///
/// On the wire a command is encoded as `name ("!" arg)*` followed by a NUL
/// terminator. The separator has no escaping, so a name must not contain `!`
/// and no field may contain a NUL byte - commands violating this cannot
/// round-trip. This is a protocol limitation, not enforced here, matching
/// the reference agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    /// Constructs a command from a name and its arguments.
    ///
    /// ```
    /// use nrpe::Command;
    ///
    /// let cmd = Command::new("check_disk", ["-w", "80%", "-c", "90%"]);
    /// assert_eq!(cmd.name(), "check_disk");
    /// ```
    pub fn new<N, I, A>(name: N, args: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Serialises the command as `name ("!" arg)*`, without the terminator.
    ///
    /// Fails with [`Error::CommandTooLong`] - emitting nothing - when the
    /// joined length leaves no room in the data area for the NUL byte.
    pub(crate) fn join(&self) -> Result<Vec<u8>, Error> {
        let len = self.name.len() + self.args.iter().map(|a| a.len() + 1).sum::<usize>();
        if len >= MAX_PACKET_DATA_LEN {
            return Err(Error::CommandTooLong {
                got: len,
                max: MAX_COMMAND_LEN,
            });
        }

        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(self.name.as_bytes());
        for arg in &self.args {
            out.push(b'!');
            out.extend_from_slice(arg.as_bytes());
        }

        Ok(out)
    }

    /// Splits a received payload on `!` into a command.
    ///
    /// The first field is the name, the remainder are the arguments in
    /// order. Empty arguments are preserved. Non-UTF-8 bytes are replaced,
    /// as the wire format carries no encoding information.
    pub(crate) fn split(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload);
        let mut fields = text.split('!');

        Self {
            name: fields.next().unwrap_or_default().to_string(),
            args: fields.map(str::to_string).collect(),
        }
    }
}

/// The service state a check reports, mirroring the Nagios plugin exit
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    /// The checked service is healthy.
    Ok = 0,

    /// The checked service crossed its warning threshold.
    Warning = 1,

    /// The checked service crossed its critical threshold.
    Critical = 2,

    /// The check could not determine the service state.
    Unknown = 3,
}

impl Status {
    /// The numeric status code carried in a response packet.
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl TryFrom<u16> for Status {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Error> {
        match code {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Warning),
            2 => Ok(Self::Critical),
            3 => Ok(Self::Unknown),
            code => Err(Error::UnknownStatus { code }),
        }
    }
}

/// The outcome of one check: a status code and a human-readable status line.
///
/// Produced by a server handler, or by the client when parsing a response.
/// Status lines longer than 1023 bytes are truncated when emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    status: Status,
    status_line: String,
}

impl CommandResult {
    /// Constructs a result from a status and its status line.
    pub fn new(status: Status, status_line: impl Into<String>) -> Self {
        Self {
            status,
            status_line: status_line.into(),
        }
    }

    /// The reported service state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The human-readable status line.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }
}
