#![no_main]

use std::io::{self, Cursor, Read, Write};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use nrpe::{serve_one, CommandResult, Status, Transport, PACKET_LEN};

// Feeds arbitrary bytes to the server driver as if they arrived on a socket.
struct FuzzStream {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl Read for FuzzStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for FuzzStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for FuzzStream {
    fn set_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut stream = FuzzStream {
        input: Cursor::new(data.to_vec()),
        output: Vec::new(),
    };

    let got = serve_one(
        &mut stream,
        |cmd| {
            Ok(CommandResult::new(
                Status::Ok,
                format!("{}:{}", cmd.name(), cmd.args().len()),
            ))
        },
        false,
        None,
    );

    // A response is written only for verified, well-terminated queries; any
    // response written must be a full packet.
    match got {
        Ok(()) => assert_eq!(stream.output.len(), PACKET_LEN),
        Err(_) => assert!(stream.output.is_empty()),
    }
});
