//! Gateway host serial channel.
//!
//! A gateway node talks to its controller over a serial link using ASCII
//! lines of the form `0;0;<command>;0;<type>;<text>` terminated by a
//! newline. The node runtime uses it for log traffic: its own lifecycle
//! lines and `LogMessage` frames relayed from the mesh.

use std::io::Write;

use sensormesh_core::MessageType;

/// Command field for runtime-internal traffic.
pub const COMMAND_INTERNAL: u8 = 0;

/// The controller-facing serial link of a gateway node.
pub struct SerialLink {
    sink: Box<dyn Write + Send>,
}

impl SerialLink {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        SerialLink { sink }
    }

    /// A link writing to the process stdout.
    pub fn stdout() -> Self {
        SerialLink {
            sink: Box::new(std::io::stdout()),
        }
    }

    /// Emit one protocol line.
    pub fn emit(&mut self, command: u8, message_type: u8, text: &str) {
        let result = writeln!(self.sink, "0;0;{command};0;{message_type};{text}")
            .and_then(|()| self.sink.flush());
        if let Err(e) = result {
            tracing::warn!("gateway serial write failed: {e}");
        }
    }

    /// Emit a log line from the runtime itself.
    pub fn emit_log(&mut self, text: &str) {
        self.emit(COMMAND_INTERNAL, MessageType::LogMessage as u8, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_line_format() {
        let buf = SharedBuf::default();
        let mut link = SerialLink::new(Box::new(buf.clone()));
        link.emit_log("gateway started");

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "0;0;0;0;8;gateway started\n");
    }

    #[test]
    fn test_emit_arbitrary_type() {
        let buf = SharedBuf::default();
        let mut link = SerialLink::new(Box::new(buf.clone()));
        link.emit(COMMAND_INTERNAL, MessageType::GatewayReady as u8, "ready");

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "0;0;0;0;14;ready\n");
    }
}
