use super::*;

    use std::io;

    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::fmt::MakeWriter;

    /// Buffers one formatted event and hands it to the console on drop.
    struct ConsoleWriter {
        buffer: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.buffer.extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.buffer);
            let line = line.trim_end();
            if !line.is_empty() {
                web_sys::console::log_1(&JsValue::from_str(&format!("[X41] {line}")));
            }
        }
    }

    #[derive(Clone, Copy)]
    struct ConsoleMakeWriter;

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter { buffer: Vec::new() }
        }
    }

    /// Silent unless the user turned on debug logging.
    pub(super) fn install(debug: bool) {
        let level = if debug { LevelFilter::DEBUG } else { LevelFilter::OFF };
        let installed = tracing_subscriber::fmt()
            .with_writer(ConsoleMakeWriter)
            .with_max_level(level)
            .with_target(false)
            .without_time()
            .try_init();
        if installed.is_err() {
            web_sys::console::debug_1(&JsValue::from_str("[X41] logger already installed"));
        }
    }
