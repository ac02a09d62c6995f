use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MonitorError {
    #[snafu(display("serial channel failure: {source}"))]
    Transport { source: std::io::Error },
    #[snafu(display("target rejected the command"))]
    Fault,
    #[snafu(display("malformed reply: {msg}"))]
    MalformedReply { msg: String },
    #[snafu(display("upload aborted after {committed} bytes: {source}"))]
    UploadAborted {
        committed: usize,
        #[snafu(source(from(MonitorError, Box::new)))]
        source: Box<MonitorError>,
    },
    #[snafu(display("timed out waiting for a reply"))]
    Timeout,
    #[snafu(display("wait cancelled, session was reset"))]
    Cancelled,
}
