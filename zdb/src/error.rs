use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum BuildError {
    #[snafu(display("failed to launch assembler {exe}: {source}"))]
    AssemblerLaunch { exe: String, source: std::io::Error },
    #[snafu(display("assembler exited with status {status}"))]
    AssemblerFailed { status: i32 },
    #[snafu(display("assembler produced no {artifact}: {source}"))]
    MissingArtifact { artifact: String, source: std::io::Error },
}
