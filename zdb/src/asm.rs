use std::fs;
use std::process::Command;

use log::info;
use snafu::ResultExt;

use crate::error::{AssemblerFailedSnafu, AssemblerLaunchSnafu, BuildError, MissingArtifactSnafu};

const LISTING_FILE: &str = "listing.txt";
const IMAGE_FILE: &str = "rom.bin";

pub(crate) struct Assembly {
    pub(crate) listing: String,
    pub(crate) image: Vec<u8>,
}

/// Runs the external assembler over `source` and harvests the listing text
/// and binary image it leaves behind. Both temp files are removed again;
/// assembler output is passed through to the operator.
pub(crate) fn assemble(source: &str) -> Result<Assembly, BuildError> {
    let exe = if cfg!(windows) {
        "./vasmz80_oldstyle.exe"
    } else {
        "./vasmz80_oldstyle"
    };

    let output = Command::new(exe)
        .args([
            "-chklabels",
            "-L",
            LISTING_FILE,
            "-Llo",
            "-Lns",
            "-ignore-mult-inc",
            "-nosym",
            "-x",
            "-Fbin",
            "-o",
            IMAGE_FILE,
            source,
        ])
        .output()
        .context(AssemblerLaunchSnafu { exe })?;

    print!("{}", String::from_utf8_lossy(&output.stdout));
    if !output.stderr.is_empty() {
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
    }
    if !output.status.success() {
        return AssemblerFailedSnafu {
            status: output.status.code().unwrap_or(-1),
        }
        .fail();
    }

    let listing = fs::read_to_string(LISTING_FILE).context(MissingArtifactSnafu { artifact: "listing" })?;
    let image = fs::read(IMAGE_FILE).context(MissingArtifactSnafu { artifact: "image" })?;
    let _ = fs::remove_file(LISTING_FILE);
    let _ = fs::remove_file(IMAGE_FILE);

    info!("assembled {} into {} bytes", source, image.len());
    Ok(Assembly { listing, image })
}
