// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff (globs, reading possibly-compressed text, output directories).

mod glob;

pub(crate) use self::glob::{get_matches_from_globs, GlobError};

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::trace;

/// Open a text file for buffered reading. Files ending in ".gz" are
/// transparently decompressed.
pub(crate) fn open_text(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let f = File::open(path)?;
    let is_gz = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gz {
        trace!("Reading {} through a gzip decoder", path.display());
        Ok(Box::new(BufReader::new(flate2::read::GzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// Make sure that an output directory exists and that we're allowed to write
/// into it.
pub(crate) fn prepare_output_dir(dir: &Path) -> std::io::Result<()> {
    trace!("Preparing output directory {}", dir.display());
    std::fs::DirBuilder::new().recursive(true).create(dir)?;
    let metadata = std::fs::metadata(dir)?;
    if metadata.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("Output directory '{}' is not writable", dir.display()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_open_text_plain_and_gz() {
        let tmp = TempDir::new().unwrap();
        let plain = tmp.path().join("a.txt");
        std::fs::write(&plain, "hello\nworld\n").unwrap();

        let gz = tmp.path().join("a.txt.gz");
        let mut enc = flate2::write::GzEncoder::new(
            File::create(&gz).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(b"hello\nworld\n").unwrap();
        enc.finish().unwrap();

        for p in [plain, gz] {
            let mut s = String::new();
            open_text(&p).unwrap().read_to_string(&mut s).unwrap();
            assert_eq!(s, "hello\nworld\n");
        }
    }

    #[test]
    fn test_prepare_output_dir_makes_parents() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        prepare_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Doing it again is fine.
        prepare_output_dir(&nested).unwrap();
    }
}
