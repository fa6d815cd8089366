use crate::libs::error::{OrthoError, Result};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Open a text input. `stdin` reads standard input, `.gz` files are decompressed.
///
/// ```
/// use std::io::BufRead;
/// let reader = orthotree::reader("tests/orthofinder/SpeciesIDs.txt").unwrap();
/// assert_eq!(reader.lines().count(), 4);
///
/// assert!(orthotree::reader("tests/orthofinder/absent.txt").is_err());
/// ```
pub fn reader(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "stdin" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }

    let path = Path::new(input);
    let file = std::fs::File::open(path).map_err(|source| OrthoError::CannotOpen {
        source,
        filename: input.to_string(),
    })?;

    let reader: Box<dyn BufRead> = if path.extension() == Some(std::ffi::OsStr::new("gz")) {
        Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// `stdout` writes to standard output. Parent directories are not created.
pub fn writer(output: &str) -> Result<Box<dyn Write>> {
    if output == "stdout" {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let file = std::fs::File::create(output).map_err(|source| OrthoError::CannotWrite {
        source,
        filename: output.to_string(),
    })?;
    Ok(Box::new(BufWriter::new(file)))
}

pub fn read_to_string(input: &str) -> Result<String> {
    let mut text = String::new();
    reader(input)?
        .read_to_string(&mut text)
        .map_err(|source| OrthoError::CannotOpen {
            source,
            filename: input.to_string(),
        })?;
    Ok(text)
}

/// Write a whole file at once, creating missing parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    let wrap = |source| OrthoError::CannotWrite {
        source,
        filename: path.display().to_string(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, content).map_err(wrap)
}

pub fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| OrthoError::CannotWrite {
        source,
        filename: path.display().to_string(),
    })
}

/// Wrap an io error raised while writing `path`.
pub fn write_err(path: &Path) -> impl Fn(std::io::Error) -> OrthoError + '_ {
    move |source| OrthoError::CannotWrite {
        source,
        filename: path.display().to_string(),
    }
}
