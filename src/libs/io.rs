use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Opens `input` for reading; `stdin` reads from the standard input and `.gz`
/// files are decompressed on the fly.
pub fn reader<P: AsRef<Path>>(input: P) -> std::io::Result<Box<dyn BufRead>> {
    let path = input.as_ref();
    let reader: Box<dyn BufRead> = if path == Path::new("stdin") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(path).map_err(|why| {
            std::io::Error::new(
                why.kind(),
                format!("could not open {}: {}", path.display(), why),
            )
        })?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

/// Opens `output` for writing; `stdout` writes to the screen.
pub fn writer<P: AsRef<Path>>(output: P) -> std::io::Result<Box<dyn Write>> {
    let path = output.as_ref();
    let writer: Box<dyn Write> = if path == Path::new("stdout") {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(path).map_err(|why| {
            std::io::Error::new(
                why.kind(),
                format!("could not create {}: {}", path.display(), why),
            )
        })?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}
