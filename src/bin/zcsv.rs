use std::path::PathBuf;
use std::process;

use clap::Parser;

use zerocsv::{Dialect, FieldIter, ParseError};

#[derive(Parser)]
#[command(name = "zcsv", about = "Print every CSV field of FILE, one per line")]
struct Cli {
    /// CSV file to read
    file: PathBuf,

    /// Field delimiter (single byte)
    #[arg(short = 'd', long = "delimiter", default_value = ",")]
    delimiter: String,

    /// Parse buffer size in bytes; must hold the longest field
    #[arg(long = "buffer-size", default_value_t = 4096)]
    buffer_size: usize,
}

fn main() {
    let cli = Cli::parse();

    let delimiter = match cli.delimiter.as_bytes() {
        [b] => *b,
        _ => {
            eprintln!("zcsv: delimiter must be a single byte");
            process::exit(2);
        }
    };

    let mut buffer = vec![0u8; cli.buffer_size.max(2)];
    let dialect = Dialect::new().delimiter(delimiter);
    let source = match zerocsv::ReadSource::open(&cli.file, &mut buffer) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("zcsv: failed to open {}: {err}", cli.file.display());
            process::exit(1);
        }
    };
    let mut fields = FieldIter::with_dialect(source, dialect);

    let mut row = 0usize;
    let mut col = 0usize;
    loop {
        match fields.next_field() {
            Ok(mut field) => {
                let value = String::from_utf8_lossy(field.unescaped()).into_owned();
                println!("field[{row}][{col}] = |{value}|");
                if field.last_column() {
                    row += 1;
                    col = 0;
                } else {
                    col += 1;
                }
            }
            Err(ParseError::EndOfInput) => break,
            Err(ParseError::FieldTooLong) => {
                eprintln!(
                    "zcsv: field too long at row={row}, col={col} (buffer is {} bytes)",
                    cli.buffer_size
                );
                process::exit(1);
            }
            Err(ParseError::InvalidQuotes) => {
                eprintln!("zcsv: invalid quotes at row={row}, col={col}");
                process::exit(1);
            }
            Err(ParseError::ReadFailed(err)) => {
                eprintln!("zcsv: read failed at row={row}, col={col}: {err}");
                process::exit(1);
            }
        }
    }
}
