//! Sequence bootstrap: parses input files into the database.
//!
//! Parsers are name-keyed like the other registries; only FASTA ships, but
//! the dispatch point is where the original fed alternative formats in.

use std::path::{Path, PathBuf};

use bio::io::fasta;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};

type Parser = fn(&Path, &mut Database) -> Result<usize>;

const NAMES: &[&str] = &["default", "fasta"];

/// Whether a parser name is registered. Names are case-sensitive.
pub fn has(name: &str) -> bool {
    NAMES.contains(&name)
}

/// The registered parser names.
pub fn list() -> Vec<&'static str> {
    NAMES.to_vec()
}

fn parser(name: &str) -> Result<Parser> {
    match name {
        "default" | "fasta" => Ok(parse_fasta),
        _ => Err(Error::UnknownParser(name.to_string())),
    }
}

fn parse_fasta(path: &Path, db: &mut Database) -> Result<usize> {
    let reader = fasta::Reader::from_file(path)
        .map_err(|err| Error::Input(format!("{}: {err}", path.display())))?;

    let mut loaded = 0;
    for record in reader.records() {
        let record = record.map_err(|err| Error::Input(format!("{}: {err}", path.display())))?;
        let description = match record.desc() {
            Some(desc) => format!("{} {desc}", record.id()),
            None => record.id().to_string(),
        };
        db.push_raw(Some(description), record.seq());
        loaded += 1;
    }
    Ok(loaded)
}

/// Parses every input file with the named parser, appending all sequences
/// into one database in file order.
pub fn load(paths: &[PathBuf], parser_name: &str) -> Result<Database> {
    let parse = parser(parser_name)?;
    let mut db = Database::new();
    for path in paths {
        let loaded = parse(path, &mut db)?;
        debug!(file = %path.display(), loaded, "parsed input file");
    }
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fasta_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn fasta_records_land_in_input_order() {
        let file = fasta_file(">first some protein\nMKVL\n>second\nACTG\nGT\n");
        let db = load(&[file.path().to_path_buf()], "fasta").unwrap();

        assert_eq!(db.count(), 2);
        assert_eq!(db.get(0).description, Some("first some protein"));
        assert_eq!(db.get(0).sequence.decode(), "MKVL");
        assert_eq!(db.get(1).description, Some("second"));
        assert_eq!(db.get(1).sequence.decode(), "ACTGGT");
    }

    #[test]
    fn multiple_files_append_in_order() {
        let one = fasta_file(">a\nAAAA\n");
        let two = fasta_file(">b\nCCCC\n");
        let db = load(&[one.path().to_path_buf(), two.path().to_path_buf()], "default").unwrap();
        assert_eq!(db.count(), 2);
        assert_eq!(db.get(1).sequence.decode(), "CCCC");
    }

    #[test]
    fn unknown_parser_names_are_rejected() {
        assert!(matches!(load(&[], "genbank"), Err(Error::UnknownParser(_))));
        assert!(has("fasta"));
        assert!(!has("genbank"));
    }

    #[test]
    fn missing_files_surface_an_input_error() {
        let missing = PathBuf::from("/nonexistent/sequences.fa");
        assert!(matches!(load(&[missing], "fasta"), Err(Error::Input(_))));
    }

    #[test]
    fn unknown_residues_fold_to_x() {
        let file = fasta_file(">odd\nAC?G\n");
        let db = load(&[file.path().to_path_buf()], "fasta").unwrap();
        assert_eq!(db.get(0).sequence.decode(), "ACXG");
    }
}
