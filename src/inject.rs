//! Injection of environment variables into a packaged function.
//!
//! Edge functions cannot carry live environment variables, so they are
//! written as generated source lines at the top of one of the archive's
//! files instead.

use std::io::{Cursor, Read, Write};

use log::{debug, warn};
use zip::{result::ZipError, write::FileOptions, ZipArchive, ZipWriter};

use crate::{env::EnvVars, Error, ErrorKind, Result};

pub const INJECTION_HEADER: &str = "// --- Environment variables injected by cloud-deploy --------------------------------v";
pub const INJECTION_FOOTER: &str = "// ^-------------------------------- Environment variables injected by cloud-deploy ---";

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Escapes a string so it can be embedded in a double-quoted JavaScript
/// string literal.
fn escape(s: &str) -> String {
    let mut output = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\\' => output.push_str("\\\\"),
            '"' => output.push_str("\\\""),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            _ => output.push(c),
        }
    }

    output
}

/// Returns the lines that precede the original content: the header, one
/// assignment per variable in declaration order, the footer and a blank line.
pub fn injection_block(vars: &EnvVars) -> Vec<String> {
    std::iter::once(INJECTION_HEADER.to_string())
        .chain(vars.iter().map(|(name, value)| {
            format!("process.env[\"{}\"] = \"{}\";", escape(name), escape(value))
        }))
        .chain([INJECTION_FOOTER.to_string(), String::new()])
        .collect()
}

/// Prefixes the archive entry `entry` with the injection block for `vars`.
///
/// All other entries are copied as-is, without being recompressed.
pub fn inject_environment(archive: &[u8], entry: &str, vars: &EnvVars) -> Result<Vec<u8>> {
    if vars.is_empty() {
        warn!(
            "No environment variables were given: only an empty block will be injected into `{}`",
            entry
        );
    }

    let mut reader = ZipArchive::new(Cursor::new(archive)).map_err(|err| {
        Error::new("failed to open artifact archive")
            .with_kind(ErrorKind::InvalidArtifact)
            .with_source(err)
            .with_explanation("The artifact must be a valid zip archive.")
    })?;

    let (content, options) = {
        let mut file = reader.by_name(entry).map_err(|err| match err {
            ZipError::FileNotFound => Error::new(format!("entry `{}` not found in artifact", entry))
                .with_kind(ErrorKind::NotFound)
                .with_explanation(
                    "The file to inject the environment variables into must exist in the artifact archive. Its path is relative to the archive root.",
                ),
            err => Error::new(format!("failed to open artifact entry `{}`", entry))
                .with_kind(ErrorKind::InvalidArtifact)
                .with_source(err),
        })?;

        let mut content = String::new();

        file.read_to_string(&mut content).map_err(|err| {
            Error::new(format!("failed to read artifact entry `{}`", entry))
                .with_kind(ErrorKind::InvalidArtifact)
                .with_source(err)
                .with_explanation("The entry must be a UTF-8 encoded text file.")
        })?;

        let options = FileOptions::default().compression_method(file.compression());

        let options = match file.unix_mode() {
            Some(mode) => options.unix_permissions(mode),
            None => options,
        };

        (content, options)
    };

    let injected = injection_block(vars)
        .into_iter()
        .chain(std::iter::once(content))
        .collect::<Vec<_>>()
        .join(LINE_ENDING);

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(archive.len())));

    let write_err = |err: ZipError| {
        Error::new("failed to write artifact archive")
            .with_kind(ErrorKind::InvalidArtifact)
            .with_source(err)
    };

    for index in 0..reader.len() {
        let file = reader.by_index_raw(index).map_err(|err| {
            Error::new(format!("failed to read artifact entry #{}", index))
                .with_kind(ErrorKind::InvalidArtifact)
                .with_source(err)
        })?;

        if file.name() == entry {
            debug!("Rewriting entry `{}`", entry);

            writer.start_file(entry, options).map_err(write_err)?;
            writer.write_all(injected.as_bytes()).map_err(|err| {
                Error::new("failed to write artifact archive")
                    .with_kind(ErrorKind::InvalidArtifact)
                    .with_source(err)
            })?;
        } else {
            writer.raw_copy_file(file).map_err(write_err)?;
        }
    }

    let archive = writer.finish().map_err(write_err)?.into_inner();

    debug!("Repacked artifact is {} byte(s)", archive.len());

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use zip::CompressionMethod;

    use super::*;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, content) in entries {
            writer
                .start_file(
                    *name,
                    FileOptions::default().compression_method(CompressionMethod::Deflated),
                )
                .unwrap();
            writer.write_all(content).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    fn read_entry(archive: &[u8], name: &str) -> Vec<u8> {
        let mut reader = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = reader.by_name(name).unwrap();
        let mut buf = vec![];
        file.read_to_end(&mut buf).unwrap();
        buf
    }

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_injection_block() {
        let block = injection_block(&vars(&[("A", "1"), ("B", "x\"y")]));

        assert_eq!(
            block,
            vec![
                INJECTION_HEADER.to_string(),
                r#"process.env["A"] = "1";"#.to_string(),
                r#"process.env["B"] = "x\"y";"#.to_string(),
                INJECTION_FOOTER.to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape(r"a\b"), r"a\\b");
        assert_eq!(escape("a\nb\r"), r"a\nb\r");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_inject_environment() {
        let original = "exports.handler = async () => {};\n";
        let other: &[u8] = &[0, 159, 146, 150, 1, 2, 3];
        let archive = build_archive(&[
            ("lib/helper.bin", other),
            ("index.js", original.as_bytes()),
            ("README.md", &b"# fn"[..]),
        ]);

        let injected = inject_environment(
            &archive,
            "index.js",
            &vars(&[("A", "1"), ("B", "x\"y")]),
        )
        .unwrap();

        let expected = [
            INJECTION_HEADER,
            r#"process.env["A"] = "1";"#,
            r#"process.env["B"] = "x\"y";"#,
            INJECTION_FOOTER,
            "",
            original,
        ]
        .join(LINE_ENDING);

        assert_eq!(
            String::from_utf8(read_entry(&injected, "index.js")).unwrap(),
            expected
        );
        assert_eq!(read_entry(&injected, "lib/helper.bin"), other);
        assert_eq!(read_entry(&injected, "README.md"), b"# fn");

        let reader = ZipArchive::new(Cursor::new(injected.as_slice())).unwrap();
        assert_eq!(
            reader.file_names().collect::<std::collections::BTreeSet<_>>(),
            ["README.md", "index.js", "lib/helper.bin"].into_iter().collect()
        );
    }

    #[test]
    fn test_inject_environment_missing_entry() {
        let archive = build_archive(&[("index.js", &b""[..])]);

        let err = inject_environment(&archive, "main.js", &vars(&[("A", "1")])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_inject_environment_invalid_archive() {
        let err = inject_environment(b"not a zip", "index.js", &vars(&[])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArtifact);
    }

    #[test]
    fn test_inject_environment_binary_entry() {
        let archive = build_archive(&[("index.js", &[0xff, 0xfe, 0x00][..])]);

        let err = inject_environment(&archive, "index.js", &vars(&[])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArtifact);
    }

    #[test]
    fn test_inject_environment_corrupted_entry() {
        let mut archive = build_archive(&[
            ("index.js", &b"exports.handler = () => {};"[..]),
            ("lib.js", &b"module.exports = {};"[..]),
        ]);

        let signature = b"PK\x03\x04";
        let second_header = archive
            .windows(signature.len())
            .enumerate()
            .filter(|(_, window)| *window == signature)
            .nth(1)
            .map(|(offset, _)| offset)
            .unwrap();
        archive[second_header..second_header + signature.len()].copy_from_slice(b"XXXX");

        let err = inject_environment(&archive, "index.js", &vars(&[("A", "1")])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArtifact);
        assert_eq!(err.description(), "failed to read artifact entry #1");
    }
}
